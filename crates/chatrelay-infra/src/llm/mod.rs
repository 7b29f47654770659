//! Upstream completion client adapters.

pub mod openai_compat;

pub use self::openai_compat::OpenAiCompletionClient;
pub use self::openai_compat::config::OpenAiCompatConfig;
