//! Relay orchestration: history + upstream completion composed into the
//! blocking `chat` and the streaming `chat_stream` operations.

pub mod prompt;
pub mod service;
pub mod stream;

pub use self::service::{RelayService, RelaySettings};
pub use self::stream::{RelayEventStream, StreamPhase};
