//! Connection settings for an OpenAI-compatible endpoint.

use std::time::Duration;

use secrecy::SecretString;

use chatrelay_types::config::ProviderConfig;

/// Configuration for [`super::OpenAiCompletionClient`].
///
/// Does NOT derive Debug: it carries the API key.
pub struct OpenAiCompatConfig {
    /// Name reported in logs and spans.
    pub provider_name: String,
    /// Base URL, e.g. `https://dashscope.aliyuncs.com/compatible-mode/v1`.
    pub base_url: String,
    pub api_key: SecretString,
    /// Bound on a blocking call, or on a whole stream.
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    /// Settings from the `[provider]` config section plus the API key.
    pub fn from_provider(provider: &ProviderConfig, api_key: SecretString) -> Self {
        Self {
            provider_name: "openai_compatible".to_string(),
            base_url: provider.base_url.clone(),
            api_key,
            timeout: Duration::from_secs(provider.timeout_secs),
        }
    }
}
