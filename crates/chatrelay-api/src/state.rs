//! Application state wiring the relay together.
//!
//! AppState holds the process-lifetime service handles used by both CLI
//! commands and REST API handlers. The relay is generic over its session
//! store; AppState pins it to the runtime-selected infra backend.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::warn;

use chatrelay_core::completion::BoxCompletionClient;
use chatrelay_core::relay::{RelayService, RelaySettings};
use chatrelay_infra::llm::{OpenAiCompatConfig, OpenAiCompletionClient};
use chatrelay_infra::store::{AnySessionStore, open_history};
use chatrelay_types::config::RelayConfig;

/// Concrete relay type pinned to the infra session store.
pub type ConcreteRelayService = RelayService<AnySessionStore>;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelayService>,
    pub config: Arc<RelayConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the history store and build the upstream client.
    ///
    /// Neither an unreachable store nor a missing API key aborts startup:
    /// the former disables history, the latter fails each upstream call.
    pub async fn init(config: RelayConfig, data_dir: PathBuf) -> Self {
        let history = open_history(&config.history, &data_dir).await;

        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => SecretString::from(key),
            _ => {
                warn!("{API_KEY_ENV} is not set; upstream calls will be rejected");
                SecretString::from(String::new())
            }
        };
        let client = OpenAiCompletionClient::new(OpenAiCompatConfig::from_provider(
            &config.provider,
            api_key,
        ));

        let relay = RelayService::new(
            history,
            BoxCompletionClient::new(client),
            RelaySettings::from(&config),
        );

        Self::new(relay, config, data_dir)
    }

    pub fn new(relay: ConcreteRelayService, config: RelayConfig, data_dir: PathBuf) -> Self {
        Self {
            relay: Arc::new(relay),
            config: Arc::new(config),
            data_dir,
        }
    }
}
