//! OpenAI-compatible completion client.
//!
//! Works against any endpoint speaking the OpenAI chat completions protocol
//! (DashScope compatible mode by default) via a configurable base URL.
//!
//! Uses [`async_openai`] for type-safe request/response handling and
//! built-in SSE streaming.

pub mod config;
pub mod streaming;

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use tokio::time::Instant;
use tracing::debug;

use chatrelay_core::completion::{CompletionClient, FragmentStream};
use chatrelay_types::llm::{CompletionRequest, UpstreamError};

use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;

/// Completion client for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the inner `async_openai::Client` holds the API key.
pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    provider_name: String,
    timeout: Duration,
}

impl OpenAiCompletionClient {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            timeout: config.timeout,
        }
    }

    /// One user-role message carrying the whole prompt.
    fn build_request(&self, request: &CompletionRequest, stream: bool) -> CreateChatCompletionRequest {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
            name: None,
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![message],
            max_completion_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature as f32),
            stream: stream.then_some(true),
            ..Default::default()
        }
    }

    fn timeout_error(&self) -> UpstreamError {
        UpstreamError::Timeout {
            after_ms: self.timeout.as_millis() as u64,
        }
    }
}

impl CompletionClient for OpenAiCompletionClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let oai_request = self.build_request(request, false);

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(oai_request))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(map_openai_error)?;

        // A choice without content is an empty reply, not a failure.
        let choice = response.choices.into_iter().next().ok_or(UpstreamError::Empty)?;
        let content = choice.message.content.unwrap_or_default();

        debug!(
            model = %response.model,
            reply_len = content.len(),
            "Upstream completion received"
        );
        Ok(content)
    }

    fn stream(&self, request: CompletionRequest) -> FragmentStream {
        let oai_request = self.build_request(&request, true);
        let client = self.client.clone();
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;

        Box::pin(async_stream::try_stream! {
            let oai_stream = tokio::time::timeout_at(deadline, client.chat().create_stream(oai_request))
                .await
                .map_err(|_| UpstreamError::Timeout { after_ms: timeout.as_millis() as u64 })?
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream, deadline, timeout);
            while let Some(fragment) = inner.next().await {
                yield fragment?;
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`UpstreamError`].
fn map_openai_error(err: OpenAIError) -> UpstreamError {
    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                UpstreamError::AuthenticationFailed
            } else if code == "rate_limit_exceeded"
                || code == "Throttling"
                || error_type == "rate_limit_error"
            {
                UpstreamError::RateLimited
            } else {
                UpstreamError::Provider {
                    message: api_err.message.clone(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 | 403 => UpstreamError::AuthenticationFailed,
                    429 => UpstreamError::RateLimited,
                    _ => UpstreamError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                UpstreamError::Connection(err.to_string())
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            UpstreamError::Malformed(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => UpstreamError::Stream(stream_err.to_string()),
        _ => UpstreamError::Provider {
            message: err.to_string(),
        },
    }
}
