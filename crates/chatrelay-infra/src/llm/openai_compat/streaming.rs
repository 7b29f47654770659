//! OpenAI SSE chunk stream to fragment stream adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] to the
//! [`FragmentStream`] consumed by the relay: text deltas in arrival order,
//! empty deltas dropped, every wait bounded by one shared deadline.
//!
//! `async-openai` swallows the `[DONE]` sentinel, so a choice carrying a
//! `finish_reason` is the only evidence the upstream finished. A body that
//! ends without one was cut off and surfaces as [`UpstreamError::Stream`].

use std::time::Duration;

use async_openai::error::OpenAIError;
use async_openai::types::chat::ChatCompletionResponseStream;
use futures_util::StreamExt;
use tokio::time::Instant;

use chatrelay_core::completion::FragmentStream;
use chatrelay_types::llm::UpstreamError;

/// Map a chunk-level failure after the stream was opened.
pub(crate) fn map_chunk_error(err: OpenAIError) -> UpstreamError {
    match err {
        OpenAIError::JSONDeserialize(_, content) => {
            UpstreamError::Malformed(format!("failed to parse stream chunk: {content}"))
        }
        other => UpstreamError::Stream(other.to_string()),
    }
}

/// Error text for a body that ended before any choice finished.
pub(crate) const TRUNCATED_STREAM: &str = "upstream closed before completion";

/// Adapt an open chunk stream into text fragments.
///
/// The stream ends with `Timeout` if `deadline` passes before the upstream
/// finishes; `timeout` is only used to report how long the bound was.
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
    deadline: Instant,
    timeout: Duration,
) -> FragmentStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        let mut finished = false;

        loop {
            let next = tokio::time::timeout_at(deadline, stream.next())
                .await
                .map_err(|_| UpstreamError::Timeout { after_ms: timeout.as_millis() as u64 })?;

            let Some(result) = next else {
                if !finished {
                    Err::<(), _>(UpstreamError::Stream(TRUNCATED_STREAM.to_string()))?;
                }
                break;
            };
            let chunk = result.map_err(map_chunk_error)?;

            // The trailing usage chunk has no choices.
            for choice in chunk.choices {
                finished |= choice.finish_reason.is_some();
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        yield content;
                    }
                }
            }
        }
    })
}
