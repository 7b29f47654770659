//! CompletionClient trait definition.
//!
//! Uses RPITIT for `complete` and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxCompletionClient wrapper).

use std::pin::Pin;

use futures_util::Stream;

use chatrelay_types::llm::{CompletionRequest, UpstreamError};

/// Ordered, finite, non-restartable sequence of non-empty text deltas.
///
/// Ends with `None` on a clean finish; an `Err` item means the upstream
/// failed after delivering the items before it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send + 'static>>;

/// Trait for remote LLM completion backends.
///
/// Inputs are trusted: range checks on temperature and token bounds happen
/// at the request boundary, not here. Implementations bound every call by
/// their own timeout and report it as [`UpstreamError::Timeout`].
pub trait CompletionClient: Send + Sync {
    /// Human-readable provider name (e.g., "openai_compatible").
    fn name(&self) -> &str;

    /// Wait for the whole reply and return its text.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, UpstreamError>> + Send;

    /// Start a streaming completion.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxCompletionClient` wrapper. Empty deltas
    /// from the provider are never yielded.
    fn stream(&self, request: CompletionRequest) -> FragmentStream;
}
