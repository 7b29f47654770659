//! Streaming relay plumbing: phase tracking and span propagation.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tracing::debug;

use chatrelay_types::chat::RelayEvent;

/// Events delivered to a streaming caller, terminated by `Done` or `Error`.
pub type RelayEventStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send + 'static>>;

/// Lifecycle of one streaming relay.
///
/// `Idle -> Loading -> Streaming -> {Completed, Failed}`. Only `Completed`
/// persists the exchange. A stream dropped before reaching a terminal
/// phase (caller went away) persists nothing and emits nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Loading,
    Streaming,
    Completed,
    Failed,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamPhase::Completed | StreamPhase::Failed)
    }

    /// Move to `next`, tracing the transition. Terminal phases are final.
    pub(crate) fn advance(&mut self, next: StreamPhase) {
        debug_assert!(!self.is_terminal(), "relay left terminal phase {self}");
        debug!(from = %self, to = %next, "Relay phase transition");
        *self = next;
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPhase::Idle => write!(f, "idle"),
            StreamPhase::Loading => write!(f, "loading"),
            StreamPhase::Streaming => write!(f, "streaming"),
            StreamPhase::Completed => write!(f, "completed"),
            StreamPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Polls the inner stream with `span` entered, so upstream and storage
/// events logged while relaying are attributed to the request.
pub(crate) struct StreamInSpan {
    pub(crate) inner: RelayEventStream,
    pub(crate) span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = RelayEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
