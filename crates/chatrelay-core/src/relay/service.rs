//! RelayService: history + completion composed into chat operations.
//!
//! Both paths share the same preparation (load history, build prompt,
//! resolve defaults). An exchange is persisted only after the upstream has
//! produced the whole reply; the streaming path does it in its terminal
//! transition, before `Done` is yielded.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use tracing::field::Empty;
use tracing::{Instrument, Span, info, info_span, warn};

use chatrelay_types::chat::{ChatReply, ChatRequest, RelayEvent};
use chatrelay_types::config::RelayConfig;
use chatrelay_types::llm::{CompletionRequest, UpstreamError};

use crate::completion::BoxCompletionClient;
use crate::history::{HistoryStore, SessionStore};

use super::prompt::build_prompt;
use super::stream::{RelayEventStream, StreamInSpan, StreamPhase};

/// Defaults and limits applied to every relayed request.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub default_model: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    /// Most recent turns loaded into the prompt.
    pub history_limit: usize,
    /// Delay after each forwarded fragment. Zero disables pacing.
    pub pacing: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            default_model: config.provider.default_model.clone(),
            default_temperature: config.provider.default_temperature,
            default_max_tokens: config.provider.default_max_tokens,
            history_limit: config.history.max_turns,
            pacing: Duration::from_millis(config.stream.pacing_ms),
        }
    }
}

/// Relays chat requests to the upstream provider with session memory.
///
/// Constructed once at startup and shared behind an `Arc`; it holds no
/// per-request state.
pub struct RelayService<S: SessionStore> {
    history: HistoryStore<S>,
    client: BoxCompletionClient,
    settings: RelaySettings,
}

impl<S: SessionStore> RelayService<S> {
    pub fn new(history: HistoryStore<S>, client: BoxCompletionClient, settings: RelaySettings) -> Self {
        Self {
            history,
            client,
            settings,
        }
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.client.name()
    }

    /// Model used for `request`: the requested one, else the default.
    pub fn resolve_model(&self, request: &ChatRequest) -> String {
        request
            .requested_model()
            .unwrap_or(&self.settings.default_model)
            .to_string()
    }

    /// Load history and build the upstream request.
    async fn prepare(&self, request: &ChatRequest) -> CompletionRequest {
        let turns = self
            .history
            .load(&request.session_id, self.settings.history_limit)
            .await;

        CompletionRequest {
            model: self.resolve_model(request),
            prompt: build_prompt(&turns, &request.message),
            temperature: request
                .temperature
                .unwrap_or(self.settings.default_temperature),
            max_tokens: request.max_tokens.unwrap_or(self.settings.default_max_tokens),
        }
    }

    /// Blocking chat: wait for the whole reply, then record the exchange.
    ///
    /// The request is assumed validated. Upstream failures are returned as-is
    /// and leave history untouched; a failed history write only logs.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, UpstreamError> {
        let completion = self.prepare(request).await;

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.client.name(),
            gen_ai.request.model = %completion.model,
            gen_ai.request.max_tokens = completion.max_tokens,
            gen_ai.request.temperature = completion.temperature,
            gen_ai.request.stream = false,
            session_id = %request.session_id,
        );

        let reply = match self.client.complete(&completion).instrument(span).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    session_id = %request.session_id,
                    reason = e.reason(),
                    error = %e,
                    "Upstream completion failed"
                );
                return Err(e);
            }
        };

        if !self
            .history
            .append(&request.session_id, &request.message, &reply)
            .await
        {
            warn!(session_id = %request.session_id, "Exchange not recorded in history");
        }

        Ok(ChatReply {
            reply,
            session_id: request.session_id.clone(),
            model: completion.model,
        })
    }
}

impl<S: SessionStore + 'static> RelayService<S> {
    /// Streaming chat.
    ///
    /// Yields each upstream fragment in order, then exactly one terminal
    /// event: `Done` after the assembled reply has been handed to history,
    /// or `Error` when the upstream fails (nothing is persisted). Dropping
    /// the returned stream drops the upstream stream with it and persists
    /// nothing.
    pub fn chat_stream(self: &Arc<Self>, request: ChatRequest) -> RelayEventStream {
        let relay = Arc::clone(self);
        let model = self.resolve_model(&request);

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.client.name(),
            gen_ai.request.model = %model,
            gen_ai.request.max_tokens = Empty,
            gen_ai.request.temperature = Empty,
            gen_ai.request.stream = true,
            session_id = %request.session_id,
        );

        let inner = stream! {
            let mut phase = StreamPhase::Idle;

            phase.advance(StreamPhase::Loading);
            let completion = relay.prepare(&request).await;
            let span = Span::current();
            span.record("gen_ai.request.max_tokens", completion.max_tokens);
            span.record("gen_ai.request.temperature", completion.temperature);
            let mut upstream = relay.client.stream(completion);

            phase.advance(StreamPhase::Streaming);
            let mut reply = String::new();
            let mut fragments: usize = 0;
            let mut failure: Option<UpstreamError> = None;

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        if fragment.is_empty() {
                            continue;
                        }
                        reply.push_str(&fragment);
                        fragments += 1;
                        yield RelayEvent::Fragment(fragment);

                        if !relay.settings.pacing.is_zero() {
                            tokio::time::sleep(relay.settings.pacing).await;
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            drop(upstream);

            match failure {
                Some(e) => {
                    phase.advance(StreamPhase::Failed);
                    warn!(
                        reason = e.reason(),
                        error = %e,
                        fragments,
                        "Upstream stream failed, partial reply discarded"
                    );
                    yield RelayEvent::Error(e.to_string());
                }
                None => {
                    if !relay
                        .history
                        .append(&request.session_id, &request.message, &reply)
                        .await
                    {
                        warn!(session_id = %request.session_id, "Exchange not recorded in history");
                    }
                    phase.advance(StreamPhase::Completed);
                    info!(fragments, reply_len = reply.len(), "Relay stream completed");
                    yield RelayEvent::Done;
                }
            }
        };

        Box::pin(StreamInSpan {
            inner: Box::pin(inner),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures_util::stream;

    use chatrelay_types::chat::Turn;
    use chatrelay_types::error::RepositoryError;

    use crate::completion::{CompletionClient, FragmentStream};
    use crate::history::DEFAULT_SESSION_TTL;

    use super::*;

    /// Session store that records every exchange it is asked to persist.
    #[derive(Default)]
    struct RecordingStore {
        sessions: Mutex<HashMap<String, Vec<Turn>>>,
        exchanges: Mutex<Vec<(String, String, String)>>,
        fail_writes: bool,
    }

    impl RecordingStore {
        fn exchanges(&self) -> Vec<(String, String, String)> {
            self.exchanges.lock().unwrap().clone()
        }
    }

    impl SessionStore for RecordingStore {
        async fn tail(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, RepositoryError> {
            let sessions = self.sessions.lock().unwrap();
            let turns = sessions.get(session_id).cloned().unwrap_or_default();
            let skip = turns.len().saturating_sub(limit);
            Ok(turns.into_iter().skip(skip).collect())
        }

        async fn push_exchange(
            &self,
            session_id: &str,
            user: &str,
            assistant: &str,
            _ttl: Duration,
        ) -> Result<(), RepositoryError> {
            self.exchanges.lock().unwrap().push((
                session_id.to_string(),
                user.to_string(),
                assistant.to_string(),
            ));
            if self.fail_writes {
                return Err(RepositoryError::Query("disk full".to_string()));
            }
            let mut sessions = self.sessions.lock().unwrap();
            let turns = sessions.entry(session_id.to_string()).or_default();
            turns.push(Turn::user(user));
            turns.push(Turn::assistant(assistant));
            Ok(())
        }

        async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
            self.sessions.lock().unwrap().remove(session_id);
            Ok(())
        }

        async fn count_active(&self) -> Result<u64, RepositoryError> {
            Ok(self.sessions.lock().unwrap().len() as u64)
        }

        async fn purge_expired(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    /// Store handle shared between the service and the test body.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<RecordingStore>);

    impl SessionStore for SharedStore {
        async fn tail(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, RepositoryError> {
            self.0.tail(session_id, limit).await
        }

        async fn push_exchange(
            &self,
            session_id: &str,
            user: &str,
            assistant: &str,
            ttl: Duration,
        ) -> Result<(), RepositoryError> {
            self.0.push_exchange(session_id, user, assistant, ttl).await
        }

        async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
            self.0.delete(session_id).await
        }

        async fn count_active(&self) -> Result<u64, RepositoryError> {
            self.0.count_active().await
        }

        async fn purge_expired(&self) -> Result<u64, RepositoryError> {
            self.0.purge_expired().await
        }
    }

    /// Completion client replaying a fixed reply or fragment script.
    struct ScriptedClient {
        reply: Result<String, UpstreamError>,
        fragments: Vec<Result<String, UpstreamError>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
        upstream_dropped: Arc<AtomicBool>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                fragments: Vec::new(),
                requests: Arc::default(),
                upstream_dropped: Arc::default(),
            }
        }

        fn failing(err: UpstreamError) -> Self {
            Self {
                reply: Err(err),
                ..Self::replying("")
            }
        }

        fn streaming(fragments: Vec<Result<String, UpstreamError>>) -> Self {
            Self {
                fragments,
                ..Self::replying("")
            }
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl CompletionClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone()
        }

        fn stream(&self, request: CompletionRequest) -> FragmentStream {
            self.requests.lock().unwrap().push(request);
            let guard = DropFlag(Arc::clone(&self.upstream_dropped));
            Box::pin(stream::iter(self.fragments.clone()).map(move |item| {
                let _guard = &guard;
                item
            }))
        }
    }

    struct Harness {
        store: SharedStore,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
        upstream_dropped: Arc<AtomicBool>,
        relay: Arc<RelayService<SharedStore>>,
    }

    fn harness(client: ScriptedClient) -> Harness {
        harness_with_store(client, SharedStore::default())
    }

    fn harness_with_store(client: ScriptedClient, store: SharedStore) -> Harness {
        let requests = Arc::clone(&client.requests);
        let upstream_dropped = Arc::clone(&client.upstream_dropped);
        let settings = RelaySettings {
            pacing: Duration::ZERO,
            ..RelaySettings::default()
        };
        let relay = RelayService::new(
            HistoryStore::new(store.clone(), DEFAULT_SESSION_TTL),
            BoxCompletionClient::new(client),
            settings,
        );
        Harness {
            store,
            requests,
            upstream_dropped,
            relay: Arc::new(relay),
        }
    }

    fn fragments(parts: &[&str]) -> Vec<Result<String, UpstreamError>> {
        parts.iter().map(|p| Ok(p.to_string())).collect()
    }

    #[tokio::test]
    async fn test_chat_persists_exchange_once() {
        let h = harness(ScriptedClient::replying("Hello there"));

        let reply = h.relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap();
        assert_eq!(reply.reply, "Hello there");
        assert_eq!(reply.session_id, "s1");
        assert_eq!(reply.model, "qwen-plus");

        assert_eq!(
            h.store.0.exchanges(),
            vec![("s1".to_string(), "Hi".to_string(), "Hello there".to_string())]
        );
        let turns = h.relay.history().load("s1", 20).await;
        assert_eq!(turns, vec![Turn::user("Hi"), Turn::assistant("Hello there")]);
    }

    #[tokio::test]
    async fn test_chat_prompt_includes_prior_turns() {
        let h = harness(ScriptedClient::replying("Hello there"));
        h.relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap();
        h.relay
            .chat(&ChatRequest::new("s1", "How are you?"))
            .await
            .unwrap();

        let requests = h.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "Hi");
        assert_eq!(
            requests[1].prompt,
            "User: Hi\nAssistant: Hello there\nHow are you?"
        );
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_persists_nothing() {
        let h = harness(ScriptedClient::failing(UpstreamError::Timeout { after_ms: 100 }));

        let err = h.relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(h.store.0.exchanges().is_empty());
        assert!(h.relay.history().load("s1", 20).await.is_empty());
    }

    #[tokio::test]
    async fn test_chat_succeeds_when_history_write_fails() {
        let store = SharedStore(Arc::new(RecordingStore {
            fail_writes: true,
            ..Default::default()
        }));
        let h = harness_with_store(ScriptedClient::replying("Hello"), store);

        let reply = h.relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap();
        assert_eq!(reply.reply, "Hello");
        assert_eq!(h.store.0.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_applies_defaults_and_overrides() {
        let h = harness(ScriptedClient::replying("ok"));

        h.relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap();
        let mut custom = ChatRequest::new("s2", "Hi");
        custom.model = Some("qwen-max".to_string());
        custom.temperature = Some(0.1);
        custom.max_tokens = Some(64);
        let reply = h.relay.chat(&custom).await.unwrap();
        assert_eq!(reply.model, "qwen-max");

        let mut blank_model = ChatRequest::new("s3", "Hi");
        blank_model.model = Some(" ".to_string());
        let reply = h.relay.chat(&blank_model).await.unwrap();
        assert_eq!(reply.model, "qwen-plus");

        let requests = h.requests.lock().unwrap();
        assert_eq!(requests[0].model, "qwen-plus");
        assert!((requests[0].temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(requests[0].max_tokens, 2000);
        assert_eq!(requests[1].model, "qwen-max");
        assert!((requests[1].temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(requests[1].max_tokens, 64);
    }

    #[tokio::test]
    async fn test_chat_with_disabled_history_still_replies() {
        let relay = RelayService::new(
            HistoryStore::<SharedStore>::disabled(),
            BoxCompletionClient::new(ScriptedClient::replying("Hello")),
            RelaySettings::default(),
        );

        let reply = relay.chat(&ChatRequest::new("s1", "Hi")).await.unwrap();
        assert_eq!(reply.reply, "Hello");
    }

    #[tokio::test]
    async fn test_stream_clean_end_persists_then_done() {
        let h = harness(ScriptedClient::streaming(fragments(&["Hel", "lo"])));

        let events: Vec<RelayEvent> = h
            .relay
            .chat_stream(ChatRequest::new("s1", "Hi"))
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                RelayEvent::Fragment("Hel".to_string()),
                RelayEvent::Fragment("lo".to_string()),
                RelayEvent::Done,
            ]
        );
        assert_eq!(
            h.store.0.exchanges(),
            vec![("s1".to_string(), "Hi".to_string(), "Hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stream_failure_after_fragment_persists_nothing() {
        let h = harness(ScriptedClient::streaming(vec![
            Ok("Par".to_string()),
            Err(UpstreamError::Stream("connection reset".to_string())),
            Ok("never".to_string()),
        ]));

        let events: Vec<RelayEvent> = h
            .relay
            .chat_stream(ChatRequest::new("s1", "Hi"))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RelayEvent::Fragment("Par".to_string()));
        match &events[1] {
            RelayEvent::Error(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected error event, got {other:?}"),
        }
        assert!(h.store.0.exchanges().is_empty());
    }

    #[tokio::test]
    async fn test_stream_skips_empty_fragments() {
        let h = harness(ScriptedClient::streaming(fragments(&["", "a", "", "b"])));

        let events: Vec<RelayEvent> = h
            .relay
            .chat_stream(ChatRequest::new("s1", "Hi"))
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                RelayEvent::Fragment("a".to_string()),
                RelayEvent::Fragment("b".to_string()),
                RelayEvent::Done,
            ]
        );
        assert_eq!(h.store.0.exchanges()[0].2, "ab");
    }

    #[tokio::test]
    async fn test_stream_without_fragments_records_empty_reply() {
        let h = harness(ScriptedClient::streaming(Vec::new()));

        let events: Vec<RelayEvent> = h
            .relay
            .chat_stream(ChatRequest::new("s1", "Hi"))
            .collect()
            .await;

        assert_eq!(events, vec![RelayEvent::Done]);
        assert_eq!(h.store.0.exchanges()[0].2, "");
    }

    #[tokio::test]
    async fn test_stream_dropped_by_caller_persists_nothing() {
        let h = harness(ScriptedClient::streaming(fragments(&["Hel", "lo"])));

        let mut events = h.relay.chat_stream(ChatRequest::new("s1", "Hi"));
        assert_eq!(
            events.next().await,
            Some(RelayEvent::Fragment("Hel".to_string()))
        );
        assert!(!h.upstream_dropped.load(Ordering::SeqCst));
        drop(events);

        assert!(h.upstream_dropped.load(Ordering::SeqCst));
        assert!(h.store.0.exchanges().is_empty());
    }

    #[tokio::test]
    async fn test_stream_prompt_uses_history() {
        let h = harness(ScriptedClient::streaming(fragments(&["fine"])));
        h.relay.history().append("s1", "Hi", "Hello there").await;

        let _: Vec<RelayEvent> = h
            .relay
            .chat_stream(ChatRequest::new("s1", "How are you?"))
            .collect()
            .await;

        let requests = h.requests.lock().unwrap();
        assert_eq!(
            requests[0].prompt,
            "User: Hi\nAssistant: Hello there\nHow are you?"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_pacing_delays_between_fragments() {
        let client = ScriptedClient::streaming(fragments(&["a", "b", "c"]));
        let relay = Arc::new(RelayService::new(
            HistoryStore::new(SharedStore::default(), DEFAULT_SESSION_TTL),
            BoxCompletionClient::new(client),
            RelaySettings {
                pacing: Duration::from_millis(50),
                ..RelaySettings::default()
            },
        ));

        let started = tokio::time::Instant::now();
        let events: Vec<RelayEvent> = relay
            .chat_stream(ChatRequest::new("s1", "Hi"))
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
