//! Streaming generation with a single active session.

use std::fmt;
use std::sync::Arc;

use dr_core::{
    ChunkEvent, ChunkStream, GenerationProvider, GenerationRequest, GenerationSettings,
    StreamChunk, ValidationError,
};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Prefix of the marker appended to the text when the provider reports an error.
pub const ERROR_MARKER_PREFIX: &str = "\n\n> Error: ";

const UNEXPECTED_END: &str = "generation stream ended unexpectedly";

/// Monotonic generation session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Streaming,
    Completed,
    Failed,
}

impl SessionStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One generation attempt and the text it has produced so far.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    id: SessionId,
    prompt: String,
    text: String,
    status: SessionStatus,
}

impl GenerationSession {
    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Accumulated output, including the error marker for failed sessions.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn status(&self) -> SessionStatus {
        self.status
    }
}

/// Incremental state change of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUpdate {
    pub session: SessionId,
    pub status: SessionStatus,
    /// Text appended by this update.
    pub delta: String,
    pub accumulated_text: String,
}

#[derive(Debug)]
struct Delivery {
    session: SessionId,
    chunk: StreamChunk,
}

/// Owns at most one streaming subscription to the generation provider.
///
/// Provider output is relayed into a shared inbox tagged with its session.
/// Starting a new session aborts the previous relay before opening the next
/// subscription; anything the old relay already queued is dropped when it is
/// received because its session is no longer live.
pub struct GenerationController<G> {
    provider: Arc<G>,
    next_id: u64,
    session: Option<GenerationSession>,
    relay: Option<JoinHandle<()>>,
    inbox_tx: mpsc::UnboundedSender<Delivery>,
    inbox_rx: mpsc::UnboundedReceiver<Delivery>,
}

impl<G: GenerationProvider> GenerationController<G> {
    pub fn new(provider: Arc<G>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            next_id: 0,
            session: None,
            relay: None,
            inbox_tx,
            inbox_rx,
        }
    }

    /// Opens a new session, tearing down any active one first.
    ///
    /// Rejected without contacting the provider when `settings` is incomplete.
    pub fn start(
        &mut self,
        prompt: String,
        settings: &GenerationSettings,
    ) -> Result<SessionId, ValidationError> {
        settings.validate()?;

        if let Some(previous) = self.cancel() {
            tracing::debug!(session = %previous, "superseded by a new session");
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        let mut session = GenerationSession {
            id,
            prompt: prompt.clone(),
            text: String::new(),
            status: SessionStatus::Pending,
        };

        let stream = self.provider.open_stream(GenerationRequest {
            settings: settings.clone(),
            prompt,
        });
        self.relay = Some(spawn_relay(id, stream, self.inbox_tx.clone()));
        session.status = SessionStatus::Streaming;
        self.session = Some(session);

        tracing::info!(session = %id, model = %settings.model, "generation started");
        Ok(id)
    }

    /// Abandons the active session.
    ///
    /// Releases the subscription; chunks still in flight are discarded on
    /// arrival. Returns the abandoned session, if one was streaming.
    pub fn cancel(&mut self) -> Option<SessionId> {
        self.release_subscription();
        if self.session.as_ref().is_some_and(|s| !s.status.is_terminal()) {
            return self.session.take().map(|s| s.id);
        }
        None
    }

    pub fn session(&self) -> Option<&GenerationSession> {
        self.session.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.status == SessionStatus::Streaming)
    }

    /// Waits for the next change to the active session.
    ///
    /// Returns `None` once no session is streaming. Cancel safe.
    pub async fn next_update(&mut self) -> Option<GenerationUpdate> {
        while self.is_streaming() {
            let delivery = self.inbox_rx.recv().await?;
            if let Some(update) = self.apply(delivery) {
                return Some(update);
            }
        }
        None
    }

    fn apply(&mut self, delivery: Delivery) -> Option<GenerationUpdate> {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == delivery.session && s.status == SessionStatus::Streaming)
        else {
            tracing::debug!(session = %delivery.session, "dropping chunk for inactive session");
            return None;
        };

        let delta = match ChunkEvent::from(delivery.chunk) {
            ChunkEvent::Content(text) => {
                session.text.push_str(&text);
                text
            }
            ChunkEvent::Done => {
                session.status = SessionStatus::Completed;
                tracing::info!(session = %session.id, chars = session.text.len(), "generation completed");
                String::new()
            }
            ChunkEvent::Error(message) => {
                tracing::warn!(session = %session.id, error = %message, "generation failed");
                let marker = format!("{ERROR_MARKER_PREFIX}{message}");
                session.text.push_str(&marker);
                session.status = SessionStatus::Failed;
                marker
            }
        };

        let update = GenerationUpdate {
            session: session.id,
            status: session.status,
            delta,
            accumulated_text: session.text.clone(),
        };
        if update.status.is_terminal() {
            self.release_subscription();
        }
        Some(update)
    }

    fn release_subscription(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}

impl<G> Drop for GenerationController<G> {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}

fn spawn_relay(
    session: SessionId,
    mut stream: ChunkStream,
    inbox: mpsc::UnboundedSender<Delivery>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = stream.next().await {
            let terminal = chunk.is_terminal();
            if inbox.send(Delivery { session, chunk }).is_err() || terminal {
                return;
            }
        }
        let _ = inbox.send(Delivery {
            session,
            chunk: StreamChunk::error(UNEXPECTED_END),
        });
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::stream;

    /// Generation provider replaying queued streams in order.
    #[derive(Default)]
    pub struct FakeGeneration {
        streams: Mutex<VecDeque<ChunkStream>>,
        pub opened: AtomicUsize,
    }

    impl FakeGeneration {
        pub fn script(self, chunks: Vec<StreamChunk>) -> Self {
            self.streams
                .lock()
                .unwrap()
                .push_back(Box::pin(stream::iter(chunks)));
            self
        }

        /// Queues a stream fed by the returned sender.
        pub fn channel(&self) -> mpsc::UnboundedSender<StreamChunk> {
            let (tx, rx) = mpsc::unbounded_channel();
            let chunks = stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            });
            self.streams.lock().unwrap().push_back(Box::pin(chunks));
            tx
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    impl GenerationProvider for FakeGeneration {
        fn open_stream(&self, _request: GenerationRequest) -> ChunkStream {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.streams
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Box::pin(stream::iter(vec![StreamChunk::done()])))
        }
    }

    pub fn settings() -> GenerationSettings {
        GenerationSettings {
            api_key: "sk-test".to_string(),
            ..GenerationSettings::default()
        }
    }

    async fn drain<G: GenerationProvider>(
        controller: &mut GenerationController<G>,
    ) -> Vec<GenerationUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = controller.next_update().await {
            updates.push(update);
        }
        updates
    }

    #[tokio::test]
    async fn content_accumulates_until_done() {
        let provider = FakeGeneration::default().script(vec![
            StreamChunk::content("Hello"),
            StreamChunk::content(", world"),
            StreamChunk::done(),
        ]);
        let mut controller = GenerationController::new(Arc::new(provider));

        let id = controller.start("prompt".to_string(), &settings()).unwrap();
        let updates = drain(&mut controller).await;

        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].delta, "Hello");
        assert_eq!(updates[1].accumulated_text, "Hello, world");
        assert_eq!(updates[2].status, SessionStatus::Completed);
        let session = controller.session().unwrap();
        assert_eq!(session.id(), id);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.text(), "Hello, world");
        assert_eq!(session.prompt(), "prompt");
    }

    #[tokio::test]
    async fn error_appends_exactly_one_marker_and_fails() {
        let provider = FakeGeneration::default().script(vec![
            StreamChunk::content("Partial"),
            StreamChunk::content(" text"),
            StreamChunk::error("rate limited"),
            StreamChunk::content("ignored"),
        ]);
        let mut controller = GenerationController::new(Arc::new(provider));

        controller.start("prompt".to_string(), &settings()).unwrap();
        let updates = drain(&mut controller).await;

        let session = controller.session().unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.text(), "Partial text\n\n> Error: rate limited");
        assert_eq!(session.text().matches("> Error:").count(), 1);
        assert_eq!(updates.last().unwrap().status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn stream_ending_without_done_fails() {
        let provider = FakeGeneration::default().script(vec![StreamChunk::content("cut")]);
        let mut controller = GenerationController::new(Arc::new(provider));

        controller.start("prompt".to_string(), &settings()).unwrap();
        drain(&mut controller).await;

        let session = controller.session().unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(
            session.text(),
            format!("cut{ERROR_MARKER_PREFIX}{UNEXPECTED_END}")
        );
    }

    #[tokio::test]
    async fn incomplete_settings_are_rejected_before_opening_a_stream() {
        let provider = Arc::new(FakeGeneration::default());
        let mut controller = GenerationController::new(Arc::clone(&provider));

        let err = controller
            .start("prompt".to_string(), &GenerationSettings::default())
            .unwrap_err();

        assert_eq!(err, ValidationError::MissingSetting { field: "api_key" });
        assert_eq!(provider.opened(), 0);
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn new_session_tears_down_previous_before_processing() {
        let provider = Arc::new(FakeGeneration::default());
        let first = provider.channel();
        let mut controller = GenerationController::new(Arc::clone(&provider));

        let a = controller.start("a".to_string(), &settings()).unwrap();
        first.send(StreamChunk::content("a1")).unwrap();
        let update = controller.next_update().await.unwrap();
        assert_eq!((update.session, update.delta.as_str()), (a, "a1"));

        // Let the old relay queue more output before switching sessions.
        first.send(StreamChunk::content("a2")).unwrap();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let second = provider.channel();
        let b = controller.start("b".to_string(), &settings()).unwrap();
        second.send(StreamChunk::content("b1")).unwrap();
        second.send(StreamChunk::done()).unwrap();
        let _ = first.send(StreamChunk::content("a3"));

        let updates = drain(&mut controller).await;
        assert!(updates.iter().all(|u| u.session == b));
        assert_eq!(controller.session().unwrap().text(), "b1");
        assert_eq!(controller.session().unwrap().status(), SessionStatus::Completed);
        assert!(b > a);
    }

    #[tokio::test]
    async fn cancelled_session_ignores_late_chunks() {
        let provider = Arc::new(FakeGeneration::default());
        let feed = provider.channel();
        let mut controller = GenerationController::new(Arc::clone(&provider));

        let id = controller.start("prompt".to_string(), &settings()).unwrap();
        feed.send(StreamChunk::content("early")).unwrap();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.cancel(), Some(id));
        let _ = feed.send(StreamChunk::content("late"));

        assert!(controller.next_update().await.is_none());
        assert!(controller.session().is_none());
        assert!(!controller.is_streaming());
    }

    #[tokio::test]
    async fn cancel_after_completion_keeps_the_result() {
        let provider = FakeGeneration::default()
            .script(vec![StreamChunk::content("done text"), StreamChunk::done()]);
        let mut controller = GenerationController::new(Arc::new(provider));

        controller.start("prompt".to_string(), &settings()).unwrap();
        drain(&mut controller).await;

        assert_eq!(controller.cancel(), None);
        assert_eq!(controller.session().unwrap().text(), "done text");
    }
}
