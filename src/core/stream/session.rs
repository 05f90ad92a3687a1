//! One request/stream/terminate cycle.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::{StreamError, TransportError};
use super::event::parse_frame;
use super::frame::{FrameDecoder, TrailingFrame};
use super::store::{Applied, SessionState, SessionTicket, SharedStore, StreamStore};

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Opens streaming requests against the backend.
///
/// Implementations return `Err` for any non-success status without reading
/// the body as an event stream.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, endpoint: &str, body: serde_json::Value)
        -> Result<ByteStream, TransportError>;
}

/// Per-session tuning, threaded in from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub idle_timeout: Option<Duration>,
    pub trailing: TrailingFrame,
}

enum Halt {
    Cancelled,
    Failed(StreamError),
}

pub struct StreamSession<S: StreamStore, T: Transport + ?Sized> {
    ticket: SessionTicket,
    store: SharedStore<S>,
    transport: std::sync::Arc<T>,
    endpoint: String,
    body: serde_json::Value,
    options: SessionOptions,
}

impl<S: StreamStore, T: Transport + ?Sized> StreamSession<S, T> {
    pub fn new(
        ticket: SessionTicket,
        store: SharedStore<S>,
        transport: std::sync::Arc<T>,
        endpoint: impl Into<String>,
        body: serde_json::Value,
        options: SessionOptions,
    ) -> Self {
        Self {
            ticket,
            store,
            transport,
            endpoint: endpoint.into(),
            body,
            options,
        }
    }

    pub fn spawn(self) -> SessionHandle<S> {
        let id = self.ticket.id;
        let store = self.store.clone();
        let task = tokio::spawn(self.run());
        SessionHandle { id, store, task }
    }

    /// Drive the session to a terminal state.
    pub async fn run(self) -> SessionState {
        let id = self.ticket.id;
        let cancel = self.ticket.cancel.clone();

        // The byte stream lives inside `drive`; losing the race drops it and
        // releases the connection.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Halt::Cancelled),
            outcome = self.drive() => outcome,
        };

        match outcome {
            Ok(()) => {
                info!(session = id, "stream completed");
                self.store.finish(id, Ok(()))
            }
            Err(Halt::Failed(err)) => {
                warn!(session = id, error = %err, "stream failed");
                self.store.finish(id, Err(err))
            }
            Err(Halt::Cancelled) => {
                debug!(session = id, "stream stopped after cancellation");
                SessionState::Cancelled
            }
        }
    }

    async fn drive(&self) -> Result<(), Halt> {
        let id = self.ticket.id;
        debug!(session = id, endpoint = %self.endpoint, "opening stream");

        // The idle window also covers waiting for the response headers.
        let open = self.transport.open(&self.endpoint, self.body.clone());
        let opened = match self.options.idle_timeout {
            Some(window) => tokio::time::timeout(window, open)
                .await
                .map_err(|_| Halt::Failed(StreamError::IdleTimeout(window)))?,
            None => open.await,
        };
        let mut body =
            opened.map_err(|err| Halt::Failed(StreamError::RequestFailed(err.to_string())))?;

        if !self.store.mark_streaming(id) {
            return Err(Halt::Cancelled);
        }

        let mut decoder = FrameDecoder::new(self.options.trailing);
        let mut received_any = false;

        loop {
            let next = match self.options.idle_timeout {
                Some(window) => tokio::time::timeout(window, body.next())
                    .await
                    .map_err(|_| Halt::Failed(StreamError::IdleTimeout(window)))?,
                None => body.next().await,
            };

            match next {
                None => break,
                Some(Err(err)) => {
                    let err = if received_any {
                        StreamError::StreamInterrupted(err.to_string())
                    } else {
                        StreamError::RequestFailed(err.to_string())
                    };
                    return Err(Halt::Failed(err));
                }
                Some(Ok(chunk)) => {
                    received_any = true;
                    for frame in decoder.push(&chunk) {
                        self.dispatch(&frame)?;
                    }
                }
            }
        }

        if let Some(frame) = decoder.finish() {
            self.dispatch(&frame)?;
        }
        Ok(())
    }

    fn dispatch(&self, frame: &str) -> Result<(), Halt> {
        let event = match parse_frame::<S::Event>(frame) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(err) => {
                debug!(session = self.ticket.id, error = %err, "dropping malformed frame");
                return Ok(());
            }
        };

        match self.store.apply(self.ticket.id, event) {
            Some(Applied::Continue) => Ok(()),
            Some(Applied::Failed(message)) => {
                Err(Halt::Failed(StreamError::Application(message)))
            }
            None => Err(Halt::Cancelled),
        }
    }
}

/// Handle to a spawned session.
pub struct SessionHandle<S: StreamStore> {
    id: u64,
    store: SharedStore<S>,
    task: JoinHandle<SessionState>,
}

impl<S: StreamStore> SessionHandle<S> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the session, freezing the store as it stands. Safe to call in any
    /// state; after the session ended it does nothing.
    pub fn cancel(&self) -> bool {
        self.store.cancel_session(self.id)
    }

    pub fn canceller(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let store = self.store.clone();
        let id = self.id;
        move || store.cancel_session(id)
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> SessionState {
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                warn!(session = self.id, error = %err, "session task aborted");
                SessionState::Cancelled
            }
        }
    }
}

/// Begin a session on `store` and spawn it.
///
/// `prepare` runs under the store lock right after any previous session was
/// cancelled; it records the optimistic local state and returns the request
/// body, which therefore sees exactly the state it was built from.
pub fn launch<S, T, B>(
    store: &SharedStore<S>,
    transport: std::sync::Arc<T>,
    endpoint: &str,
    options: SessionOptions,
    prepare: impl FnOnce(&mut S) -> B,
) -> SessionHandle<S>
where
    S: StreamStore,
    T: Transport + ?Sized,
    B: serde::Serialize,
{
    let (ticket, body) = store.begin(|state| serde_json::to_value(prepare(state)));
    match body {
        Ok(body) => StreamSession::new(ticket, store.clone(), transport, endpoint, body, options)
            .spawn(),
        Err(err) => {
            let state = store.finish(ticket.id, Err(StreamError::RequestFailed(err.to_string())));
            SessionHandle {
                id: ticket.id,
                store: store.clone(),
                task: tokio::spawn(async move { state }),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::testing::{Script, ScriptedTransport};
    use super::*;
    use crate::core::exec_log::{ExecLog, LogEntry};
    use crate::core::transcript::{Message, Transcript};

    fn chunk(text: &str) -> String {
        format!("data: {}\n\n", serde_json::json!({"type": "chunk", "text": text}))
    }

    const DONE: &str = "data: {\"type\":\"done\"}\n\n";

    fn start_chat(
        store: &SharedStore<Transcript>,
        transport: std::sync::Arc<ScriptedTransport>,
        options: SessionOptions,
    ) -> SessionHandle<Transcript> {
        let (ticket, ()) = store.begin(|transcript| {
            transcript.push_user(Message::user("hi", Vec::new()));
        });
        StreamSession::new(
            ticket,
            store.clone(),
            transport,
            "api/chat/stream",
            serde_json::json!({}),
            options,
        )
        .spawn()
    }

    #[tokio::test]
    async fn chunks_merge_into_one_reply_and_complete() {
        let body = format!("{}{}{}", chunk("Hel"), chunk("lo"), DONE);
        let (a, b) = body.split_at(7);
        let transport = ScriptedTransport::with(vec![ScriptedTransport::chunks(&[a, b])]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(state, SessionState::Completed);
        let transcript = store.snapshot();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].content, "Hello");
        assert!(!transcript.is_pending());
        assert!(transcript.open_index().is_none());
    }

    #[tokio::test]
    async fn end_of_stream_without_done_is_completion() {
        let transport = ScriptedTransport::with(vec![ScriptedTransport::chunks(&[&chunk("partial")])]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(state, SessionState::Completed);
        let transcript = store.snapshot();
        assert_eq!(transcript.messages()[1].content, "partial");
        assert!(!transcript.is_pending());
    }

    #[tokio::test]
    async fn malformed_frame_does_not_change_the_outcome() {
        let clean = format!("{}{}", chunk("ok"), DONE);
        let noisy = format!("{}data: {{\"type\":\"chunk\",\n\n{}", chunk("ok"), DONE);
        let transport = ScriptedTransport::with(vec![
            ScriptedTransport::chunks(&[&clean]),
            ScriptedTransport::chunks(&[&noisy]),
        ]);

        let clean_store = SharedStore::new(Transcript::default());
        let noisy_store = SharedStore::new(Transcript::default());
        start_chat(&clean_store, transport.clone(), SessionOptions::default())
            .wait()
            .await;
        let state = start_chat(&noisy_store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(state, SessionState::Completed);
        assert_eq!(clean_store.snapshot(), noisy_store.snapshot());
    }

    #[tokio::test]
    async fn failing_status_short_circuits_with_one_entry() {
        let transport = ScriptedTransport::with(vec![Script::Reject(500, "<html>oops".into())]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert!(matches!(
            state,
            SessionState::Failed(StreamError::RequestFailed(_))
        ));
        let transcript = store.snapshot();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.messages()[1].is_error);
        assert!(transcript.messages()[1]
            .content
            .starts_with("Error: request failed: backend returned 500"));
        assert!(!transcript.is_pending());
    }

    #[tokio::test]
    async fn drop_after_first_byte_keeps_partial_reply() {
        let transport = ScriptedTransport::with(vec![Script::Chunks(vec![
            Ok(Bytes::from(chunk("trunc"))),
            Err(TransportError::Body("connection reset".into())),
        ])]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(
            state,
            SessionState::Failed(StreamError::StreamInterrupted("connection reset".into()))
        );
        let transcript = store.snapshot();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[1].content, "trunc");
        assert_eq!(
            transcript.messages()[2].content,
            "Error: stream interrupted: connection reset"
        );
    }

    #[tokio::test]
    async fn drop_before_first_byte_is_a_request_failure() {
        let transport = ScriptedTransport::with(vec![Script::Chunks(vec![Err(
            TransportError::Connect("refused".into()),
        )])]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(
            state,
            SessionState::Failed(StreamError::RequestFailed("refused".into()))
        );
    }

    #[tokio::test]
    async fn application_error_is_surfaced_once() {
        let body = format!(
            "{}data: {{\"type\":\"error\",\"message\":\"quota exceeded\"}}\n\n{}",
            chunk("par"),
            chunk("ignored")
        );
        let transport = ScriptedTransport::with(vec![ScriptedTransport::chunks(&[&body])]);
        let store = SharedStore::new(Transcript::default());

        let state = start_chat(&store, transport, SessionOptions::default())
            .wait()
            .await;

        assert_eq!(
            state,
            SessionState::Failed(StreamError::Application("quota exceeded".into()))
        );
        let transcript = store.snapshot();
        let contents: Vec<_> = transcript
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hi", "par", "Error: quota exceeded"]);
    }

    #[tokio::test]
    async fn cancellation_freezes_the_transcript() {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = ScriptedTransport::with(vec![Script::Channel(rx)]);
        let store = SharedStore::new(Transcript::default());
        let mut updates = store.subscribe();

        let handle = start_chat(&store, transport, SessionOptions::default());
        tx.send(Ok(Bytes::from(format!("{}{}", chunk("one "), chunk("two ")))))
            .unwrap();

        loop {
            updates.changed().await.unwrap();
            let done = updates
                .borrow_and_update()
                .store
                .messages()
                .get(1)
                .is_some_and(|m| m.content == "one two ");
            if done {
                break;
            }
        }

        assert!(handle.cancel());
        let frozen = store.snapshot();
        for text in ["three ", "four ", "five"] {
            let _ = tx.send(Ok(Bytes::from(chunk(text))));
        }

        assert_eq!(handle.wait().await, SessionState::Cancelled);
        assert_eq!(store.snapshot(), frozen);
        assert_eq!(frozen.messages()[1].content, "one two ");
        assert!(!frozen.is_pending());
        assert_eq!(store.session_state(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_after_completion_is_a_no_op() {
        let transport = ScriptedTransport::with(vec![ScriptedTransport::chunks(&[DONE])]);
        let store = SharedStore::new(Transcript::default());

        let handle = start_chat(&store, transport, SessionOptions::default());
        let cancel = handle.canceller();
        assert_eq!(handle.wait().await, SessionState::Completed);
        assert!(!cancel());
        assert_eq!(store.session_state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn idle_timeout_fails_the_session() {
        let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, TransportError>>();
        let transport = ScriptedTransport::with(vec![Script::Channel(rx)]);
        let store = SharedStore::new(Transcript::default());
        let options = SessionOptions {
            idle_timeout: Some(Duration::from_millis(20)),
            ..SessionOptions::default()
        };

        let state = start_chat(&store, transport, options).wait().await;
        drop(tx);

        assert_eq!(
            state,
            SessionState::Failed(StreamError::IdleTimeout(Duration::from_millis(20)))
        );
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn idle_timeout_covers_a_request_that_never_answers() {
        let transport = ScriptedTransport::with(vec![Script::Hang]);
        let store = SharedStore::new(Transcript::default());
        let options = SessionOptions {
            idle_timeout: Some(Duration::from_millis(20)),
            ..SessionOptions::default()
        };

        let state = tokio::time::timeout(
            Duration::from_secs(2),
            start_chat(&store, transport, options).wait(),
        )
        .await
        .expect("session ends once the idle window passes");

        assert_eq!(
            state,
            SessionState::Failed(StreamError::IdleTimeout(Duration::from_millis(20)))
        );
        assert_eq!(store.session_state(), state);
        let transcript = store.snapshot();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.messages()[1].is_error);
        assert!(!transcript.is_pending());
    }

    #[tokio::test]
    async fn trailing_frame_flush_policy_applies_last_event() {
        let body = format!("{}data: {{\"type\":\"chunk\",\"text\":\"!\"}}", chunk("hey"));
        let transport = ScriptedTransport::with(vec![
            ScriptedTransport::chunks(&[&body]),
            ScriptedTransport::chunks(&[&body]),
        ]);

        let discard = SharedStore::new(Transcript::default());
        start_chat(&discard, transport.clone(), SessionOptions::default())
            .wait()
            .await;
        assert_eq!(discard.snapshot().messages()[1].content, "hey");

        let flush = SharedStore::new(Transcript::default());
        let options = SessionOptions {
            trailing: TrailingFrame::Flush,
            ..SessionOptions::default()
        };
        start_chat(&flush, transport, options).wait().await;
        assert_eq!(flush.snapshot().messages()[1].content, "hey!");
    }

    #[tokio::test]
    async fn exec_events_are_appended_without_merging() {
        let body = concat!(
            "data: {\"type\":\"start\",\"command\":\"ls\"}\n\n",
            "data: {\"type\":\"output\",\"data\":\"a\"}\n\n",
            "data: {\"type\":\"output\",\"data\":\"b\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        );
        let transport = ScriptedTransport::with(vec![ScriptedTransport::chunks(&[body])]);
        let store = SharedStore::new(ExecLog::default());
        let (ticket, ()) = store.begin(|log| log.begin_run());

        let state = StreamSession::new(
            ticket,
            store.clone(),
            transport,
            "api/private-server/exec/stream",
            serde_json::json!({}),
            SessionOptions::default(),
        )
        .run()
        .await;

        assert_eq!(state, SessionState::Completed);
        let log = store.snapshot();
        assert_eq!(
            log.entries(),
            &[
                LogEntry::Start {
                    command: "ls".into()
                },
                LogEntry::Output { data: "a".into() },
                LogEntry::Output { data: "b".into() },
                LogEntry::Done,
            ]
        );
        assert!(!log.is_running());
    }
}
