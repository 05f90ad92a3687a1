//! Observable store cell shared between a stream session and its observers.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::StreamError;
use super::event::StreamEvent;

/// Result of reconciling one event into a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Continue,
    /// The event was a server-side error; the session ends as failed.
    Failed(String),
}

/// A store that folds one stream vocabulary into its state.
///
/// Applying the same event twice is not idempotent (chunks concatenate), so
/// the session applies every event exactly once, in frame order.
pub trait StreamStore: Send + Sync + 'static {
    type Event: StreamEvent;

    fn apply(&mut self, event: Self::Event) -> Applied;

    /// Record a transport-level failure as one terminal entry.
    fn fail(&mut self, error: &StreamError);

    /// Close any open entry and clear in-flight indicators.
    fn seal(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed(StreamError),
    Cancelled,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Requesting | SessionState::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed(_) | SessionState::Cancelled
        )
    }
}

/// Store contents plus the lifecycle of the session feeding it.
#[derive(Debug)]
pub struct StoreState<S> {
    pub store: S,
    pub session: SessionState,
    session_id: u64,
    cancel: Option<CancellationToken>,
}

impl<S> StoreState<S> {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.session_id == session_id && self.session.is_active()
    }
}

/// Identifies one session against its store.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub id: u64,
    pub cancel: CancellationToken,
}

/// Cloneable handle to a store fed by at most one session at a time.
///
/// All mutation goes through the watch channel's lock, so cancellation and
/// event application are strictly ordered with respect to each other.
pub struct SharedStore<S> {
    tx: Arc<watch::Sender<StoreState<S>>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S: StreamStore> SharedStore<S> {
    pub fn new(store: S) -> Self {
        let (tx, _) = watch::channel(StoreState {
            store,
            session: SessionState::Idle,
            session_id: 0,
            cancel: None,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Receive a notification after every change. Rapid changes may coalesce,
    /// but a receiver never observes them out of order.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<S>> {
        self.tx.subscribe()
    }

    pub fn read<R>(&self, f: impl FnOnce(&StoreState<S>) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.tx.borrow().store.clone()
    }

    pub fn session_state(&self) -> SessionState {
        self.tx.borrow().session.clone()
    }

    pub fn is_active(&self) -> bool {
        self.tx.borrow().session.is_active()
    }

    /// Open a new session. An active session is cancelled first; `prepare`
    /// runs under the same lock so the new turn lands atomically.
    pub(crate) fn begin<R>(&self, prepare: impl FnOnce(&mut S) -> R) -> (SessionTicket, R) {
        let mut outcome = None;
        self.tx.send_modify(|state| {
            if state.session.is_active() {
                info!(
                    session = state.session_id,
                    "cancelling active session for a new send"
                );
                if let Some(token) = state.cancel.take() {
                    token.cancel();
                }
                state.store.seal();
            }

            state.session_id += 1;
            state.session = SessionState::Requesting;
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            let prepared = prepare(&mut state.store);
            outcome = Some((
                SessionTicket {
                    id: state.session_id,
                    cancel: token,
                },
                prepared,
            ));
        });
        outcome.expect("send_modify runs the closure")
    }

    /// Cancel whichever session is active. Returns `false` if none was.
    pub fn cancel(&self) -> bool {
        let id = self.tx.borrow().session_id;
        self.cancel_session(id)
    }

    /// Cancel a specific session. A no-op once it has ended or been replaced.
    pub fn cancel_session(&self, session_id: u64) -> bool {
        self.tx.send_if_modified(|state| {
            if !state.is_current(session_id) {
                return false;
            }
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            state.store.seal();
            state.session = SessionState::Cancelled;
            info!(session = session_id, "session cancelled");
            true
        })
    }

    pub(crate) fn mark_streaming(&self, session_id: u64) -> bool {
        self.tx.send_if_modified(|state| {
            if !state.is_current(session_id) {
                return false;
            }
            state.session = SessionState::Streaming;
            true
        })
    }

    /// Apply one event if the session is still the live one.
    pub(crate) fn apply(&self, session_id: u64, event: S::Event) -> Option<Applied> {
        let mut applied = None;
        self.tx.send_if_modified(|state| {
            if !state.is_current(session_id) {
                debug!(session = session_id, "dropping event for inactive session");
                return false;
            }
            applied = Some(state.store.apply(event));
            true
        });
        applied
    }

    /// Move a live session into its terminal state.
    pub(crate) fn finish(&self, session_id: u64, outcome: Result<(), StreamError>) -> SessionState {
        let mut final_state = SessionState::Cancelled;
        self.tx.send_if_modified(|state| {
            if !state.is_current(session_id) {
                return false;
            }
            state.session = match outcome {
                Ok(()) => SessionState::Completed,
                Err(err) => {
                    if !err.is_application() {
                        state.store.fail(&err);
                    }
                    SessionState::Failed(err)
                }
            };
            state.store.seal();
            state.cancel = None;
            final_state = state.session.clone();
            true
        });
        final_state
    }
}
