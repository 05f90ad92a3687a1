//! Chat turns: optimistic user message, then a streamed assistant reply.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ChatRequest, CHAT_STREAM_ENDPOINT};
use crate::core::config::Config;
use crate::core::stream::{launch, SessionHandle, SessionOptions, SharedStore, Transport};
use crate::core::transcript::{Attachment, Message, Transcript};

/// Reasons a send or run is refused before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("nothing to send: the message is empty and has no attachments")]
    EmptyInput,
    #[error("the private server connection is disabled")]
    ServerDisabled,
    #[error("no command given")]
    EmptyCommand,
}

pub struct ChatService<T: Transport + ?Sized> {
    store: SharedStore<Transcript>,
    transport: Arc<T>,
    provider: String,
    model: String,
    options: SessionOptions,
}

impl<T: Transport + ?Sized> ChatService<T> {
    pub fn new(transport: Arc<T>, config: &Config) -> Self {
        Self {
            store: SharedStore::new(Transcript::default()),
            transport,
            provider: config.provider.provider.clone(),
            model: config.provider.model.clone(),
            options: config.stream.session_options(),
        }
    }

    pub fn store(&self) -> &SharedStore<Transcript> {
        &self.store
    }

    /// Append the user turn and start streaming the reply. A reply still in
    /// flight is cancelled first and keeps the text it already has.
    pub fn send(
        &self,
        input: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SessionHandle<Transcript>, SendError> {
        if input.trim().is_empty() && attachments.is_empty() {
            return Err(SendError::EmptyInput);
        }

        debug!(
            provider = %self.provider,
            model = %self.model,
            attachments = attachments.len(),
            "sending chat turn"
        );
        let handle = launch(
            &self.store,
            Arc::clone(&self.transport),
            CHAT_STREAM_ENDPOINT,
            self.options,
            |transcript| {
                transcript.push_user(Message::user(input, attachments));
                ChatRequest {
                    provider: self.provider.clone(),
                    model: self.model.clone(),
                    messages: transcript.api_messages(),
                }
            },
        );
        Ok(handle)
    }

    /// Stop the reply in flight, if any.
    pub fn cancel(&self) -> bool {
        self.store.cancel()
    }
}
