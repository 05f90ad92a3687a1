//! Remote command runs on the private development server.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ConnectionPayload, ExecRequest, EXEC_STREAM_ENDPOINT};
use crate::core::chat::SendError;
use crate::core::config::Config;
use crate::core::exec_log::ExecLog;
use crate::core::stream::{launch, SessionHandle, SessionOptions, SharedStore, Transport};

pub struct ExecService<T: Transport + ?Sized> {
    store: SharedStore<ExecLog>,
    transport: Arc<T>,
    connection: ConnectionPayload,
    options: SessionOptions,
}

impl<T: Transport + ?Sized> ExecService<T> {
    pub fn new(transport: Arc<T>, config: &Config) -> Self {
        Self {
            store: SharedStore::new(ExecLog::default()),
            transport,
            connection: config.private_server.to_payload(),
            options: config.stream.session_options(),
        }
    }

    pub fn store(&self) -> &SharedStore<ExecLog> {
        &self.store
    }

    /// Start a run. The previous log is cleared; a run still in flight is
    /// cancelled first.
    pub fn run(&self, command: &str) -> Result<SessionHandle<ExecLog>, SendError> {
        if !self.connection.enabled {
            return Err(SendError::ServerDisabled);
        }
        if command.trim().is_empty() {
            return Err(SendError::EmptyCommand);
        }

        debug!(command, "starting remote exec");
        Ok(launch(
            &self.store,
            Arc::clone(&self.transport),
            EXEC_STREAM_ENDPOINT,
            self.options,
            |log| {
                log.begin_run();
                ExecRequest {
                    connection: self.connection.clone(),
                    command: command.to_string(),
                }
            },
        ))
    }

    pub fn cancel(&self) -> bool {
        self.store.cancel()
    }
}
