//! Append-only log of a remote command run.

use std::fmt;

use serde::Serialize;

use crate::core::stream::{Applied, ExecEvent, StreamError, StreamStore};

/// One line of the terminal view. Unlike chat chunks, output pieces are
/// never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    Start { command: String },
    Log { line: String },
    Output { data: String },
    Error { message: String },
    Done,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Start { command } => write!(f, "> {command}"),
            LogEntry::Log { line } => f.write_str(line),
            LogEntry::Output { data } => f.write_str(data),
            LogEntry::Error { message } => write!(f, "error: {message}"),
            LogEntry::Done => f.write_str("[done]"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecLog {
    entries: Vec<LogEntry>,
    running: bool,
}

impl ExecLog {
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A new run starts from an empty log.
    pub fn begin_run(&mut self) {
        self.entries.clear();
        self.running = true;
    }
}

impl StreamStore for ExecLog {
    type Event = ExecEvent;

    fn apply(&mut self, event: ExecEvent) -> Applied {
        let entry = match event {
            ExecEvent::Start { command } => LogEntry::Start { command },
            ExecEvent::Log { line } => LogEntry::Log { line },
            ExecEvent::Output { data } => LogEntry::Output { data },
            ExecEvent::Error { message } => {
                self.entries.push(LogEntry::Error {
                    message: message.clone(),
                });
                self.running = false;
                return Applied::Failed(message);
            }
            ExecEvent::Done => {
                self.running = false;
                LogEntry::Done
            }
            ExecEvent::Unknown => return Applied::Continue,
        };
        self.entries.push(entry);
        Applied::Continue
    }

    fn fail(&mut self, error: &StreamError) {
        self.entries.push(LogEntry::Error {
            message: error.to_string(),
        });
        self.running = false;
    }

    fn seal(&mut self) {
        self.running = false;
    }
}
