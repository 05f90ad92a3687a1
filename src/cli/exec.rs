//! Remote command runner

use std::error::Error;
use std::io::{self, Write};

use crate::cli::follow::follow;
use crate::cli::Context;
use crate::core::chat::SendError;
use crate::core::exec::ExecService;
use crate::core::exec_log::{ExecLog, LogEntry};
use crate::core::stream::SessionState;

/// Prints log entries as they are appended. Errors go to stderr.
#[derive(Default)]
pub(crate) struct LogPrinter {
    shown: usize,
}

impl LogPrinter {
    pub(crate) fn render(
        &mut self,
        log: &ExecLog,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        for entry in log.entries().iter().skip(self.shown) {
            match entry {
                LogEntry::Error { .. } => writeln!(err, "{entry}")?,
                _ => writeln!(out, "{entry}")?,
            }
        }
        self.shown = log.entries().len();
        out.flush()
    }
}

pub async fn run_exec(ctx: &Context, command: Vec<String>) -> Result<(), Box<dyn Error>> {
    let command = command.join(" ");
    let exec = ExecService::new(ctx.client.clone(), &ctx.config);
    let updates = exec.store().subscribe();

    let handle = match exec.run(&command) {
        Ok(handle) => handle,
        Err(SendError::ServerDisabled) => {
            eprintln!("❌ The private server connection is disabled");
            eprintln!("💡 Enable it with: flames config set server.enabled on");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    let mut printer = LogPrinter::default();
    let state = follow(handle, updates, |log| {
        printer.render(log, &mut io::stdout(), &mut io::stderr())
    })
    .await?;

    if matches!(state, SessionState::Failed(_)) {
        std::process::exit(1);
    }
    Ok(())
}
