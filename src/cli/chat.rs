//! One-shot chat: send a message and stream the reply to stdout

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cli::follow::follow;
use crate::cli::Context;
use crate::core::chat::ChatService;
use crate::core::stream::SessionState;
use crate::core::transcript::{Attachment, Transcript};
use crate::utils::transcript_log::TranscriptLog;

pub(crate) fn read_attachment(path: &Path) -> io::Result<Attachment> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Attachment {
        name,
        size: metadata.len(),
    })
}

/// Prints the part of each message past `start` that has not been shown yet.
/// Content only ever grows, so byte offsets stay on char boundaries.
pub(crate) struct ReplyPrinter {
    start: usize,
    shown: Vec<usize>,
}

impl ReplyPrinter {
    pub(crate) fn new(start: usize) -> Self {
        Self {
            start,
            shown: Vec::new(),
        }
    }

    pub(crate) fn render(
        &mut self,
        transcript: &Transcript,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        for (i, message) in transcript.messages().iter().skip(self.start).enumerate() {
            if i == self.shown.len() {
                self.shown.push(0);
            }
            let from = self.shown[i];
            if from >= message.content.len() {
                continue;
            }
            if message.is_error {
                writeln!(err, "\n❌ {}", message.content)?;
            } else {
                write!(out, "{}", &message.content[from..])?;
            }
            self.shown[i] = message.content.len();
        }
        out.flush()
    }
}

pub async fn run_chat(
    ctx: &Context,
    prompt: Vec<String>,
    attachment_paths: Vec<PathBuf>,
    log: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let attachments = attachment_paths
        .iter()
        .map(|path| {
            read_attachment(path)
                .map_err(|err| format!("cannot attach {}: {err}", path.display()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let log = log.map(TranscriptLog::open).transpose()?;

    let chat = ChatService::new(ctx.client.clone(), &ctx.config);
    let updates = chat.store().subscribe();
    let start = chat.store().read(|state| state.store.len());

    let handle = match chat.send(&prompt, attachments) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Usage: flames chat <prompt> [--attach FILE]...");
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    // Skip the user's own message
    let mut printer = ReplyPrinter::new(start + 1);
    let state = follow(handle, updates, |transcript| {
        printer.render(transcript, &mut io::stdout(), &mut io::stderr())
    })
    .await?;
    println!();

    if let Some(log) = log {
        let transcript = chat.store().snapshot();
        log.append(&transcript.messages()[start..])?;
    }

    if matches!(state, SessionState::Failed(_)) {
        std::process::exit(1);
    }
    Ok(())
}
