use crate::core::transcript::{Message, Role};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Plain-text chat log appended to after every turn.
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    /// Open (creating if needed) the log file, failing early if it is not
    /// writable.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.flush()?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, messages: &[Message]) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        for message in messages {
            let rendered = match (message.role, message.is_error) {
                (_, true) => format!("## {}", message.content),
                (Role::User, false) => format!("You: {}", render_user(message)),
                (Role::Assistant, false) if message.content.is_empty() => continue,
                (Role::Assistant, false) => message.content.clone(),
            };
            for line in rendered.lines() {
                writeln!(writer, "{line}")?;
            }
            // Blank line between messages, matching the terminal output
            writeln!(writer)?;
        }

        writer.flush()
    }
}

fn render_user(message: &Message) -> String {
    let mut rendered = message.content.clone();
    for attachment in &message.attachments {
        rendered.push_str(&format!(
            "\n[attached {} ({} bytes)]",
            attachment.name, attachment.size
        ));
    }
    rendered
}
