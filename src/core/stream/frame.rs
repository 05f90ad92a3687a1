//! Reassembly of `"\n\n"`-delimited text frames from a chunked byte stream.

use memchr::memmem;
use tracing::debug;

pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// What to do with bytes left over when the stream ends without a closing
/// delimiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingFrame {
    /// Drop the remainder. A frame is only valid once its delimiter arrived.
    #[default]
    Discard,
    /// Emit a non-empty remainder as one final frame.
    Flush,
}

/// Incremental frame decoder.
///
/// The carry-over buffer holds raw bytes rather than decoded text. A newline
/// byte never occurs inside a multi-byte UTF-8 sequence, so splitting on the
/// delimiter before decoding keeps characters that straddle two network
/// chunks intact.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    trailing: TrailingFrame,
}

impl FrameDecoder {
    pub fn new(trailing: TrailingFrame) -> Self {
        Self {
            buffer: Vec::new(),
            trailing,
        }
    }

    /// Feed the next chunk and collect every frame it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // A delimiter may straddle the previous chunk boundary.
        let search_from = self.buffer.len().saturating_sub(FRAME_DELIMITER.len() - 1);
        self.buffer.extend_from_slice(chunk);

        let finder = memmem::Finder::new(FRAME_DELIMITER);
        let mut frames = Vec::new();
        let mut start = 0;
        let mut cursor = search_from;

        while let Some(relative) = finder.find(&self.buffer[cursor..]) {
            let end = cursor + relative;
            let segment = &self.buffer[start..end];
            if !segment.is_empty() {
                frames.push(String::from_utf8_lossy(segment).into_owned());
            }
            start = end + FRAME_DELIMITER.len();
            cursor = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        frames
    }

    /// Bytes received but not yet terminated by a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Close the decoder at end of stream.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        match self.trailing {
            TrailingFrame::Discard => {
                debug!(
                    bytes = self.buffer.len(),
                    "discarding undelimited remainder at end of stream"
                );
                None
            }
            TrailingFrame::Flush => {
                let text = String::from_utf8_lossy(&self.buffer);
                if text.trim().is_empty() {
                    None
                } else {
                    Some(text.into_owned())
                }
            }
        }
    }
}
