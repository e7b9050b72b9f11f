//! Reassembly of `id:` / `event:` / `data:` field blocks from arbitrary chunks.

use tracing::{debug, warn};

use crate::types::RawFrame;

/// Rebuilds complete [`RawFrame`]s from a chunked text stream.
///
/// Chunk boundaries carry no meaning: a field line, a field prefix or a
/// multi-byte character may be split anywhere. The last incomplete line is
/// held back until the next chunk arrives.
///
/// ```
/// use flowrun::stream::FrameReassembler;
///
/// let mut reassembler = FrameReassembler::new();
/// assert!(reassembler.push("event: Mess").is_empty());
/// let frames = reassembler.push("age\ndata: {\"content\":\"hi\"}\n\n");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].event_kind.as_deref(), Some("Message"));
/// ```
#[derive(Debug)]
pub struct FrameReassembler {
    pending: String,
    partial_utf8: Vec<u8>,
    frame: RawFrame,
    max_line_bytes: usize,
    /// Set while the rest of an oversized line is being skipped.
    discarding: bool,
}

/// Longest unterminated line kept before it is discarded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

impl Default for FrameReassembler {
    fn default() -> Self {
        Self {
            pending: String::new(),
            partial_utf8: Vec::new(),
            frame: RawFrame::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            discarding: false,
        }
    }
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Feed a text chunk, returning every frame it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<RawFrame> {
        self.pending.push_str(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].find('\n') {
            let line_end = consumed + offset;
            let line = self.pending[consumed..line_end].trim_end_matches('\r');
            consumed = line_end + 1;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if let Some(frame) = process_line(&mut self.frame, line) {
                frames.push(frame);
            }
        }
        self.pending.drain(..consumed);

        if self.pending.len() > self.max_line_bytes {
            if !self.discarding {
                warn!(
                    pending_bytes = self.pending.len(),
                    limit = self.max_line_bytes,
                    "Discarding oversized line and its frame"
                );
            }
            self.pending.clear();
            self.frame = RawFrame::default();
            self.discarding = true;
        }
        frames
    }

    /// Feed raw bytes. Invalid sequences become U+FFFD; an incomplete
    /// sequence at the end of the chunk is carried over to the next call.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // Everything before `valid_up_to` is valid UTF-8.
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        self.push(&text)
    }

    /// End of stream. Anything not yet terminated by a blank line is
    /// discarded; returns whether something was dropped.
    pub fn finish(&mut self) -> bool {
        let dropped = !self.pending.trim().is_empty()
            || self.discarding
            || !self.partial_utf8.is_empty()
            || self.frame != RawFrame::default();
        if dropped {
            debug!(
                pending_bytes = self.pending.len(),
                kind = ?self.frame.event_kind,
                "Discarding unterminated frame at end of stream"
            );
        }
        *self = Self::default().with_max_line_bytes(self.max_line_bytes);
        dropped
    }
}

fn process_line(frame: &mut RawFrame, line: &str) -> Option<RawFrame> {
    if line.is_empty() {
        return complete_frame(frame);
    }
    if line.starts_with(':') {
        return None;
    }

    let (field, value) = match line.split_once(':') {
        Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    };
    match field {
        "id" => frame.id = Some(value.to_string()),
        "event" => frame.event_kind = Some(value.to_string()),
        "data" => frame.data = Some(value.to_string()),
        _ => {}
    }
    None
}

fn complete_frame(frame: &mut RawFrame) -> Option<RawFrame> {
    let frame = std::mem::take(frame);
    if frame.is_complete() {
        Some(frame)
    } else {
        if frame != RawFrame::default() {
            debug!(kind = ?frame.event_kind, "Dropping incomplete frame");
        }
        None
    }
}
