//! Append-only accumulation of message fragments.

/// Collects message fragments for a run in arrival order.
///
/// The text only grows. A segment marks where the current transport call
/// began, so a resumed call can report just what it produced.
#[derive(Debug, Clone, Default)]
pub struct ContentAccumulator {
    text: String,
    fragment_count: usize,
    segment_start: usize,
}

impl ContentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragment_count += 1;
    }

    /// All text accumulated over the lifetime of the run.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text accumulated since the last [`begin_segment`](Self::begin_segment).
    pub fn segment_text(&self) -> &str {
        &self.text[self.segment_start..]
    }

    pub fn begin_segment(&mut self) {
        self.segment_start = self.text.len();
    }

    /// Number of fragments pushed, empty ones included.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
