//! Streaming types.

use serde::{Deserialize, Serialize};

/// A field block reconstructed from the raw stream, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub id: Option<String>,
    pub event_kind: Option<String>,
    pub data: Option<String>,
}

impl RawFrame {
    /// A frame is emitted only once both its kind and its data were seen.
    pub fn is_complete(&self) -> bool {
        self.event_kind.is_some() && self.data.is_some()
    }

    /// Build a complete frame. Mostly useful in tests.
    pub fn new(event_kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: None,
            event_kind: Some(event_kind.into()),
            data: Some(data.into()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A decoded event from the workflow stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental content to append to the run's text.
    MessageDelta { text: String },
    /// The workflow needs user input before it can continue.
    Interrupt {
        /// Token required to resume. Empty when the service omitted it.
        continuation_token: String,
        /// Interrupt type echoed back on resume, when the service sent one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interrupt_type: Option<i64>,
        /// The full interrupt payload as received.
        prompt_payload: serde_json::Value,
    },
    /// The run finished normally.
    Done,
    /// The service reported a failure. Terminal.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i64>,
    },
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::MessageDelta { text: text.into() }
    }

    /// Whether this event ends consumption of the current transport call.
    pub fn ends_call(&self) -> bool {
        !matches!(self, Self::MessageDelta { .. })
    }
}
