//! Error classification shared by runs, listeners and callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Broad failure category reported with every fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Timeout, reset, non-success status or premature close.
    Transport,
    /// The workflow service reported an error event.
    Remote,
    /// The client was used out of order, or the stream broke the protocol.
    Protocol,
    Configuration,
    InvalidInput,
    Cancelled,
}

/// Clonable record of why a run failed (the run's `last_error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub category: ErrorCategory,
    pub message: String,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Non-fatal problem with a single frame. The run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    /// Event kind of the offending frame.
    pub event_kind: String,
    /// Frame id, when the stream supplied one.
    pub frame_id: Option<String>,
    pub reason: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.frame_id {
            Some(id) => write!(f, "{} frame {id}: {}", self.event_kind, self.reason),
            None => write!(f, "{} frame: {}", self.event_kind, self.reason),
        }
    }
}
