//! Error types for flowrun.

pub mod unified;

pub use unified::{DecodeWarning, ErrorCategory, RunFailure};

use thiserror::Error;

/// Text shown to end users when a remote failure carries no message.
pub const GENERIC_FAILURE_MESSAGE: &str = "The workflow failed to complete";

/// Primary error type for all flowrun operations.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Workflow error: {message}")]
    Remote { message: String, code: Option<i64> },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl FlowError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a remote error without a service error code.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            code: None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::Stream(_)
            | Self::Serialization(_) => ErrorCategory::Transport,
            Self::Remote { .. } => ErrorCategory::Remote,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Single human-readable line suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Remote { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::Timeout(_) => "The workflow took too long to respond".to_string(),
            Self::Cancelled => "The workflow was cancelled".to_string(),
            Self::Protocol(_) => {
                "The workflow could not continue from this point; please start again".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Snapshot of this error as stored on a failed run.
    pub fn to_failure(&self) -> RunFailure {
        RunFailure {
            category: self.category(),
            message: match self {
                Self::Remote { message, .. } => message.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FlowError>;
