//! Convenience re-exports for common use.

pub use crate::client::WorkflowClient;
pub use crate::config::FlowConfig;
pub use crate::error::{ErrorCategory, FlowError, Result};
pub use crate::listener::RunListener;
pub use crate::session::WorkflowRun;
pub use crate::transport::{ChunkStream, WorkflowTransport};
pub use crate::types::{InitiateRun, RunOutcome, RunStatus, StreamEvent, SubmitReply, WorkflowKind};
