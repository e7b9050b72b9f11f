//! Transport seam between the run driver and the remote workflow service.

pub mod http;

pub use http::HttpTransport;

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::FlowError;
use crate::types::WorkflowKind;

/// Raw response body of one streaming call.
///
/// Connection-level failures arrive as `Err` items; the stream ends when the
/// connection closes. Dropping it closes the connection.
pub type ChunkStream = BoxStream<'static, Result<Bytes, FlowError>>;

/// Start a new run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCall {
    pub workflow_kind: WorkflowKind,
    pub subject_id: String,
    pub parameters: HashMap<String, String>,
}

/// Continue a suspended run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeCall {
    pub workflow_kind: WorkflowKind,
    pub subject_id: String,
    pub continuation_token: String,
    pub interrupt_type: Option<i64>,
    pub reply: String,
}

/// A remote workflow service reachable over a streaming connection.
///
/// Implementations report non-success statuses and network failures as
/// errors, never as stream events, and do not retry.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    /// Transport name used in logs (e.g. "http").
    fn name(&self) -> &str;

    /// Open the stream for a new run.
    async fn run(&self, call: &RunCall) -> Result<ChunkStream, FlowError>;

    /// Open the stream that continues a suspended run.
    async fn resume(&self, call: &ResumeCall) -> Result<ChunkStream, FlowError>;
}
