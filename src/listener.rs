//! Hooks for collaborators that observe run progress.

use uuid::Uuid;

use crate::error::{DecodeWarning, RunFailure};
use crate::session::WorkflowRun;

/// Observer of run progress.
///
/// Every method defaults to a no-op. Outcome hooks run before the outcome is
/// returned to the caller, so anything they persist (usage counters, quota,
/// delivery receipts) is committed before the run is discarded.
///
/// ```
/// use flowrun::listener::RunListener;
/// use flowrun::session::WorkflowRun;
///
/// struct Printer;
///
/// impl RunListener for Printer {
///     fn on_delta(&self, _run: &WorkflowRun, text: &str) {
///         print!("{text}");
///     }
/// }
/// ```
pub trait RunListener: Send + Sync {
    /// A message fragment was appended.
    fn on_delta(&self, _run: &WorkflowRun, _text: &str) {}

    /// A frame could not be decoded and was skipped. Called from inside the
    /// stream, so only the run id is available.
    fn on_decode_warning(&self, _run_id: Uuid, _warning: &DecodeWarning) {}

    /// The run is waiting for a reply.
    fn on_suspended(&self, _run: &WorkflowRun) {}

    fn on_completed(&self, _run: &WorkflowRun) {}

    fn on_failed(&self, _run: &WorkflowRun, _failure: &RunFailure) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RunListener for NoopListener {}
