//! Lifecycle of a single workflow run.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::accumulator::ContentAccumulator;
use crate::error::{FlowError, RunFailure};
use crate::types::{RunStatus, StreamEvent, WorkflowKind};

/// State held while a run waits for a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Suspension {
    pub continuation_token: String,
    pub interrupt_type: Option<i64>,
    pub prompt_text: String,
    pub prompt_payload: Value,
}

#[derive(Debug, Clone)]
enum RunState {
    Running,
    Suspended(Suspension),
    Completed,
    Failed(RunFailure),
}

/// What the consumption loop does after applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading the current call.
    Continue,
    /// Stop reading; the run waits for a reply.
    Suspended,
    /// Stop reading; the run is finished.
    Completed,
}

/// One logical conversation with the remote workflow.
///
/// Mutated only through [`apply`](Self::apply), [`fail`](Self::fail) and
/// [`resume`](Self::resume). Completed and Failed are terminal.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    run_id: Uuid,
    kind: WorkflowKind,
    subject_id: String,
    started_at: DateTime<Utc>,
    calls: u32,
    content: ContentAccumulator,
    state: RunState,
}

impl WorkflowRun {
    /// Start a fresh run in the Running state.
    pub fn new(kind: WorkflowKind, subject_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            subject_id: subject_id.into(),
            started_at: Utc::now(),
            calls: 1,
            content: ContentAccumulator::new(),
            state: RunState::Running,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of transport calls this run has made (1 + resumes).
    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn status(&self) -> RunStatus {
        status_of(&self.state)
    }

    /// Present only while Suspended, and never empty.
    pub fn continuation_token(&self) -> Option<&str> {
        self.suspension().map(|s| s.continuation_token.as_str())
    }

    pub fn suspension(&self) -> Option<&Suspension> {
        match &self.state {
            RunState::Suspended(suspension) => Some(suspension),
            _ => None,
        }
    }

    /// Present only if Failed.
    pub fn last_error(&self) -> Option<&RunFailure> {
        match &self.state {
            RunState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Everything accumulated since the run began.
    pub fn text(&self) -> &str {
        self.content.text()
    }

    /// Text produced by the current (or last) transport call.
    pub fn segment_text(&self) -> &str {
        self.content.segment_text()
    }

    pub fn content(&self) -> &ContentAccumulator {
        &self.content
    }

    /// Apply one decoded event.
    ///
    /// Remote errors and an interrupt without a token fail the run and are
    /// returned as errors. Events are only accepted while Running.
    pub fn apply(&mut self, event: StreamEvent) -> Result<Step, FlowError> {
        if !matches!(self.state, RunState::Running) {
            warn!(run_id = %self.run_id, status = %self.status(), "Event received outside a running call");
            return Err(FlowError::Protocol(format!(
                "received {} event while run is {}",
                event_name(&event),
                self.status()
            )));
        }

        match event {
            StreamEvent::MessageDelta { text } => {
                self.content.push(&text);
                Ok(Step::Continue)
            }
            StreamEvent::Interrupt {
                continuation_token,
                interrupt_type,
                prompt_payload,
            } => {
                if continuation_token.is_empty() {
                    let err = FlowError::Protocol(
                        "interrupt carried no continuation token; the run cannot be resumed"
                            .to_string(),
                    );
                    self.fail(&err);
                    return Err(err);
                }
                let prompt_text = prompt_text(self.content.segment_text(), &prompt_payload);
                info!(run_id = %self.run_id, subject = %self.subject_id, "Run suspended");
                self.state = RunState::Suspended(Suspension {
                    continuation_token,
                    interrupt_type,
                    prompt_text,
                    prompt_payload,
                });
                Ok(Step::Suspended)
            }
            StreamEvent::Done => {
                info!(run_id = %self.run_id, subject = %self.subject_id, "Run completed");
                self.state = RunState::Completed;
                Ok(Step::Completed)
            }
            StreamEvent::Error { message, code } => {
                let err = FlowError::Remote { message, code };
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Move a running run to Failed. Returns false if it was not running.
    pub fn fail(&mut self, err: &FlowError) -> bool {
        if !matches!(self.state, RunState::Running) {
            return false;
        }
        info!(run_id = %self.run_id, subject = %self.subject_id, error = %err, "Run failed");
        self.state = RunState::Failed(err.to_failure());
        true
    }

    /// Leave Suspended for a new call, checking the caller's token.
    pub fn resume(&mut self, continuation_token: &str) -> Result<Suspension, FlowError> {
        let suspension = match std::mem::replace(&mut self.state, RunState::Running) {
            RunState::Suspended(s) if s.continuation_token == continuation_token => s,
            other => {
                let err = match &other {
                    RunState::Suspended(_) => FlowError::Protocol(
                        "continuation token does not match the suspended run".to_string(),
                    ),
                    _ => FlowError::Protocol(format!(
                        "cannot resume a run that is {}",
                        status_of(&other)
                    )),
                };
                self.state = other;
                return Err(err);
            }
        };
        self.calls += 1;
        self.content.begin_segment();
        Ok(suspension)
    }
}

fn status_of(state: &RunState) -> RunStatus {
    match state {
        RunState::Running => RunStatus::Running,
        RunState::Suspended(_) => RunStatus::Suspended,
        RunState::Completed => RunStatus::Completed,
        RunState::Failed(_) => RunStatus::Failed,
    }
}

fn event_name(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::MessageDelta { .. } => "Message",
        StreamEvent::Interrupt { .. } => "Interrupt",
        StreamEvent::Done => "Done",
        StreamEvent::Error { .. } => "Error",
    }
}

/// Text shown with a suspension: what this call said, or the interrupt's own
/// question when the call said nothing.
fn prompt_text(segment: &str, payload: &Value) -> String {
    if !segment.is_empty() {
        return segment.to_string();
    }
    payload
        .get("interrupt_data")
        .and_then(|d| d.get("data"))
        .and_then(Value::as_str)
        .map(crate::stream::unwrap_output_envelope)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;

    fn interrupt(token: &str) -> StreamEvent {
        StreamEvent::Interrupt {
            continuation_token: token.to_string(),
            interrupt_type: Some(2),
            prompt_payload: json!({"interrupt_data": {"event_id": token, "type": 2}}),
        }
    }

    #[test]
    fn new_run_is_running_without_token() {
        let run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        assert_eq!(run.status(), RunStatus::Running);
        assert_eq!(run.continuation_token(), None);
        assert!(run.last_error().is_none());
    }

    #[test]
    fn interrupt_suspends_with_token_and_prompt() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        assert_eq!(run.apply(StreamEvent::delta("Q1: ")).unwrap(), Step::Continue);
        assert_eq!(run.apply(StreamEvent::delta("age?")).unwrap(), Step::Continue);
        assert_eq!(run.apply(interrupt("tok-1")).unwrap(), Step::Suspended);

        assert_eq!(run.status(), RunStatus::Suspended);
        assert_eq!(run.continuation_token(), Some("tok-1"));
        assert_eq!(run.suspension().unwrap().prompt_text, "Q1: age?");
    }

    #[test]
    fn prompt_falls_back_to_interrupt_data() {
        let mut run = WorkflowRun::new(WorkflowKind::TrainingProgram, "bob");
        run.apply(StreamEvent::Interrupt {
            continuation_token: "t".into(),
            interrupt_type: None,
            prompt_payload: json!({"interrupt_data": {"event_id": "t", "data": "How tall are you?"}}),
        })
        .unwrap();
        assert_eq!(run.suspension().unwrap().prompt_text, "How tall are you?");
    }

    #[test]
    fn interrupt_without_token_fails_run() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        let err = run.apply(interrupt("")).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Protocol);
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.continuation_token(), None);
    }

    #[test]
    fn resume_checks_token_and_reenters_running() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        run.apply(StreamEvent::delta("Q1")).unwrap();
        run.apply(interrupt("tok-1")).unwrap();

        let err = run.resume("other").unwrap_err();
        assert!(matches!(err, FlowError::Protocol(_)));
        assert_eq!(run.status(), RunStatus::Suspended);

        let suspension = run.resume("tok-1").unwrap();
        assert_eq!(suspension.interrupt_type, Some(2));
        assert_eq!(run.status(), RunStatus::Running);
        assert_eq!(run.continuation_token(), None);
        assert_eq!(run.calls(), 2);
        assert_eq!(run.segment_text(), "");
        assert_eq!(run.text(), "Q1");
    }

    #[test]
    fn done_is_terminal() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        assert_eq!(run.apply(StreamEvent::Done).unwrap(), Step::Completed);
        assert_eq!(run.status(), RunStatus::Completed);

        assert!(run.apply(StreamEvent::delta("late")).is_err());
        assert!(matches!(run.resume("tok-1"), Err(FlowError::Protocol(_))));
        assert!(!run.fail(&FlowError::Timeout(10)));
        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.text(), "");
    }

    #[test]
    fn error_event_fails_with_remote_message() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        let err = run
            .apply(StreamEvent::Error {
                message: "boom".into(),
                code: None,
            })
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Remote);
        let failure = run.last_error().unwrap();
        assert_eq!(failure.category, ErrorCategory::Remote);
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn transport_failure_while_running() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        assert!(run.fail(&FlowError::Timeout(300_000)));
        assert_eq!(run.last_error().unwrap().category, ErrorCategory::Transport);
    }

    #[test]
    fn suspended_run_rejects_stream_events() {
        let mut run = WorkflowRun::new(WorkflowKind::NutritionPlan, "alice");
        run.apply(interrupt("tok-1")).unwrap();
        assert!(matches!(run.apply(StreamEvent::Done), Err(FlowError::Protocol(_))));
        assert_eq!(run.status(), RunStatus::Suspended);
    }
}
