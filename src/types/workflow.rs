//! Workflow run requests, lifecycle status and outcomes.

use std::collections::HashMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Which remote workflow a run drives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkflowKind {
    NutritionPlan,
    TrainingProgram,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 2] = [WorkflowKind::NutritionPlan, WorkflowKind::TrainingProgram];

    /// Suffix used for the per-kind environment variable.
    pub fn env_suffix(self) -> &'static str {
        match self {
            Self::NutritionPlan => "NUTRITION_PLAN",
            Self::TrainingProgram => "TRAINING_PROGRAM",
        }
    }
}

/// Lifecycle status of a [`WorkflowRun`](crate::session::WorkflowRun).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Start a new run for a subject.
///
/// ```
/// use flowrun::types::{InitiateRun, WorkflowKind};
///
/// let request = InitiateRun::builder()
///     .workflow_kind(WorkflowKind::NutritionPlan)
///     .subject_id("user-42")
///     .parameters([("goal".to_string(), "cut".to_string())].into())
///     .build();
/// assert_eq!(request.parameters["goal"], "cut");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct InitiateRun {
    pub workflow_kind: WorkflowKind,
    #[builder(into)]
    pub subject_id: String,
    #[builder(default)]
    pub parameters: HashMap<String, String>,
    /// Cancelling the token closes the connection and discards the run.
    pub cancel: Option<CancellationToken>,
}

/// Answer the prompt of a suspended run.
#[derive(Debug, Clone, Builder)]
pub struct SubmitReply {
    #[builder(into)]
    pub subject_id: String,
    #[builder(into)]
    pub continuation_token: String,
    #[builder(into)]
    pub reply_text: String,
    pub cancel: Option<CancellationToken>,
}

/// What the caller gets back from one transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The workflow finished. `text` is what this call produced.
    Completed {
        run_id: Uuid,
        text: String,
        /// Text of every call of the run, including earlier prompts.
        full_text: String,
    },
    /// The workflow is waiting for a reply.
    Suspended {
        run_id: Uuid,
        continuation_token: String,
        prompt_text: String,
        prompt_payload: serde_json::Value,
    },
}

impl RunOutcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Completed { run_id, .. } | Self::Suspended { run_id, .. } => *run_id,
        }
    }

    /// The text to show the user: final text or the pending prompt.
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { text, .. } => text,
            Self::Suspended { prompt_text, .. } => prompt_text,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    pub fn continuation_token(&self) -> Option<&str> {
        match self {
            Self::Suspended {
                continuation_token, ..
            } => Some(continuation_token),
            Self::Completed { .. } => None,
        }
    }
}
