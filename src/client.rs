//! Entry points for callers: start a run, answer its prompts, abandon it.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{FlowConfig, DEFAULT_TIMEOUT};
use crate::error::{DecodeWarning, FlowError};
use crate::listener::{NoopListener, RunListener};
use crate::session::{SessionRegistry, Step, SubjectLease, WorkflowRun};
use crate::stream::{event_stream, WarningSink};
use crate::transport::{HttpTransport, ResumeCall, RunCall, WorkflowTransport};
use crate::types::{InitiateRun, RunOutcome, RunStatus, StreamEvent, SubmitReply};
use crate::util::timeout::bounded;

enum OpenCall {
    Run(RunCall),
    Resume(ResumeCall),
}

/// Drives workflow runs for many subjects.
///
/// Runs for different subjects proceed concurrently; each subject has at
/// most one run in flight or suspended at a time.
///
/// # Example
///
/// ```no_run
/// use flowrun::client::WorkflowClient;
/// use flowrun::config::FlowConfig;
/// use flowrun::types::{InitiateRun, RunOutcome, SubmitReply, WorkflowKind};
///
/// # async fn example() -> flowrun::error::Result<()> {
/// let client = WorkflowClient::from_config(&FlowConfig::from_env())?;
/// let outcome = client
///     .initiate_run(
///         InitiateRun::builder()
///             .workflow_kind(WorkflowKind::NutritionPlan)
///             .subject_id("user-42")
///             .build(),
///     )
///     .await?;
///
/// if let RunOutcome::Suspended { continuation_token, prompt_text, .. } = outcome {
///     println!("{prompt_text}");
///     let outcome = client
///         .submit_reply(
///             SubmitReply::builder()
///                 .subject_id("user-42")
///                 .continuation_token(continuation_token)
///                 .reply_text("30")
///                 .build(),
///         )
///         .await?;
///     println!("{}", outcome.text());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkflowClient {
    transport: Arc<dyn WorkflowTransport>,
    registry: SessionRegistry,
    listener: Arc<dyn RunListener>,
    call_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(transport: Arc<dyn WorkflowTransport>) -> Self {
        Self {
            transport,
            registry: SessionRegistry::new(),
            listener: Arc::new(NoopListener),
            call_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client over the HTTP transport, with the configured call timeout.
    pub fn from_config(config: &FlowConfig) -> Result<Self, FlowError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)).with_call_timeout(config.timeout()))
    }

    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Wall-clock ceiling for each run or resume call, streaming included.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a run. Fails with a protocol error if the subject already has
    /// a run in progress or waiting for a reply.
    pub async fn initiate_run(&self, request: InitiateRun) -> Result<RunOutcome, FlowError> {
        require_non_blank("subject_id", &request.subject_id)?;
        let lease = self.registry.begin_run(&request.subject_id)?;
        let mut run = WorkflowRun::new(request.workflow_kind, &request.subject_id);
        info!(
            run_id = %run.run_id(),
            subject = %request.subject_id,
            kind = %request.workflow_kind,
            transport = self.transport.name(),
            "Starting workflow run"
        );

        let call = OpenCall::Run(RunCall {
            workflow_kind: request.workflow_kind,
            subject_id: request.subject_id,
            parameters: request.parameters,
        });
        let result = self.drive(&mut run, call, request.cancel.as_ref()).await;
        self.finish(run, lease, result)
    }

    /// Answer the prompt of the subject's suspended run.
    pub async fn submit_reply(&self, reply: SubmitReply) -> Result<RunOutcome, FlowError> {
        require_non_blank("subject_id", &reply.subject_id)?;
        require_non_blank("continuation_token", &reply.continuation_token)?;
        let (mut run, lease) = self
            .registry
            .take_suspended(&reply.subject_id, &reply.continuation_token)?;
        let suspension = match run.resume(&reply.continuation_token) {
            Ok(suspension) => suspension,
            Err(err) => {
                lease.park(run);
                return Err(err);
            }
        };
        info!(
            run_id = %run.run_id(),
            subject = %reply.subject_id,
            call = run.calls(),
            "Resuming workflow run"
        );

        let call = OpenCall::Resume(ResumeCall {
            workflow_kind: run.kind(),
            subject_id: reply.subject_id,
            continuation_token: suspension.continuation_token,
            interrupt_type: suspension.interrupt_type,
            reply: reply.reply_text,
        });
        let result = self.drive(&mut run, call, reply.cancel.as_ref()).await;
        self.finish(run, lease, result)
    }

    /// Forget the subject's suspended run, e.g. when the user leaves.
    pub fn abandon(&self, subject_id: &str) -> Option<WorkflowRun> {
        self.registry.abandon(subject_id)
    }

    /// Consume one transport call until the run suspends, completes or
    /// fails. The connection is dropped as soon as consumption stops.
    async fn drive(
        &self,
        run: &mut WorkflowRun,
        call: OpenCall,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), FlowError> {
        let run_id = run.run_id();
        let listener = self.listener.clone();
        let warnings: WarningSink = Arc::new(move |warning: &DecodeWarning| {
            listener.on_decode_warning(run_id, warning);
        });

        let consume = async {
            let chunks = match &call {
                OpenCall::Run(call) => self.transport.run(call).await?,
                OpenCall::Resume(call) => self.transport.resume(call).await?,
            };
            let mut events = event_stream(chunks, Some(warnings));

            while let Some(item) = events.next().await {
                let event = item?;
                let delta = match &event {
                    StreamEvent::MessageDelta { text } => Some(text.clone()),
                    _ => None,
                };
                match run.apply(event)? {
                    Step::Continue => {
                        if let Some(text) = delta {
                            self.listener.on_delta(run, &text);
                        }
                    }
                    Step::Suspended | Step::Completed => return Ok(()),
                }
            }

            Err::<(), _>(FlowError::Stream(
                "stream closed before the workflow finished or asked for input".to_string(),
            ))
        };

        let result = bounded(self.call_timeout, cancel, consume).await;

        if let Err(err) = &result {
            run.fail(err);
        }
        result
    }

    fn finish(
        &self,
        run: WorkflowRun,
        lease: SubjectLease,
        result: Result<(), FlowError>,
    ) -> Result<RunOutcome, FlowError> {
        if let Err(err) = result {
            if let Some(failure) = run.last_error() {
                self.listener.on_failed(&run, failure);
            }
            return Err(err);
        }

        let suspended = run.suspension().map(|suspension| RunOutcome::Suspended {
            run_id: run.run_id(),
            continuation_token: suspension.continuation_token.clone(),
            prompt_text: suspension.prompt_text.clone(),
            prompt_payload: suspension.prompt_payload.clone(),
        });
        if let Some(outcome) = suspended {
            self.listener.on_suspended(&run);
            lease.park(run);
            return Ok(outcome);
        }

        match run.status() {
            RunStatus::Completed => {
                self.listener.on_completed(&run);
                debug!(
                    run_id = %run.run_id(),
                    calls = run.calls(),
                    fragments = run.content().fragment_count(),
                    "Discarding completed run"
                );
                Ok(RunOutcome::Completed {
                    run_id: run.run_id(),
                    text: run.segment_text().to_string(),
                    full_text: run.text().to_string(),
                })
            }
            status => Err(FlowError::Protocol(format!(
                "run stopped consuming while {status}"
            ))),
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), FlowError> {
    if value.trim().is_empty() {
        return Err(FlowError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(())
}
