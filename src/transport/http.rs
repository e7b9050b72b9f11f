//! HTTP transport for the workflow service's `stream_run` / `stream_resume`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::debug;

use super::{ChunkStream, ResumeCall, RunCall, WorkflowTransport};
use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::types::WorkflowKind;

pub const RUN_PATH: &str = "/v1/workflow/stream_run";
pub const RESUME_PATH: &str = "/v1/workflow/stream_resume";

/// Streams workflow runs over HTTP.
///
/// Every call is bounded by the configured timeout, which covers reading
/// the whole body and not just the response headers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    bot_id: Option<String>,
    workflows: HashMap<WorkflowKind, String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &FlowConfig) -> Result<Self, FlowError> {
        config.validate()?;
        let api_token = config
            .api_token()
            .ok_or_else(|| FlowError::Configuration("Missing FLOWRUN_API_TOKEN".into()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| FlowError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            bot_id: config.bot_id().map(str::to_string),
            workflows: config.workflows().clone(),
            timeout: config.timeout(),
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", self.api_token)) {
            headers.insert(AUTHORIZATION, val);
        }
        headers
    }

    fn workflow_id(&self, kind: WorkflowKind) -> Result<&str, FlowError> {
        self.workflows
            .get(&kind)
            .map(String::as_str)
            .ok_or_else(|| FlowError::Configuration(format!("No workflow id configured for {kind}")))
    }

    async fn open(&self, path: &str, body: Value) -> Result<ChunkStream, FlowError> {
        let url = format!("{}{path}", self.base_url);
        let timeout = self.timeout;

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        // The service answers request-level failures with a JSON envelope
        // and a success status instead of a stream.
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            let body_text = resp.text().await.map_err(|e| map_reqwest_error(e, timeout))?;
            return Err(status_to_error(status, &body_text));
        }

        let stream = resp
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_reqwest_error(e, timeout)));
        Ok(stream.boxed())
    }
}

#[async_trait]
impl WorkflowTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(&self, call: &RunCall) -> Result<ChunkStream, FlowError> {
        let workflow_id = self.workflow_id(call.workflow_kind)?;
        let mut body = json!({
            "workflow_id": workflow_id,
            "parameters": call.parameters,
            "ext": { "user_id": call.subject_id },
        });
        if let Some(bot_id) = &self.bot_id {
            body["bot_id"] = json!(bot_id);
        }

        debug!(
            kind = %call.workflow_kind,
            subject = %call.subject_id,
            workflow_id,
            "Opening workflow run stream"
        );
        self.open(RUN_PATH, body).await
    }

    async fn resume(&self, call: &ResumeCall) -> Result<ChunkStream, FlowError> {
        let workflow_id = self.workflow_id(call.workflow_kind)?;
        let mut body = json!({
            "workflow_id": workflow_id,
            "event_id": call.continuation_token,
            "resume_data": call.reply,
        });
        if let Some(interrupt_type) = call.interrupt_type {
            body["interrupt_type"] = json!(interrupt_type);
        }

        debug!(
            kind = %call.workflow_kind,
            subject = %call.subject_id,
            workflow_id,
            "Opening workflow resume stream"
        );
        self.open(RESUME_PATH, body).await
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> FlowError {
    if err.is_timeout() {
        FlowError::Timeout(timeout.as_millis() as u64)
    } else {
        FlowError::Network(err)
    }
}

/// Build the error for a response that did not carry a stream.
pub fn status_to_error(status: u16, body: &str) -> FlowError {
    FlowError::api(status, error_envelope_message(body).unwrap_or_else(|| body.to_string()))
}

/// Message from the service's `{"code": .., "msg": ..}` error envelope.
fn error_envelope_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    let msg = value
        .get("msg")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)?;
    match value.get("code").and_then(Value::as_i64) {
        Some(code) => Some(format!("{msg} (code {code})")),
        None => Some(msg.to_string()),
    }
}
