//! Shared test helpers: scripted transport and recording listener.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use uuid::Uuid;

use flowrun::error::{DecodeWarning, FlowError, RunFailure};
use flowrun::listener::RunListener;
use flowrun::session::WorkflowRun;
use flowrun::transport::{ChunkStream, ResumeCall, RunCall, WorkflowTransport};

/// One field block in wire format.
pub fn frame(kind: &str, data: &str) -> String {
    format!("event: {kind}\ndata: {data}\n\n")
}

pub fn message(text: &str) -> String {
    frame(
        "Message",
        &serde_json::json!({ "content": text, "node_is_finish": false }).to_string(),
    )
}

pub fn interrupt(token: &str) -> String {
    frame(
        "Interrupt",
        &serde_json::json!({
            "interrupt_data": { "event_id": token, "type": 2 },
            "node_title": "question"
        })
        .to_string(),
    )
}

pub fn done() -> String {
    frame("Done", r#"{"debug_url":"https://example.test/debug"}"#)
}

/// Split `text` into chunks of at most `size` bytes.
pub fn chunked(text: &str, size: usize) -> Vec<Bytes> {
    text.as_bytes()
        .chunks(size)
        .map(Bytes::copy_from_slice)
        .collect()
}

/// How the scripted transport answers one call.
pub enum Script {
    /// Stream these chunks, then close.
    Chunks(Vec<Result<Bytes, FlowError>>),
    /// Stream these chunks, then never yield again.
    Hang(Vec<Bytes>),
    /// Fail before any stream is opened.
    Fail(FlowError),
}

impl Script {
    pub fn body(parts: &[String]) -> Self {
        Script::Chunks(parts.iter().map(|p| Ok(Bytes::from(p.clone()))).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Run(RunCall),
    Resume(ResumeCall),
}

/// Transport answering calls from per-subject scripts.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: Mutex<Vec<Recorded>>,
    dropped: Mutex<Vec<Arc<AtomicBool>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, subject: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(subject.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether every stream handed out so far has been dropped.
    pub fn all_streams_closed(&self) -> bool {
        self.dropped
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }

    fn open(&self, subject: &str) -> Result<ChunkStream, FlowError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(subject)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| FlowError::Stream(format!("no script left for {subject}")))?;

        let stream: ChunkStream = match script {
            Script::Fail(err) => return Err(err),
            Script::Chunks(items) => futures::stream::iter(items).boxed(),
            Script::Hang(items) => futures::stream::iter(items.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed(),
        };

        let flag = Arc::new(AtomicBool::new(false));
        self.dropped.lock().unwrap().push(flag.clone());
        let guard = DropFlag(flag);
        Ok(stream
            .map(move |item| {
                let _ = &guard;
                item
            })
            .boxed())
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkflowTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, call: &RunCall) -> Result<ChunkStream, FlowError> {
        self.calls.lock().unwrap().push(Recorded::Run(call.clone()));
        self.open(&call.subject_id)
    }

    async fn resume(&self, call: &ResumeCall) -> Result<ChunkStream, FlowError> {
        self.calls.lock().unwrap().push(Recorded::Resume(call.clone()));
        self.open(&call.subject_id)
    }
}

/// Listener that logs every callback as a short string.
#[derive(Default)]
pub struct RecordingListener {
    log: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl RunListener for RecordingListener {
    fn on_delta(&self, _run: &WorkflowRun, text: &str) {
        self.push(format!("delta:{text}"));
    }

    fn on_decode_warning(&self, _run_id: Uuid, warning: &DecodeWarning) {
        self.push(format!("warning:{}", warning.event_kind));
    }

    fn on_suspended(&self, run: &WorkflowRun) {
        self.push(format!("suspended:{}", run.continuation_token().unwrap_or_default()));
    }

    fn on_completed(&self, run: &WorkflowRun) {
        self.push(format!("completed:{}", run.text()));
    }

    fn on_failed(&self, _run: &WorkflowRun, failure: &RunFailure) {
        self.push(format!("failed:{}", failure.category));
    }
}
