//! Per-subject bookkeeping of active and suspended runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::machine::WorkflowRun;
use crate::error::FlowError;

#[derive(Debug)]
enum Slot {
    /// A transport call for this subject is in progress.
    InFlight,
    /// A run is waiting for this subject's reply.
    Suspended(WorkflowRun),
}

/// Subject → active run map.
///
/// Each subject has at most one slot, so at most one Suspended run, and two
/// replies can never race onto the same continuation token. Every
/// check-then-set happens under the map lock; no lock is held across awaits.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a subject for a fresh run.
    pub fn begin_run(&self, subject_id: &str) -> Result<SubjectLease, FlowError> {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(subject_id) {
            return Err(FlowError::Protocol(match slot {
                Slot::Suspended(_) => format!(
                    "subject {subject_id} already has a suspended run; reply to it or abandon it first"
                ),
                Slot::InFlight => format!("subject {subject_id} already has a run in progress"),
            }));
        }
        slots.insert(subject_id.to_string(), Slot::InFlight);
        Ok(SubjectLease::new(self.clone(), subject_id))
    }

    /// Claim the subject's suspended run if `continuation_token` matches it.
    ///
    /// On a mismatch the run stays parked and a protocol error is returned.
    pub fn take_suspended(
        &self,
        subject_id: &str,
        continuation_token: &str,
    ) -> Result<(WorkflowRun, SubjectLease), FlowError> {
        let mut slots = self.lock();
        let token_matches = match slots.get(subject_id) {
            None => {
                return Err(FlowError::Protocol(format!(
                    "subject {subject_id} has no suspended run"
                )))
            }
            Some(Slot::InFlight) => {
                return Err(FlowError::Protocol(format!(
                    "subject {subject_id} already has a reply in progress"
                )))
            }
            Some(Slot::Suspended(run)) => run.continuation_token() == Some(continuation_token),
        };
        if !token_matches {
            return Err(FlowError::Protocol(
                "continuation token does not match the suspended run".to_string(),
            ));
        }

        match slots.insert(subject_id.to_string(), Slot::InFlight) {
            Some(Slot::Suspended(run)) => Ok((run, SubjectLease::new(self.clone(), subject_id))),
            _ => Err(FlowError::Protocol(format!(
                "subject {subject_id} has no suspended run"
            ))),
        }
    }

    /// Token of the subject's suspended run, if any.
    pub fn suspended_token(&self, subject_id: &str) -> Option<String> {
        match self.lock().get(subject_id) {
            Some(Slot::Suspended(run)) => run.continuation_token().map(str::to_string),
            _ => None,
        }
    }

    /// Whether the subject has a run in progress or waiting for a reply.
    pub fn is_active(&self, subject_id: &str) -> bool {
        self.lock().contains_key(subject_id)
    }

    /// Drop the subject's suspended run. Its token becomes unusable here;
    /// the remote service expires the session on its own.
    pub fn abandon(&self, subject_id: &str) -> Option<WorkflowRun> {
        let mut slots = self.lock();
        if !matches!(slots.get(subject_id), Some(Slot::Suspended(_))) {
            return None;
        }
        match slots.remove(subject_id) {
            Some(Slot::Suspended(run)) => {
                debug!(subject = subject_id, run_id = %run.run_id(), "Abandoned suspended run");
                Some(run)
            }
            _ => None,
        }
    }

    /// Number of subjects with an active or suspended run.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on a subject while one transport call runs.
///
/// Dropping the lease (including when the owning future is cancelled) frees
/// the subject. [`park`](Self::park) hands a suspended run back instead.
#[derive(Debug)]
pub struct SubjectLease {
    registry: SessionRegistry,
    subject_id: String,
    released: bool,
}

impl SubjectLease {
    fn new(registry: SessionRegistry, subject_id: &str) -> Self {
        Self {
            registry,
            subject_id: subject_id.to_string(),
            released: false,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Store a suspended run for the subject's next reply. Runs in any
    /// other state are discarded.
    pub fn park(mut self, run: WorkflowRun) {
        let mut slots = self.registry.lock();
        if run.continuation_token().is_some() {
            slots.insert(self.subject_id.clone(), Slot::Suspended(run));
        } else {
            slots.remove(&self.subject_id);
        }
        self.released = true;
    }
}

impl Drop for SubjectLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut slots = self.registry.lock();
        if matches!(slots.get(&self.subject_id), Some(Slot::InFlight)) {
            slots.remove(&self.subject_id);
        }
    }
}
