//! In-process [`ProcessStore`] used by tests and single-node deployments.
//!
//! `apply` works on a copy of the committed state and swaps it in only after
//! every change has been checked, so a rejected batch leaves no trace.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::{ChangeSet, ProcessSnapshot, ProcessStore};
use crate::constants::ProcessTypeId;
use crate::error::{PortalError, Result};
use crate::models::{AssignedEntity, Process, ProcessStep};

#[derive(Debug, Clone, Default)]
struct State {
    processes: HashMap<Uuid, Process>,
    steps: HashMap<Uuid, ProcessStep>,
    // step ids per process, in creation order
    step_order: HashMap<Uuid, Vec<Uuid>>,
    assignments: HashMap<AssignedEntity, Uuid>,
}

impl State {
    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        for process in changes.processes {
            if self.processes.contains_key(&process.id) {
                return Err(PortalError::DatabaseError(format!(
                    "duplicate key: process {} already exists",
                    process.id
                )));
            }
            self.processes.insert(process.id, process);
        }

        for step in changes.process_steps {
            if !self.processes.contains_key(&step.process_id) {
                return Err(PortalError::DatabaseError(format!(
                    "foreign key violation: process step {} references unknown process {}",
                    step.id, step.process_id
                )));
            }
            if self.steps.contains_key(&step.id) {
                return Err(PortalError::DatabaseError(format!(
                    "duplicate key: process step {} already exists",
                    step.id
                )));
            }
            self.step_order
                .entry(step.process_id)
                .or_default()
                .push(step.id);
            self.steps.insert(step.id, step);
        }

        for update in changes.step_updates {
            let step = self
                .steps
                .get_mut(&update.step_id)
                .filter(|step| step.process_step_status_id == update.expected_status)
                .ok_or(PortalError::ConcurrencyConflict {
                    entity: "process step",
                    id: update.step_id,
                })?;
            step.process_step_status_id = update.status;
            step.date_last_changed = update.date_last_changed;
        }

        for update in changes.process_updates {
            let process = self
                .processes
                .get_mut(&update.process_id)
                .filter(|process| process.version == update.expected_version)
                .ok_or(PortalError::ConcurrencyConflict {
                    entity: "process",
                    id: update.process_id,
                })?;
            process.version = update.version;
            process.lock_expiry_date = update.lock_expiry_date;
        }

        for assignment in changes.assignments {
            if !self.processes.contains_key(&assignment.process_id) {
                return Err(PortalError::DatabaseError(format!(
                    "foreign key violation: {} references unknown process {}",
                    assignment.entity, assignment.process_id
                )));
            }
            self.assignments
                .insert(assignment.entity, assignment.process_id);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProcessStore {
    state: RwLock<State>,
    commits: AtomicUsize,
}

impl InMemoryProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `apply` calls
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn process_count(&self) -> usize {
        self.state.read().processes.len()
    }

    pub fn step_count(&self) -> usize {
        self.state.read().steps.len()
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn find_process(&self, process_id: Uuid) -> Result<Option<ProcessSnapshot>> {
        let state = self.state.read();
        let Some(process) = state.processes.get(&process_id) else {
            return Ok(None);
        };
        let steps = state
            .step_order
            .get(&process_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.steps.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ProcessSnapshot {
            process: process.clone(),
            steps,
        }))
    }

    async fn process_type(&self, process_id: Uuid) -> Result<Option<ProcessTypeId>> {
        Ok(self
            .state
            .read()
            .processes
            .get(&process_id)
            .map(|process| process.process_type_id))
    }

    async fn assigned_process(&self, entity: AssignedEntity) -> Result<Option<Uuid>> {
        Ok(self.state.read().assignments.get(&entity).copied())
    }

    async fn apply(&self, changes: ChangeSet) -> Result<()> {
        let change_count = changes.len();
        let mut state = self.state.write();
        let mut working = state.clone();

        if let Err(err) = working.apply(changes) {
            warn!(error = %err, change_count, "in-memory process store rejected change set");
            return Err(err);
        }

        *state = working;
        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!(change_count, "in-memory process store applied change set");
        Ok(())
    }
}
