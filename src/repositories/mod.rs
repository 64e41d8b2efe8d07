//! # Repositories and Unit of Work
//!
//! [`PortalRepositories`] is the unit of work one business operation runs in.
//! Repository views borrowed from it stage creations and optimistic updates
//! in memory; [`PortalRepositories::save_changes`] flushes the whole batch to
//! the [`ProcessStore`] in one atomic `apply`.
//!
//! Reads (`is_valid_process`, `get_process_steps`, `assigned_process`) always
//! go to the store and therefore only see committed data.

pub mod process_assignment_repository;
pub mod process_step_repository;

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProcessConfig;
use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use crate::database::{ChangeSet, ProcessStore};
use crate::error::{PortalError, Result};

pub use process_assignment_repository::ProcessAssignmentRepository;
pub use process_step_repository::ProcessStepRepository;

pub struct PortalRepositories<S: ProcessStore> {
    store: Arc<S>,
    config: ProcessConfig,
    changes: Mutex<ChangeSet>,
}

impl<S: ProcessStore> PortalRepositories<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ProcessConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: ProcessConfig) -> Self {
        Self {
            store,
            config,
            changes: Mutex::new(ChangeSet::default()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn process_steps(&self) -> ProcessStepRepository<'_, S> {
        ProcessStepRepository::new(self)
    }

    pub fn process_assignments(&self) -> ProcessAssignmentRepository<'_, S> {
        ProcessAssignmentRepository::new(self)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.lock().is_empty()
    }

    /// Copy of everything staged so far
    pub fn pending_changes(&self) -> ChangeSet {
        self.changes.lock().clone()
    }

    /// Drop everything staged so far
    pub fn discard_changes(&self) {
        let discarded = std::mem::take(&mut *self.changes.lock());
        if !discarded.is_empty() {
            debug!(change_count = discarded.len(), "discarded staged process changes");
        }
    }

    /// Types of steps staged for `process_id` that are still `TODO` in this batch
    pub fn staged_pending_step_types(&self, process_id: Uuid) -> HashSet<ProcessStepTypeId> {
        let changes = self.changes.lock();
        changes
            .process_steps
            .iter()
            .filter(|step| step.process_id == process_id)
            .filter(|step| {
                let status = changes
                    .step_updates
                    .iter()
                    .rev()
                    .find(|update| update.step_id == step.id)
                    .map_or(step.process_step_status_id, |update| update.status);
                status == ProcessStepStatusId::Todo
            })
            .map(|step| step.process_step_type_id)
            .collect()
    }

    pub(crate) fn stage(&self, f: impl FnOnce(&mut ChangeSet)) {
        f(&mut self.changes.lock());
    }

    /// Flush the staged batch in one atomic store operation.
    ///
    /// Returns the number of persisted row changes. The staged batch is
    /// consumed either way: a failed save persists nothing and leaves the
    /// unit of work empty.
    pub async fn save_changes(&self) -> Result<usize> {
        let changes = std::mem::take(&mut *self.changes.lock());
        let change_count = changes.len();

        if self.config.enforce_step_types {
            if let Err(err) = self.validate_step_types(&changes).await {
                warn!(error = %err, change_count, "discarding process changes that failed validation");
                return Err(err);
            }
        }

        if let Err(err) = self.store.apply(changes).await {
            warn!(error = %err, change_count, "failed to save process changes");
            return Err(err);
        }

        info!(change_count, "saved process changes");
        Ok(change_count)
    }

    async fn validate_step_types(&self, changes: &ChangeSet) -> Result<()> {
        let mut process_types: HashMap<Uuid, Option<ProcessTypeId>> = changes
            .processes
            .iter()
            .map(|process| (process.id, Some(process.process_type_id)))
            .collect();

        for step in &changes.process_steps {
            let process_type = match process_types.get(&step.process_id) {
                Some(process_type) => *process_type,
                None => {
                    let process_type = self.store.process_type(step.process_id).await?;
                    process_types.insert(step.process_id, process_type);
                    process_type
                }
            };

            // unknown processes are left to the store's referential check
            if let Some(process_type) = process_type {
                if !process_type.allows_step(step.process_step_type_id) {
                    return Err(PortalError::InvalidStepType {
                        process_type,
                        step_type: step.process_step_type_id,
                    });
                }
            }
        }
        Ok(())
    }
}
