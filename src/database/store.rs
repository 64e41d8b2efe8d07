//! Storage seam for processes and process steps.
//!
//! A [`ProcessStore`] answers committed-state reads and applies a whole
//! [`ChangeSet`] atomically. Nothing staged in a unit of work is visible to
//! reads until `apply` has succeeded.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::ProcessTypeId;
use crate::error::Result;
use crate::models::{
    AssignedEntity, Process, ProcessAssignment, ProcessStep, ProcessStepUpdate, ProcessUpdate,
};

/// A committed process together with all of its steps in creation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub process: Process,
    pub steps: Vec<ProcessStep>,
}

/// Everything one business operation staged, in staging order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub processes: Vec<Process>,
    pub process_steps: Vec<ProcessStep>,
    pub step_updates: Vec<ProcessStepUpdate>,
    pub process_updates: Vec<ProcessUpdate>,
    pub assignments: Vec<ProcessAssignment>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of staged row changes
    pub fn len(&self) -> usize {
        self.processes.len()
            + self.process_steps.len()
            + self.step_updates.len()
            + self.process_updates.len()
            + self.assignments.len()
    }
}

#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Load a committed process and its steps
    async fn find_process(&self, process_id: Uuid) -> Result<Option<ProcessSnapshot>>;

    /// Type of a committed process
    async fn process_type(&self, process_id: Uuid) -> Result<Option<ProcessTypeId>> {
        Ok(self
            .find_process(process_id)
            .await?
            .map(|snapshot| snapshot.process.process_type_id))
    }

    /// Process currently assigned to `entity`
    async fn assigned_process(&self, entity: AssignedEntity) -> Result<Option<Uuid>>;

    /// Apply every change in `changes` or none of them
    async fn apply(&self, changes: ChangeSet) -> Result<()>;
}

#[async_trait]
impl<S: ProcessStore + ?Sized> ProcessStore for Arc<S> {
    async fn find_process(&self, process_id: Uuid) -> Result<Option<ProcessSnapshot>> {
        (**self).find_process(process_id).await
    }

    async fn process_type(&self, process_id: Uuid) -> Result<Option<ProcessTypeId>> {
        (**self).process_type(process_id).await
    }

    async fn assigned_process(&self, entity: AssignedEntity) -> Result<Option<Uuid>> {
        (**self).assigned_process(entity).await
    }

    async fn apply(&self, changes: ChangeSet) -> Result<()> {
        (**self).apply(changes).await
    }
}
