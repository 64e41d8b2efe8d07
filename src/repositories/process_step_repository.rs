use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::PortalRepositories;
use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use crate::database::ProcessStore;
use crate::error::Result;
use crate::models::{
    NewProcessStep, Process, ProcessStep, ProcessStepUpdate, ProcessUpdate, VerifyProcessData,
};
use crate::state_machine::{StepEvent, StepStateMachine};

/// Process and process-step operations within one unit of work.
///
/// Creation methods stage rows and hand back the materialized values right
/// away; they become durable on the next
/// [`save_changes`](PortalRepositories::save_changes).
pub struct ProcessStepRepository<'a, S: ProcessStore> {
    repositories: &'a PortalRepositories<S>,
}

impl<'a, S: ProcessStore> ProcessStepRepository<'a, S> {
    pub(crate) fn new(repositories: &'a PortalRepositories<S>) -> Self {
        Self { repositories }
    }

    pub fn create_process(&self, process_type_id: ProcessTypeId) -> Process {
        let process = Process::new(Uuid::new_v4(), process_type_id, Uuid::new_v4());
        debug!(process_id = %process.id, process_type = %process_type_id, "staged process");
        self.repositories
            .stage(|changes| changes.processes.push(process.clone()));
        process
    }

    /// Batched [`create_process`](Self::create_process); output order follows input order
    pub fn create_process_range(
        &self,
        process_type_ids: impl IntoIterator<Item = ProcessTypeId>,
    ) -> Vec<Process> {
        let processes: Vec<Process> = process_type_ids
            .into_iter()
            .map(|process_type_id| Process::new(Uuid::new_v4(), process_type_id, Uuid::new_v4()))
            .collect();

        debug!(count = processes.len(), "staged process range");
        self.repositories
            .stage(|changes| changes.processes.extend(processes.iter().cloned()));
        processes
    }

    pub fn create_process_step(
        &self,
        process_step_type_id: ProcessStepTypeId,
        process_step_status_id: ProcessStepStatusId,
        process_id: Uuid,
    ) -> ProcessStep {
        let step = ProcessStep::new(
            Uuid::new_v4(),
            process_step_type_id,
            process_step_status_id,
            process_id,
            Utc::now(),
        );
        debug!(
            process_id = %process_id,
            step_type = %process_step_type_id,
            status = %process_step_status_id,
            "staged process step"
        );
        self.repositories
            .stage(|changes| changes.process_steps.push(step.clone()));
        step
    }

    /// Batched [`create_process_step`](Self::create_process_step).
    ///
    /// The i-th returned step is built from the i-th input tuple, so callers
    /// can pair results with their own data positionally.
    pub fn create_process_step_range(
        &self,
        process_steps: impl IntoIterator<Item = NewProcessStep>,
    ) -> Vec<ProcessStep> {
        let now = Utc::now();
        let steps: Vec<ProcessStep> = process_steps
            .into_iter()
            .map(|(step_type, status, process_id)| {
                ProcessStep::new(Uuid::new_v4(), step_type, status, process_id, now)
            })
            .collect();

        debug!(count = steps.len(), "staged process step range");
        self.repositories
            .stage(|changes| changes.process_steps.extend(steps.iter().cloned()));
        steps
    }

    /// Stage a status transition of a committed step.
    ///
    /// The transition is checked against the step state machine now and
    /// against the stored status at flush; a step changed by someone else in
    /// between makes the flush fail.
    pub fn modify_process_step_status(
        &self,
        step: &ProcessStep,
        event: StepEvent,
    ) -> Result<ProcessStep> {
        let expected_status = step.process_step_status_id;
        let mut machine = StepStateMachine::new(step.clone());
        machine.transition(event)?;
        let modified = machine.into_step();

        let update = ProcessStepUpdate {
            step_id: modified.id,
            expected_status,
            status: modified.process_step_status_id,
            date_last_changed: modified.date_last_changed,
        };
        self.repositories
            .stage(|changes| changes.step_updates.push(update));
        Ok(modified)
    }

    /// Stage an update of a committed process.
    ///
    /// `expected_version` is the version the caller read; `process` carries the
    /// new version and lock state.
    pub fn modify_process(&self, expected_version: Uuid, process: &Process) {
        let update = ProcessUpdate {
            process_id: process.id,
            expected_version,
            version: process.version,
            lock_expiry_date: process.lock_expiry_date,
        };
        debug!(process_id = %process.id, locked = process.lock_expiry_date.is_some(), "staged process update");
        self.repositories
            .stage(|changes| changes.process_updates.push(update));
    }

    /// Check that `process_id` names a committed process of `process_type_id`.
    ///
    /// Never fails for a missing process: that is reported as `false`. When
    /// valid, the returned data holds the process, its `TODO` steps whose
    /// type is in `process_step_type_ids`, and the types of all its `TODO`
    /// steps. Read-only.
    pub async fn is_valid_process(
        &self,
        process_id: Uuid,
        process_type_id: ProcessTypeId,
        process_step_type_ids: impl IntoIterator<Item = ProcessStepTypeId>,
    ) -> Result<(bool, VerifyProcessData)> {
        let filter: HashSet<ProcessStepTypeId> = process_step_type_ids.into_iter().collect();

        let snapshot = match self.repositories.store().find_process(process_id).await? {
            Some(snapshot) if snapshot.process.process_type_id == process_type_id => snapshot,
            _ => {
                debug!(process_id = %process_id, process_type = %process_type_id, "process is not valid");
                return Ok((false, VerifyProcessData::default()));
            }
        };

        let mut pending_step_types = Vec::new();
        let mut eligible = Vec::new();
        for step in snapshot.steps.into_iter().filter(ProcessStep::is_pending) {
            if !pending_step_types.contains(&step.process_step_type_id) {
                pending_step_types.push(step.process_step_type_id);
            }
            if filter.contains(&step.process_step_type_id) {
                eligible.push(step);
            }
        }

        Ok((
            true,
            VerifyProcessData::new(Some(snapshot.process), eligible, pending_step_types),
        ))
    }

    /// Committed steps of a process in creation order
    pub async fn get_process_steps(&self, process_id: Uuid) -> Result<Vec<ProcessStep>> {
        Ok(self
            .repositories
            .store()
            .find_process(process_id)
            .await?
            .map(|snapshot| snapshot.steps)
            .unwrap_or_default())
    }
}
