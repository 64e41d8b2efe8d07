//! # Manual Process Step Context
//!
//! A validated handle that lets an external caller advance a process by
//! exactly one step, typically to retrigger a failed or stalled step:
//!
//! ```rust,no_run
//! use portal_process::constants::{ProcessStepTypeId, ProcessTypeId};
//! use portal_process::database::InMemoryProcessStore;
//! use portal_process::error::{PortalError, Result};
//! use portal_process::repositories::PortalRepositories;
//! use uuid::Uuid;
//!
//! # async fn retrigger(repositories: &PortalRepositories<InMemoryProcessStore>, process_id: Uuid) -> Result<()> {
//! let retrigger = ProcessStepTypeId::RetriggerSelfDescriptionConnectorCreation;
//! let (is_valid, data) = repositories
//!     .process_steps()
//!     .is_valid_process(process_id, ProcessTypeId::SelfDescriptionCreation, [retrigger])
//!     .await?;
//! if !is_valid {
//!     return Err(PortalError::not_found(format!("process {process_id} does not exist")));
//! }
//!
//! let mut context =
//!     data.create_manual_process_data(Some(retrigger), repositories, || format!("processId {process_id}"))?;
//! context.schedule_process_steps([ProcessStepTypeId::SelfDescriptionConnectorCreation]);
//! context.finalize_process_step()?;
//! repositories.save_changes().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Every operation only stages changes in the caller's unit of work. Process
//! updates carry the version read by `is_valid_process`, so when two callers
//! finalize the same step concurrently the second save fails with a
//! concurrency conflict instead of double-advancing the process.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::{ProcessStepStatusId, ProcessStepTypeId};
use crate::database::ProcessStore;
use crate::error::{PortalError, Result};
use crate::logging::log_step_operation;
use crate::models::{Process, ProcessStep, VerifyProcessData};
use crate::repositories::PortalRepositories;
use crate::state_machine::StepEvent;

pub struct ManualProcessStepData<'a, S: ProcessStore> {
    process_step_type_id: Option<ProcessStepTypeId>,
    process: Process,
    process_steps: Vec<ProcessStep>,
    pending_step_types: Vec<ProcessStepTypeId>,
    // eligible steps already moved out of TODO through this context
    handled_steps: HashSet<Uuid>,
    scheduled_step_types: HashSet<ProcessStepTypeId>,
    repositories: &'a PortalRepositories<S>,
}

impl VerifyProcessData {
    /// Build a manual context from the data returned by `is_valid_process`.
    ///
    /// `entity_name` is only called to build an error message.
    ///
    /// # Errors
    ///
    /// - `NotFound` when there is no process
    /// - `Conflict` when the process is locked or `process_step_type_id` is
    ///   not among the eligible steps
    /// - `UnexpectedCondition` when the data holds a step that is not `TODO`
    pub fn create_manual_process_data<'a, S: ProcessStore>(
        self,
        process_step_type_id: Option<ProcessStepTypeId>,
        repositories: &'a PortalRepositories<S>,
        entity_name: impl FnOnce() -> String,
    ) -> Result<ManualProcessStepData<'a, S>> {
        let Some(process) = self.process else {
            return Err(PortalError::not_found(format!(
                "{} does not exist",
                entity_name()
            )));
        };

        if let Some(expiry) = process.lock_expiry_date.filter(|_| process.is_locked()) {
            return Err(PortalError::conflict(format!(
                "process {} associated with {} is locked, lock expiry is set to {}",
                process.id,
                entity_name(),
                expiry.to_rfc3339()
            )));
        }

        if self.process_steps.iter().any(|step| !step.is_pending()) {
            return Err(PortalError::unexpected(
                "processSteps should never have any other status than TODO here",
            ));
        }

        if let Some(step_type) = process_step_type_id {
            if self
                .process_steps
                .iter()
                .all(|step| step.process_step_type_id != step_type)
            {
                return Err(PortalError::conflict(format!(
                    "{}, process step {} is not eligible to run",
                    entity_name(),
                    step_type
                )));
            }
        }

        debug!(
            process_id = %process.id,
            step_type = ?process_step_type_id,
            eligible_steps = self.process_steps.len(),
            "created manual process step context"
        );

        Ok(ManualProcessStepData {
            process_step_type_id,
            process,
            process_steps: self.process_steps,
            pending_step_types: self.pending_step_types,
            handled_steps: HashSet::new(),
            scheduled_step_types: HashSet::new(),
            repositories,
        })
    }
}

impl<'a, S: ProcessStore> ManualProcessStepData<'a, S> {
    pub fn process(&self) -> &Process {
        &self.process
    }

    pub fn process_step_type_id(&self) -> Option<ProcessStepTypeId> {
        self.process_step_type_id
    }

    /// Eligible steps this context was validated against
    pub fn process_steps(&self) -> &[ProcessStep] {
        &self.process_steps
    }

    /// Lock the process until `lock_expiry_date`
    pub fn request_lock(&mut self, lock_expiry_date: DateTime<Utc>) -> Result<()> {
        let expected_version = self.process.version;
        if !self.process.try_lock(lock_expiry_date) {
            return Err(PortalError::unexpected(
                "process TryLock should never fail here",
            ));
        }
        self.repositories
            .process_steps()
            .modify_process(expected_version, &self.process);
        Ok(())
    }

    /// Lock the process for the configured default duration
    pub fn request_default_lock(&mut self) -> Result<()> {
        let seconds = self.repositories.config().default_lock_seconds;
        let lock_expiry_date = i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|duration| Utc::now().checked_add_signed(duration))
            .ok_or_else(|| {
                PortalError::ConfigurationError(format!(
                    "default_lock_seconds {seconds} is out of range"
                ))
            })?;
        self.request_lock(lock_expiry_date)
    }

    /// Mark eligible steps of the given types `SKIPPED`.
    ///
    /// The step being finalized is never skipped. When several eligible steps
    /// share a type, the first is skipped and the rest become `DUPLICATE`.
    pub fn skip_process_steps(
        &mut self,
        process_step_type_ids: impl IntoIterator<Item = ProcessStepTypeId>,
    ) -> Result<()> {
        let types: HashSet<ProcessStepTypeId> = process_step_type_ids.into_iter().collect();
        self.skip_matching(|step_type| types.contains(&step_type))
    }

    /// Mark eligible steps of every type except the given ones `SKIPPED`
    pub fn skip_process_steps_except(
        &mut self,
        process_step_type_ids: impl IntoIterator<Item = ProcessStepTypeId>,
    ) -> Result<()> {
        let keep: HashSet<ProcessStepTypeId> = process_step_type_ids.into_iter().collect();
        self.skip_matching(|step_type| !keep.contains(&step_type))
    }

    fn skip_matching(&mut self, matches: impl Fn(ProcessStepTypeId) -> bool) -> Result<()> {
        let targets: Vec<ProcessStep> = self
            .process_steps
            .iter()
            .filter(|step| Some(step.process_step_type_id) != self.process_step_type_id)
            .filter(|step| matches(step.process_step_type_id))
            .filter(|step| !self.handled_steps.contains(&step.id))
            .cloned()
            .collect();

        self.close_steps_by_type(&targets, StepEvent::Skip)
    }

    /// Stage new `TODO` steps for this process.
    ///
    /// A type is skipped when a `TODO` step of that type is still pending for
    /// the process. That covers committed steps, steps staged in the same
    /// unit of work (through this context or otherwise) and earlier entries
    /// of `process_step_type_ids`. Eligible steps closed through this context
    /// no longer count. Returns the steps actually staged.
    pub fn schedule_process_steps(
        &mut self,
        process_step_type_ids: impl IntoIterator<Item = ProcessStepTypeId>,
    ) -> Vec<ProcessStep> {
        let staged = self.repositories.staged_pending_step_types(self.process.id);
        let mut to_create = Vec::new();
        for step_type in process_step_type_ids {
            if self.pending_step_types.contains(&step_type)
                || self.scheduled_step_types.contains(&step_type)
                || staged.contains(&step_type)
            {
                debug!(
                    process_id = %self.process.id,
                    step_type = %step_type,
                    "step already pending, not scheduling again"
                );
                continue;
            }
            self.scheduled_step_types.insert(step_type);
            to_create.push((step_type, ProcessStepStatusId::Todo, self.process.id));
        }

        if to_create.is_empty() {
            return Vec::new();
        }

        let created = self
            .repositories
            .process_steps()
            .create_process_step_range(to_create);
        for step in &created {
            log_step_operation(
                "schedule",
                self.process.id,
                step.process_step_type_id,
                step.process_step_status_id,
            );
        }
        created
    }

    /// Close the validated step and release or bump the process.
    ///
    /// The first eligible step of the validated type becomes `DONE`, any
    /// further eligible steps of that type become `DUPLICATE`. A held lock is
    /// released; otherwise the process version is renewed.
    pub fn finalize_process_step(mut self) -> Result<()> {
        let step_type = self.process_step_type_id.ok_or_else(|| {
            PortalError::unexpected("process step type must be set to finalize a process step")
        })?;

        let targets: Vec<ProcessStep> = self
            .process_steps
            .iter()
            .filter(|step| step.process_step_type_id == step_type)
            .filter(|step| !self.handled_steps.contains(&step.id))
            .cloned()
            .collect();

        if targets.is_empty() {
            return Err(PortalError::unexpected(format!(
                "process step {step_type} of process {} was already closed in this context",
                self.process.id
            )));
        }
        self.close_steps_by_type(&targets, StepEvent::Complete)?;

        let expected_version = self.process.version;
        if !self.process.release_lock() {
            self.process.update_version();
        }
        self.repositories
            .process_steps()
            .modify_process(expected_version, &self.process);

        info!(
            process_id = %self.process.id,
            step_type = %step_type,
            "finalized process step"
        );
        Ok(())
    }

    // per type: first step gets `event`, the rest are marked duplicate
    fn close_steps_by_type(&mut self, steps: &[ProcessStep], event: StepEvent) -> Result<()> {
        let repositories = self.repositories;
        let repository = repositories.process_steps();
        let mut seen_types = HashSet::new();

        for step in steps {
            let applied = if seen_types.insert(step.process_step_type_id) {
                event
            } else {
                StepEvent::MarkDuplicate
            };
            let modified = repository.modify_process_step_status(step, applied)?;
            self.handled_steps.insert(step.id);
            log_step_operation(
                applied.event_type(),
                self.process.id,
                modified.process_step_type_id,
                modified.process_step_status_id,
            );
        }

        // all TODO steps of an eligible type are eligible, so a fully closed type is no longer pending
        let process_steps = &self.process_steps;
        let handled_steps = &self.handled_steps;
        self.pending_step_types.retain(|step_type| {
            !seen_types.contains(step_type)
                || process_steps
                    .iter()
                    .any(|step| step.process_step_type_id == *step_type && !handled_steps.contains(&step.id))
        });
        Ok(())
    }
}
