use chrono::Utc;
use tracing::debug;

use super::events::StepEvent;
use crate::constants::ProcessStepStatusId;
use crate::error::{PortalError, Result};
use crate::models::ProcessStep;

/// Determine the status a step moves to when `event` is applied in `current`.
///
/// Only `Todo` accepts events; everything else is terminal.
pub fn determine_target_status(
    current: ProcessStepStatusId,
    event: StepEvent,
) -> Option<ProcessStepStatusId> {
    match (current, event) {
        (ProcessStepStatusId::Todo, StepEvent::Complete) => Some(ProcessStepStatusId::Done),
        (ProcessStepStatusId::Todo, StepEvent::Fail) => Some(ProcessStepStatusId::Failed),
        (ProcessStepStatusId::Todo, StepEvent::Skip) => Some(ProcessStepStatusId::Skipped),
        (ProcessStepStatusId::Todo, StepEvent::MarkDuplicate) => {
            Some(ProcessStepStatusId::Duplicate)
        }
        _ => None,
    }
}

/// Applies events to an in-memory copy of a step.
///
/// The machine only validates and mutates the copy; persisting the change is
/// the job of the unit of work.
#[derive(Debug, Clone)]
pub struct StepStateMachine {
    step: ProcessStep,
}

impl StepStateMachine {
    pub fn new(step: ProcessStep) -> Self {
        Self { step }
    }

    pub fn current_status(&self) -> ProcessStepStatusId {
        self.step.process_step_status_id
    }

    /// Attempt to transition the step, stamping `date_last_changed` on success
    pub fn transition(&mut self, event: StepEvent) -> Result<ProcessStepStatusId> {
        let current = self.current_status();
        let Some(target) = determine_target_status(current, event) else {
            return Err(PortalError::StateTransition {
                step_id: self.step.id,
                from: current,
                to: target_for_error(event),
            });
        };

        debug!(
            step_id = %self.step.id,
            event = event.event_type(),
            from = %current,
            to = %target,
            "process step transition"
        );

        self.step.process_step_status_id = target;
        self.step.date_last_changed = Utc::now();
        Ok(target)
    }

    pub fn step(&self) -> &ProcessStep {
        &self.step
    }

    pub fn into_step(self) -> ProcessStep {
        self.step
    }
}

fn target_for_error(event: StepEvent) -> ProcessStepStatusId {
    match event {
        StepEvent::Complete => ProcessStepStatusId::Done,
        StepEvent::Fail => ProcessStepStatusId::Failed,
        StepEvent::Skip => ProcessStepStatusId::Skipped,
        StepEvent::MarkDuplicate => ProcessStepStatusId::Duplicate,
    }
}
