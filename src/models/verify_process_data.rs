use serde::{Deserialize, Serialize};

use super::{Process, ProcessStep};
use crate::constants::ProcessStepTypeId;

/// Read-only snapshot returned by `is_valid_process`.
///
/// `process_steps` holds the eligible steps: `TODO` steps whose type is in
/// the caller's filter set, in creation order. `pending_step_types` holds the
/// type of every `TODO` step of the process, eligible or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyProcessData {
    pub process: Option<Process>,
    pub process_steps: Vec<ProcessStep>,
    pub pending_step_types: Vec<ProcessStepTypeId>,
}

impl VerifyProcessData {
    pub fn new(
        process: Option<Process>,
        process_steps: Vec<ProcessStep>,
        pending_step_types: Vec<ProcessStepTypeId>,
    ) -> Self {
        Self {
            process,
            process_steps,
            pending_step_types,
        }
    }

    /// Eligible step types, deduplicated, in first-seen order
    pub fn eligible_step_types(&self) -> Vec<ProcessStepTypeId> {
        let mut types: Vec<ProcessStepTypeId> = Vec::new();
        for step in &self.process_steps {
            if !types.contains(&step.process_step_type_id) {
                types.push(step.process_step_type_id);
            }
        }
        types
    }
}
