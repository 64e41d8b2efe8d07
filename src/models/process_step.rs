//! # Process Step Model
//!
//! One unit of work within a [`Process`](super::Process).
//!
//! Steps are ordered by creation; there is no sequence column. A step is never
//! deleted, only moved out of `TODO` by a worker or a manual retrigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ProcessStepStatusId, ProcessStepTypeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub id: Uuid,
    pub process_step_type_id: ProcessStepTypeId,
    pub process_step_status_id: ProcessStepStatusId,
    pub process_id: Uuid,
    pub date_created: DateTime<Utc>,
    pub date_last_changed: DateTime<Utc>,
}

/// Input row for batched step creation: `(step type, status, process id)`
pub type NewProcessStep = (ProcessStepTypeId, ProcessStepStatusId, Uuid);

impl ProcessStep {
    pub fn new(
        id: Uuid,
        process_step_type_id: ProcessStepTypeId,
        process_step_status_id: ProcessStepStatusId,
        process_id: Uuid,
        date_created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            process_step_type_id,
            process_step_status_id,
            process_id,
            date_created,
            date_last_changed: date_created,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.process_step_status_id.is_pending()
    }
}
