use serde::{Deserialize, Serialize};

use crate::constants::ProcessStepStatusId;

/// Events that can trigger process step status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    /// The step's action succeeded (or a manual retrigger handled it)
    Complete,
    /// The step's action failed terminally
    Fail,
    /// The step is no longer needed
    Skip,
    /// Another step of the same type already covers this one
    MarkDuplicate,
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::MarkDuplicate => "mark_duplicate",
        }
    }

    /// The event that produces `status`, if any
    pub fn for_target(status: ProcessStepStatusId) -> Option<Self> {
        match status {
            ProcessStepStatusId::Todo => None,
            ProcessStepStatusId::Done => Some(Self::Complete),
            ProcessStepStatusId::Failed => Some(Self::Fail),
            ProcessStepStatusId::Skipped => Some(Self::Skip),
            ProcessStepStatusId::Duplicate => Some(Self::MarkDuplicate),
        }
    }
}
