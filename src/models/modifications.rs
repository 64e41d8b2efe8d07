//! Optimistic updates staged by a unit of work.
//!
//! Each update names the row it targets plus the value the caller read. The
//! store applies it only when the stored row still matches; otherwise the
//! whole flush fails with a concurrency conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ProcessStepStatusId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStepUpdate {
    pub step_id: Uuid,
    pub expected_status: ProcessStepStatusId,
    pub status: ProcessStepStatusId,
    pub date_last_changed: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessUpdate {
    pub process_id: Uuid,
    pub expected_version: Uuid,
    pub version: Uuid,
    pub lock_expiry_date: Option<DateTime<Utc>>,
}
