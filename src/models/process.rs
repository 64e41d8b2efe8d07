//! # Process Model
//!
//! One instance of a durable, resumable multi-step workflow.
//!
//! ## Database Schema
//!
//! Maps to the `processes` table:
//! ```sql
//! CREATE TABLE processes (
//!   id UUID PRIMARY KEY,
//!   process_type_id INTEGER NOT NULL,
//!   version UUID NOT NULL,
//!   lock_expiry_date TIMESTAMPTZ
//! );
//! ```
//!
//! `version` is the optimistic-concurrency token: every modification writes a
//! fresh value and is only applied when the stored value still equals the one
//! the modifier read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ProcessTypeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: Uuid,
    pub process_type_id: ProcessTypeId,
    pub version: Uuid,
    pub lock_expiry_date: Option<DateTime<Utc>>,
}

impl Process {
    pub fn new(id: Uuid, process_type_id: ProcessTypeId, version: Uuid) -> Self {
        Self {
            id,
            process_type_id,
            version,
            lock_expiry_date: None,
        }
    }

    /// Whether a worker or manual caller holds the lock at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_expiry_date.is_some_and(|expiry| expiry > now)
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    /// Take the lock until `lock_expiry_date`. Returns false if it is already held.
    pub fn try_lock(&mut self, lock_expiry_date: DateTime<Utc>) -> bool {
        if self.is_locked() {
            return false;
        }
        self.lock_expiry_date = Some(lock_expiry_date);
        self.update_version();
        true
    }

    /// Release a held lock. Returns false if no lock was set.
    pub fn release_lock(&mut self) -> bool {
        if self.lock_expiry_date.is_none() {
            return false;
        }
        self.lock_expiry_date = None;
        self.update_version();
        true
    }

    pub fn update_version(&mut self) {
        self.version = Uuid::new_v4();
    }
}
