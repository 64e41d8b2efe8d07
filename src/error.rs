//! # Error Types
//!
//! Structured errors for the process engine and its portal callers.
//!
//! The engine itself reports a missing process as data (see
//! [`ProcessStepRepository::is_valid_process`](crate::repositories::ProcessStepRepository::is_valid_process));
//! the variants below are raised by callers and by the unit of work when a
//! flush cannot be applied.

use thiserror::Error;
use uuid::Uuid;

use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortalError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Unexpected condition: {0}")]
    UnexpectedCondition(String),
    #[error("Concurrency conflict: {entity} {id} was modified or removed concurrently")]
    ConcurrencyConflict { entity: &'static str, id: Uuid },
    #[error("State transition error: process step {step_id} cannot move from {from} to {to}")]
    StateTransition {
        step_id: Uuid,
        from: ProcessStepStatusId,
        to: ProcessStepStatusId,
    },
    #[error("Process step type {step_type} is not valid for process type {process_type}")]
    InvalidStepType {
        process_type: ProcessTypeId,
        step_type: ProcessStepTypeId,
    },
    #[error("Connector deletion declined: {0}")]
    DeletionDeclined(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl PortalError {
    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an unexpected-condition error (a broken caller precondition)
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedCondition(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::ConcurrencyConflict { .. })
    }
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        PortalError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for PortalError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        PortalError::DatabaseError(format!("migration failed: {err}"))
    }
}

impl From<config::ConfigError> for PortalError {
    fn from(err: config::ConfigError) -> Self {
        PortalError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
