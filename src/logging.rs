//! # Structured Logging
//!
//! `tracing` subscriber setup plus helpers that give process and step events
//! a consistent field layout.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once.
///
/// `RUST_LOG` wins over `config.level`. An already-installed global
/// subscriber (e.g. from a host application) is left in place.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }

        tracing::info!(json = config.json, level = %config.level, "structured logging initialized");
    });
}

/// Log a process-level operation
pub fn log_process_operation(
    operation: &str,
    process_id: Uuid,
    process_type: ProcessTypeId,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        process_id = %process_id,
        process_type = %process_type,
        details = details,
        "process operation"
    );
}

/// Log a step-level operation
pub fn log_step_operation(
    operation: &str,
    process_id: Uuid,
    step_type: ProcessStepTypeId,
    status: ProcessStepStatusId,
) {
    tracing::info!(
        operation = %operation,
        process_id = %process_id,
        step_type = %step_type,
        status = %status,
        "process step operation"
    );
}
