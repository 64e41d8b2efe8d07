//! # Process Step Workflows
//!
//! Caller-side protocol on top of the repositories: validating that a
//! process waits on an expected step, then scheduling follow-up steps and
//! finalizing the validated step in the same unit of work.

pub mod manual_process_step;

pub use manual_process_step::ManualProcessStepData;
