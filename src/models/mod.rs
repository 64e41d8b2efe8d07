//! # Process Models
//!
//! Plain data types for processes, their steps, and the staged changes a unit
//! of work flushes to a [`ProcessStore`](crate::database::ProcessStore).

pub mod modifications;
pub mod process;
pub mod process_assignment;
pub mod process_step;
pub mod verify_process_data;

pub use modifications::{ProcessStepUpdate, ProcessUpdate};
pub use process::Process;
pub use process_assignment::{AssignedEntity, ProcessAssignment};
pub use process_step::{NewProcessStep, ProcessStep};
pub use verify_process_data::VerifyProcessData;
