#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Portal Process
//!
//! Durable, resumable multi-step workflows for the portal backend: connector
//! self-description creation, application checklists, and the
//! deprovisioning of identity providers and users.
//!
//! ## Overview
//!
//! A [`Process`](models::Process) is one workflow instance; its
//! [`ProcessStep`](models::ProcessStep)s are units of work that start in
//! `TODO` and are closed exactly once (`DONE`, `FAILED`, `SKIPPED`,
//! `DUPLICATE`). External workers execute `TODO` steps. Business callers
//! start processes and, through the manual process step context, retrigger
//! a step that is waiting for an explicit action.
//!
//! All mutations are staged in a [`PortalRepositories`] unit of work and
//! flushed with a single `save_changes`, so every business operation becomes
//! visible atomically or not at all.
//!
//! ## Module Organization
//!
//! - [`constants`] - Process types, step types, and step statuses
//! - [`models`] - Processes, steps, assignments, and staged updates
//! - [`state_machine`] - Step status transitions
//! - [`database`] - Store seam with in-memory and PostgreSQL implementations
//! - [`repositories`] - Unit of work and repository views
//! - [`processes`] - Manual process step context (retrigger protocol)
//! - [`portal`] - Connector and registration workflows
//! - [`config`] - Configuration loading
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use portal_process::database::InMemoryProcessStore;
//! use portal_process::portal::ConnectorsBusinessLogic;
//! use portal_process::repositories::PortalRepositories;
//! use uuid::Uuid;
//!
//! # async fn example() -> portal_process::Result<()> {
//! let repositories = PortalRepositories::new(Arc::new(InMemoryProcessStore::new()));
//! let connectors = ConnectorsBusinessLogic::new(&repositories);
//!
//! let processes = connectors
//!     .trigger_self_description_creation([Uuid::new_v4()])
//!     .await?;
//! assert_eq!(processes.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                          # Unit tests
//! cargo test                                # Unit and integration tests
//! cargo test --features database-tests      # PostgreSQL store tests (needs DATABASE_URL)
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod portal;
pub mod processes;
pub mod repositories;
pub mod state_machine;

pub use config::{DatabaseConfig, LoggingConfig, PortalProcessConfig, ProcessConfig};
pub use constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
pub use database::{ChangeSet, InMemoryProcessStore, PgProcessStore, ProcessStore};
pub use error::{PortalError, Result};
pub use models::{Process, ProcessStep, VerifyProcessData};
pub use processes::ManualProcessStepData;
pub use repositories::PortalRepositories;
