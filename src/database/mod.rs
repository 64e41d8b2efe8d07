//! # Database Operations
//!
//! Storage for processes and process steps.
//!
//! ## Key Components
//!
//! - [`store`] - the [`ProcessStore`] trait and the [`ChangeSet`] a unit of work flushes
//! - [`in_memory`] - lock-protected in-process store
//! - [`postgres`] - SQLx/PostgreSQL store with transactional flushes
//! - [`connection`] - pool setup and embedded migrations

pub mod connection;
pub mod in_memory;
pub mod postgres;
pub mod store;

pub use connection::{DatabaseConnection, MIGRATOR};
pub use in_memory::InMemoryProcessStore;
pub use postgres::PgProcessStore;
pub use store::{ChangeSet, ProcessSnapshot, ProcessStore};
