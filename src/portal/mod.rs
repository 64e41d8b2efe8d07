//! # Portal Callers
//!
//! Business operations that start and retrigger processes. They own no state
//! beyond the unit of work they are handed and issue exactly one
//! `save_changes` per operation.

pub mod connectors;
pub mod registration;

pub use connectors::{ConnectorDeletion, ConnectorStatusId, ConnectorsBusinessLogic, DocumentStatusId};
pub use registration::{
    ApplicationDeclineData, DeclineOutcome, IdentityProviderStatusData, IdentityProviderTypeId,
    RegistrationBusinessLogic,
};
