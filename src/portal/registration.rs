//! Company registration workflows: starting the application checklist and
//! the deprovisioning cascade of a declined application.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use crate::database::ProcessStore;
use crate::error::{PortalError, Result};
use crate::logging::log_process_operation;
use crate::models::{AssignedEntity, Process};
use crate::repositories::PortalRepositories;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityProviderTypeId {
    /// Realm shared between companies on the central identity provider
    Shared,
    /// Company-owned identity provider linked to the central one
    Own,
    /// Provider managed by another company; only unlinked on decline
    Managed,
}

impl IdentityProviderTypeId {
    /// First deprovisioning step, or `None` when the provider is only unlinked
    pub fn deletion_step(&self) -> Option<ProcessStepTypeId> {
        match self {
            Self::Shared => Some(ProcessStepTypeId::DeleteIdpSharedRealm),
            Self::Own => Some(ProcessStepTypeId::DeleteCentralIdentityProvider),
            Self::Managed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderStatusData {
    pub identity_provider_id: Uuid,
    pub identity_provider_type_id: IdentityProviderTypeId,
}

/// What a declined application still references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDeclineData {
    pub identity_providers: Vec<IdentityProviderStatusData>,
    pub company_user_ids: Vec<Uuid>,
}

/// Processes started by a decline, each paired with the entity it deprovisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclineOutcome {
    pub identity_provider_processes: Vec<(Uuid, Process)>,
    pub company_user_processes: Vec<(Uuid, Process)>,
    /// Managed providers the company was unlinked from without a process
    pub unlinked_identity_providers: Vec<Uuid>,
}

pub struct RegistrationBusinessLogic<'a, S: ProcessStore> {
    repositories: &'a PortalRepositories<S>,
}

impl<'a, S: ProcessStore> RegistrationBusinessLogic<'a, S> {
    pub fn new(repositories: &'a PortalRepositories<S>) -> Self {
        Self { repositories }
    }

    /// Start the application checklist for a submitted application.
    ///
    /// Steps are created in `initial_step_types` order. An application gets
    /// at most one checklist process.
    #[instrument(skip(self, initial_step_types))]
    pub async fn submit_application_checklist(
        &self,
        application_id: Uuid,
        initial_step_types: impl IntoIterator<Item = ProcessStepTypeId>,
    ) -> Result<Process> {
        let entity = AssignedEntity::CompanyApplication(application_id);
        let assignments = self.repositories.process_assignments();
        if let Some(process_id) = assignments.assigned_process(entity).await? {
            return Err(PortalError::conflict(format!(
                "application {application_id} already has checklist process {process_id}"
            )));
        }

        let initial_step_types: Vec<ProcessStepTypeId> = initial_step_types.into_iter().collect();
        if initial_step_types.is_empty() {
            return Err(PortalError::unexpected(format!(
                "application {application_id} needs at least one initial checklist step"
            )));
        }

        let process_steps = self.repositories.process_steps();
        let process = process_steps.create_process(ProcessTypeId::ApplicationChecklist);
        process_steps.create_process_step_range(
            initial_step_types
                .into_iter()
                .map(|step_type| (step_type, ProcessStepStatusId::Todo, process.id)),
        );
        assignments.assign_process(entity, process.id);

        self.repositories.save_changes().await?;
        log_process_operation(
            "submit_application_checklist",
            process.id,
            process.process_type_id,
            None,
        );
        Ok(process)
    }

    /// Schedule deprovisioning of everything a declined application set up.
    ///
    /// `decline_data` is `None` when the application does not exist (or is not
    /// in a declinable status), which is reported as not found.
    #[instrument(skip(self, decline_data))]
    pub async fn decline_application(
        &self,
        application_id: Uuid,
        decline_data: Option<ApplicationDeclineData>,
    ) -> Result<DeclineOutcome> {
        let decline_data = decline_data.ok_or_else(|| {
            PortalError::not_found(format!("application {application_id} does not exist"))
        })?;

        let mut outcome = DeclineOutcome::default();
        let mut scheduled = Vec::new();
        for idp in &decline_data.identity_providers {
            match idp.identity_provider_type_id.deletion_step() {
                Some(step_type) => scheduled.push((idp.identity_provider_id, step_type)),
                None => outcome
                    .unlinked_identity_providers
                    .push(idp.identity_provider_id),
            }
        }

        outcome.identity_provider_processes = self.create_deprovisioning_processes(
            ProcessTypeId::IdentityproviderProvisioning,
            &scheduled,
            AssignedEntity::IdentityProvider,
        );

        let users: Vec<(Uuid, ProcessStepTypeId)> = decline_data
            .company_user_ids
            .iter()
            .map(|&user_id| (user_id, ProcessStepTypeId::DeleteCentralUser))
            .collect();
        outcome.company_user_processes = self.create_deprovisioning_processes(
            ProcessTypeId::UserProvisioning,
            &users,
            AssignedEntity::CompanyUser,
        );

        self.repositories.save_changes().await?;
        info!(
            application_id = %application_id,
            identity_provider_processes = outcome.identity_provider_processes.len(),
            company_user_processes = outcome.company_user_processes.len(),
            unlinked_identity_providers = outcome.unlinked_identity_providers.len(),
            "declined application"
        );
        Ok(outcome)
    }

    // One process per entity, created as ranges and paired positionally
    fn create_deprovisioning_processes(
        &self,
        process_type_id: ProcessTypeId,
        entities: &[(Uuid, ProcessStepTypeId)],
        assigned: fn(Uuid) -> AssignedEntity,
    ) -> Vec<(Uuid, Process)> {
        if entities.is_empty() {
            return Vec::new();
        }

        let process_steps = self.repositories.process_steps();
        let processes =
            process_steps.create_process_range(entities.iter().map(|_| process_type_id));
        process_steps.create_process_step_range(
            entities
                .iter()
                .zip(&processes)
                .map(|((_, step_type), process)| (*step_type, ProcessStepStatusId::Todo, process.id)),
        );
        self.repositories.process_assignments().assign_process_range(
            entities
                .iter()
                .zip(&processes)
                .map(|((entity_id, _), process)| (assigned(*entity_id), process.id)),
        );

        entities
            .iter()
            .map(|(entity_id, _)| *entity_id)
            .zip(processes)
            .collect()
    }
}
