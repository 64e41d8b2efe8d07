//! Connector self-description workflows and connector deletion decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
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
pub enum ConnectorStatusId {
    Pending,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatusId {
    Pending,
    Active,
    Inactive,
    Locked,
}

/// What deleting a connector amounts to, given its current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorDeletion {
    /// Remove the connector row
    DeleteWithoutDocuments,
    /// Remove the connector row together with its self-description document
    DeleteWithDocuments { sd_document_id: Uuid },
    /// Keep the connector as `INACTIVE` and deactivate its self-description document
    Deactivate {
        sd_document_id: Uuid,
        document_status: DocumentStatusId,
    },
}

impl ConnectorDeletion {
    pub fn decide(
        status: ConnectorStatusId,
        sd_document_id: Option<Uuid>,
        document_status: Option<DocumentStatusId>,
        clearinghouse_connect_disabled: bool,
    ) -> Result<Self> {
        use ConnectorStatusId::*;

        match (status, sd_document_id, document_status) {
            (Pending, None, _) => Ok(Self::DeleteWithoutDocuments),
            (Pending, Some(sd_document_id), _) => Ok(Self::DeleteWithDocuments { sd_document_id }),
            (Active, _, _) if clearinghouse_connect_disabled => Ok(Self::DeleteWithoutDocuments),
            (Active, None, None) => Ok(Self::DeleteWithoutDocuments),
            (Active, Some(sd_document_id), Some(document_status)) => Ok(Self::Deactivate {
                sd_document_id,
                document_status,
            }),
            (Active, Some(_), None) | (Active, None, Some(_)) | (Inactive, _, _) => {
                Err(PortalError::DeletionDeclined(format!(
                    "connector in status {status} with document {} and document status {} cannot be deleted",
                    sd_document_id.map_or_else(|| "none".to_string(), |id| id.to_string()),
                    document_status.map_or_else(|| "none".to_string(), |s| s.to_string()),
                )))
            }
        }
    }
}

impl fmt::Display for ConnectorStatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        };
        f.write_str(name)
    }
}

impl fmt::Display for DocumentStatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Locked => "LOCKED",
        };
        f.write_str(name)
    }
}

/// Self-description workflows for connectors
pub struct ConnectorsBusinessLogic<'a, S: ProcessStore> {
    repositories: &'a PortalRepositories<S>,
}

impl<'a, S: ProcessStore> ConnectorsBusinessLogic<'a, S> {
    pub fn new(repositories: &'a PortalRepositories<S>) -> Self {
        Self { repositories }
    }

    /// Start a self-description process for every connector that lacks a
    /// self-description and link it to the connector.
    ///
    /// Returns the created processes in connector order.
    #[instrument(skip(self, connector_ids))]
    pub async fn trigger_self_description_creation(
        &self,
        connector_ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<Vec<Process>> {
        let process_steps = self.repositories.process_steps();
        let assignments = self.repositories.process_assignments();

        let mut processes = Vec::new();
        for connector_id in connector_ids {
            let process = process_steps.create_process(ProcessTypeId::SelfDescriptionCreation);
            process_steps.create_process_step(
                ProcessStepTypeId::SelfDescriptionConnectorCreation,
                ProcessStepStatusId::Todo,
                process.id,
            );
            assignments.assign_process(AssignedEntity::Connector(connector_id), process.id);
            log_process_operation(
                "trigger_self_description",
                process.id,
                process.process_type_id,
                None,
            );
            processes.push(process);
        }

        self.repositories.save_changes().await?;
        info!(count = processes.len(), "triggered connector self-description creation");
        Ok(processes)
    }

    pub async fn retrigger_self_description_creation(&self, process_id: Uuid) -> Result<()> {
        self.retrigger_self_description_connector_creation(
            process_id,
            ProcessStepTypeId::RetriggerSelfDescriptionConnectorCreation,
        )
        .await
    }

    pub async fn retrigger_self_description_response_creation(&self, process_id: Uuid) -> Result<()> {
        self.retrigger_self_description_connector_creation(
            process_id,
            ProcessStepTypeId::RetriggerAwaitSelfDescriptionConnectorResponse,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrigger_self_description_connector_creation(
        &self,
        process_id: Uuid,
        step_to_trigger: ProcessStepTypeId,
    ) -> Result<()> {
        const NEXT_STEP: ProcessStepTypeId = ProcessStepTypeId::SelfDescriptionConnectorCreation;

        let (is_valid, process_data) = self
            .repositories
            .process_steps()
            .is_valid_process(process_id, ProcessTypeId::SelfDescriptionCreation, [step_to_trigger])
            .await?;
        if !is_valid {
            return Err(PortalError::not_found(format!(
                "process {process_id} does not exist"
            )));
        }

        let mut context = process_data.create_manual_process_data(
            Some(step_to_trigger),
            self.repositories,
            || format!("processId {process_id}"),
        )?;
        context.schedule_process_steps([NEXT_STEP]);
        context.finalize_process_step()?;

        self.repositories.save_changes().await?;
        log_process_operation(
            "retrigger_self_description",
            process_id,
            ProcessTypeId::SelfDescriptionCreation,
            Some(step_to_trigger.as_str()),
        );
        Ok(())
    }
}
