use tracing::debug;
use uuid::Uuid;

use super::PortalRepositories;
use crate::database::ProcessStore;
use crate::error::Result;
use crate::models::{AssignedEntity, ProcessAssignment};

/// Links between domain entities (connectors, identity providers, users,
/// applications) and the process working on them.
pub struct ProcessAssignmentRepository<'a, S: ProcessStore> {
    repositories: &'a PortalRepositories<S>,
}

impl<'a, S: ProcessStore> ProcessAssignmentRepository<'a, S> {
    pub(crate) fn new(repositories: &'a PortalRepositories<S>) -> Self {
        Self { repositories }
    }

    pub fn assign_process(&self, entity: AssignedEntity, process_id: Uuid) {
        debug!(entity = %entity, process_id = %process_id, "staged process assignment");
        self.repositories.stage(|changes| {
            changes
                .assignments
                .push(ProcessAssignment::new(entity, process_id))
        });
    }

    pub fn assign_process_range(
        &self,
        assignments: impl IntoIterator<Item = (AssignedEntity, Uuid)>,
    ) {
        let assignments: Vec<ProcessAssignment> = assignments
            .into_iter()
            .map(|(entity, process_id)| ProcessAssignment::new(entity, process_id))
            .collect();
        debug!(count = assignments.len(), "staged process assignment range");
        self.repositories
            .stage(|changes| changes.assignments.extend(assignments));
    }

    /// Committed process of `entity`, if any
    pub async fn assigned_process(&self, entity: AssignedEntity) -> Result<Option<Uuid>> {
        self.repositories.store().assigned_process(entity).await
    }
}
