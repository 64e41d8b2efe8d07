use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Domain entity a process is driving work for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssignedEntity {
    Connector(Uuid),
    IdentityProvider(Uuid),
    CompanyUser(Uuid),
    CompanyApplication(Uuid),
}

impl AssignedEntity {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connector(_) => "connector",
            Self::IdentityProvider(_) => "identity_provider",
            Self::CompanyUser(_) => "company_user",
            Self::CompanyApplication(_) => "company_application",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::Connector(id)
            | Self::IdentityProvider(id)
            | Self::CompanyUser(id)
            | Self::CompanyApplication(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "connector" => Some(Self::Connector(id)),
            "identity_provider" => Some(Self::IdentityProvider(id)),
            "company_user" => Some(Self::CompanyUser(id)),
            "company_application" => Some(Self::CompanyApplication(id)),
            _ => None,
        }
    }
}

impl fmt::Display for AssignedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.entity_id())
    }
}

/// Link between a domain entity and the process working on it.
///
/// An entity has at most one assigned process; assigning again replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessAssignment {
    pub entity: AssignedEntity,
    pub process_id: Uuid,
}

impl ProcessAssignment {
    pub fn new(entity: AssignedEntity, process_id: Uuid) -> Self {
        Self { entity, process_id }
    }
}
