//! # Process Vocabulary
//!
//! Enumerations shared by the process engine and its callers: workflow kinds,
//! step kinds, and step statuses. Every enum is persisted as its integer id and
//! rendered as its upper-snake name.
//!
//! Step types are namespaced per workflow kind. The `process_step_types!`
//! table below is the single place that records which [`ProcessTypeId`] a
//! [`ProcessStepTypeId`] belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow kinds a [`Process`](crate::models::Process) can be created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessTypeId {
    ApplicationChecklist,
    UserProvisioning,
    IdentityproviderProvisioning,
    SelfDescriptionCreation,
    DimTechnicalUser,
}

impl ProcessTypeId {
    pub const ALL: [ProcessTypeId; 5] = [
        Self::ApplicationChecklist,
        Self::UserProvisioning,
        Self::IdentityproviderProvisioning,
        Self::SelfDescriptionCreation,
        Self::DimTechnicalUser,
    ];

    pub fn id(&self) -> i32 {
        match self {
            Self::ApplicationChecklist => 1,
            Self::UserProvisioning => 2,
            Self::IdentityproviderProvisioning => 3,
            Self::SelfDescriptionCreation => 4,
            Self::DimTechnicalUser => 5,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationChecklist => "APPLICATION_CHECKLIST",
            Self::UserProvisioning => "USER_PROVISIONING",
            Self::IdentityproviderProvisioning => "IDENTITYPROVIDER_PROVISIONING",
            Self::SelfDescriptionCreation => "SELF_DESCRIPTION_CREATION",
            Self::DimTechnicalUser => "DIM_TECHNICAL_USER",
        }
    }

    /// Whether `step` is one of this workflow's step types
    pub fn allows_step(&self, step: ProcessStepTypeId) -> bool {
        step.process_type() == *self
    }

    /// All step types belonging to this workflow kind
    pub fn step_types(&self) -> impl Iterator<Item = ProcessStepTypeId> + '_ {
        ProcessStepTypeId::ALL
            .iter()
            .copied()
            .filter(move |step| step.process_type() == *self)
    }
}

impl fmt::Display for ProcessTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessTypeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid process type: {s}"))
    }
}

/// Status of a single [`ProcessStep`](crate::models::ProcessStep).
///
/// `Todo` is the only non-terminal status. A failed step is never revived;
/// a retry is a new step (see the `Retrigger*` step types).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStepStatusId {
    #[default]
    Todo,
    Done,
    Skipped,
    Failed,
    Duplicate,
}

impl ProcessStepStatusId {
    pub const ALL: [ProcessStepStatusId; 5] = [
        Self::Todo,
        Self::Done,
        Self::Skipped,
        Self::Failed,
        Self::Duplicate,
    ];

    pub fn id(&self) -> i32 {
        match self {
            Self::Todo => 1,
            Self::Done => 2,
            Self::Skipped => 3,
            Self::Failed => 4,
            Self::Duplicate => 5,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Done => "DONE",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
            Self::Duplicate => "DUPLICATE",
        }
    }

    /// Pending execution by a worker
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Todo)
    }

    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for ProcessStepStatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStepStatusId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid process step status: {s}"))
    }
}

/// Builds [`ProcessStepTypeId`] from one table of
/// `Variant = id => "NAME", OwningProcessType;` rows.
macro_rules! process_step_types {
    ($( $variant:ident = $id:literal => $name:literal, $process:ident; )+) => {
        /// Kinds of work a [`ProcessStep`](crate::models::ProcessStep) can represent.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum ProcessStepTypeId {
            $( $variant, )+
        }

        impl ProcessStepTypeId {
            pub const ALL: &'static [ProcessStepTypeId] = &[ $( Self::$variant, )+ ];

            pub fn id(&self) -> i32 {
                match self {
                    $( Self::$variant => $id, )+
                }
            }

            pub fn from_id(id: i32) -> Option<Self> {
                match id {
                    $( $id => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }

            /// The workflow kind this step type belongs to
            pub fn process_type(&self) -> ProcessTypeId {
                match self {
                    $( Self::$variant => ProcessTypeId::$process, )+
                }
            }
        }
    };
}

process_step_types! {
    VerifyRegistration = 1 => "VERIFY_REGISTRATION", ApplicationChecklist;
    CreateBusinessPartnerNumberPush = 2 => "CREATE_BUSINESS_PARTNER_NUMBER_PUSH", ApplicationChecklist;
    CreateBusinessPartnerNumberPull = 3 => "CREATE_BUSINESS_PARTNER_NUMBER_PULL", ApplicationChecklist;
    CreateBusinessPartnerNumberManual = 4 => "CREATE_BUSINESS_PARTNER_NUMBER_MANUAL", ApplicationChecklist;
    CreateIdentityWallet = 5 => "CREATE_IDENTITY_WALLET", ApplicationChecklist;
    RetriggerIdentityWallet = 6 => "RETRIGGER_IDENTITY_WALLET", ApplicationChecklist;
    StartClearingHouse = 7 => "START_CLEARING_HOUSE", ApplicationChecklist;
    RetriggerClearingHouse = 8 => "RETRIGGER_CLEARING_HOUSE", ApplicationChecklist;
    EndClearingHouse = 9 => "END_CLEARING_HOUSE", ApplicationChecklist;
    StartSelfDescriptionLp = 10 => "START_SELF_DESCRIPTION_LP", ApplicationChecklist;
    RetriggerSelfDescriptionLp = 11 => "RETRIGGER_SELF_DESCRIPTION_LP", ApplicationChecklist;
    ActivateApplication = 12 => "ACTIVATE_APPLICATION", ApplicationChecklist;
    RetriggerBusinessPartnerNumberPush = 13 => "RETRIGGER_BUSINESS_PARTNER_NUMBER_PUSH", ApplicationChecklist;
    RetriggerBusinessPartnerNumberPull = 14 => "RETRIGGER_BUSINESS_PARTNER_NUMBER_PULL", ApplicationChecklist;
    OverrideBusinessPartnerNumber = 15 => "OVERRIDE_BUSINESS_PARTNER_NUMBER", ApplicationChecklist;
    FinishSelfDescriptionLp = 16 => "FINISH_SELF_DESCRIPTION_LP", ApplicationChecklist;
    DeclineApplication = 17 => "DECLINE_APPLICATION", ApplicationChecklist;

    DeleteCentralUser = 100 => "DELETE_CENTRAL_USER", UserProvisioning;
    RetriggerDeleteCentralUser = 101 => "RETRIGGER_DELETE_CENTRAL_USER", UserProvisioning;
    DeleteCompanyUserAssignedProcess = 102 => "DELETE_COMPANY_USER_ASSIGNED_PROCESS", UserProvisioning;
    RetriggerDeleteCompanyUserAssignedProcess = 103 => "RETRIGGER_DELETE_COMPANY_USER_ASSIGNED_PROCESS", UserProvisioning;

    DeleteIdpSharedRealm = 200 => "DELETE_IDP_SHARED_REALM", IdentityproviderProvisioning;
    RetriggerDeleteIdpSharedRealm = 201 => "RETRIGGER_DELETE_IDP_SHARED_REALM", IdentityproviderProvisioning;
    DeleteIdpSharedServiceaccount = 202 => "DELETE_IDP_SHARED_SERVICEACCOUNT", IdentityproviderProvisioning;
    RetriggerDeleteIdpSharedServiceaccount = 203 => "RETRIGGER_DELETE_IDP_SHARED_SERVICEACCOUNT", IdentityproviderProvisioning;
    DeleteCentralIdentityProvider = 204 => "DELETE_CENTRAL_IDENTITY_PROVIDER", IdentityproviderProvisioning;
    RetriggerDeleteCentralIdentityProvider = 205 => "RETRIGGER_DELETE_CENTRAL_IDENTITY_PROVIDER", IdentityproviderProvisioning;
    DeleteIdentityProvider = 206 => "DELETE_IDENTITY_PROVIDER", IdentityproviderProvisioning;

    SelfDescriptionConnectorCreation = 300 => "SELF_DESCRIPTION_CONNECTOR_CREATION", SelfDescriptionCreation;
    RetriggerSelfDescriptionConnectorCreation = 301 => "RETRIGGER_SELF_DESCRIPTION_CONNECTOR_CREATION", SelfDescriptionCreation;
    AwaitSelfDescriptionConnectorResponse = 302 => "AWAIT_SELF_DESCRIPTION_CONNECTOR_RESPONSE", SelfDescriptionCreation;
    RetriggerAwaitSelfDescriptionConnectorResponse = 303 => "RETRIGGER_AWAIT_SELF_DESCRIPTION_CONNECTOR_RESPONSE", SelfDescriptionCreation;
    SelfDescriptionCompanyCreation = 304 => "SELF_DESCRIPTION_COMPANY_CREATION", SelfDescriptionCreation;
    RetriggerSelfDescriptionCompanyCreation = 305 => "RETRIGGER_SELF_DESCRIPTION_COMPANY_CREATION", SelfDescriptionCreation;
    AwaitSelfDescriptionCompanyResponse = 306 => "AWAIT_SELF_DESCRIPTION_COMPANY_RESPONSE", SelfDescriptionCreation;
    RetriggerAwaitSelfDescriptionCompanyResponse = 307 => "RETRIGGER_AWAIT_SELF_DESCRIPTION_COMPANY_RESPONSE", SelfDescriptionCreation;

    CreateDimTechnicalUser = 400 => "CREATE_DIM_TECHNICAL_USER", DimTechnicalUser;
    RetriggerCreateDimTechnicalUser = 401 => "RETRIGGER_CREATE_DIM_TECHNICAL_USER", DimTechnicalUser;
    AwaitCreateDimTechnicalUserResponse = 402 => "AWAIT_CREATE_DIM_TECHNICAL_USER_RESPONSE", DimTechnicalUser;
}

impl fmt::Display for ProcessStepTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStepTypeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid process step type: {s}"))
    }
}
