use portal_process::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use portal_process::error::PortalError;
use portal_process::models::AssignedEntity;
use portal_process::portal::{
    ApplicationDeclineData, IdentityProviderStatusData, IdentityProviderTypeId,
    RegistrationBusinessLogic,
};
use uuid::Uuid;

use crate::common::fixtures::in_memory_repositories;

fn idp(identity_provider_type_id: IdentityProviderTypeId) -> IdentityProviderStatusData {
    IdentityProviderStatusData {
        identity_provider_id: Uuid::new_v4(),
        identity_provider_type_id,
    }
}

#[tokio::test]
async fn test_decline_application_schedules_deprovisioning() {
    let (store, repositories) = in_memory_repositories();
    let identity_providers = vec![
        idp(IdentityProviderTypeId::Shared),
        idp(IdentityProviderTypeId::Own),
        idp(IdentityProviderTypeId::Managed),
    ];
    let company_user_ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

    let outcome = RegistrationBusinessLogic::new(&repositories)
        .decline_application(
            Uuid::new_v4(),
            Some(ApplicationDeclineData {
                identity_providers: identity_providers.clone(),
                company_user_ids: company_user_ids.clone(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.process_count(), 5);
    assert_eq!(
        outcome.unlinked_identity_providers,
        vec![identity_providers[2].identity_provider_id]
    );

    let expected_idp_steps = [
        ProcessStepTypeId::DeleteIdpSharedRealm,
        ProcessStepTypeId::DeleteCentralIdentityProvider,
    ];
    assert_eq!(outcome.identity_provider_processes.len(), 2);
    for ((idp_id, process), (source, step_type)) in outcome
        .identity_provider_processes
        .iter()
        .zip(identity_providers.iter().zip(expected_idp_steps))
    {
        assert_eq!(*idp_id, source.identity_provider_id);
        assert_eq!(process.process_type_id, ProcessTypeId::IdentityproviderProvisioning);
        let steps = repositories
            .process_steps()
            .get_process_steps(process.id)
            .await
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].process_step_type_id, step_type);
        assert_eq!(steps[0].process_step_status_id, ProcessStepStatusId::Todo);
        assert_eq!(
            repositories
                .process_assignments()
                .assigned_process(AssignedEntity::IdentityProvider(*idp_id))
                .await
                .unwrap(),
            Some(process.id)
        );
    }

    assert_eq!(
        outcome
            .company_user_processes
            .iter()
            .map(|(user_id, _)| *user_id)
            .collect::<Vec<_>>(),
        company_user_ids
    );
    for (user_id, process) in &outcome.company_user_processes {
        assert_eq!(process.process_type_id, ProcessTypeId::UserProvisioning);
        let steps = repositories
            .process_steps()
            .get_process_steps(process.id)
            .await
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].process_step_type_id, ProcessStepTypeId::DeleteCentralUser);
        assert_eq!(
            repositories
                .process_assignments()
                .assigned_process(AssignedEntity::CompanyUser(*user_id))
                .await
                .unwrap(),
            Some(process.id)
        );
    }
}

#[tokio::test]
async fn test_decline_unknown_application_is_not_found() {
    let (store, repositories) = in_memory_repositories();
    let application_id = Uuid::new_v4();

    let err = RegistrationBusinessLogic::new(&repositories)
        .decline_application(application_id, None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PortalError::NotFound(format!("application {application_id} does not exist"))
    );
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn test_submit_application_checklist() {
    let (_store, repositories) = in_memory_repositories();
    let application_id = Uuid::new_v4();
    let initial = [
        ProcessStepTypeId::VerifyRegistration,
        ProcessStepTypeId::CreateBusinessPartnerNumberPush,
        ProcessStepTypeId::CreateBusinessPartnerNumberManual,
    ];
    let registration = RegistrationBusinessLogic::new(&repositories);

    let process = registration
        .submit_application_checklist(application_id, initial)
        .await
        .unwrap();

    assert_eq!(process.process_type_id, ProcessTypeId::ApplicationChecklist);
    let steps = repositories
        .process_steps()
        .get_process_steps(process.id)
        .await
        .unwrap();
    assert_eq!(
        steps.iter().map(|s| s.process_step_type_id).collect::<Vec<_>>(),
        initial.to_vec()
    );

    let err = registration
        .submit_application_checklist(application_id, [ProcessStepTypeId::VerifyRegistration])
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Conflict(_)));
    assert!(!repositories.has_changes());
}

#[tokio::test]
async fn test_submit_application_checklist_needs_steps() {
    let (store, repositories) = in_memory_repositories();

    let err = RegistrationBusinessLogic::new(&repositories)
        .submit_application_checklist(Uuid::new_v4(), Vec::<ProcessStepTypeId>::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::UnexpectedCondition(_)));
    assert_eq!(store.process_count(), 0);
}
