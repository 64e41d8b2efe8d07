use std::sync::Arc;

use portal_process::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use portal_process::database::ProcessStore;
use portal_process::error::PortalError;
use portal_process::repositories::PortalRepositories;
use portal_process::state_machine::StepEvent;

use crate::common::failing_store::FailingStore;
use crate::common::fixtures::{in_memory_repositories, seed_process};

#[tokio::test]
async fn test_staged_changes_are_invisible_until_saved() {
    let (store, repositories) = in_memory_repositories();
    let process_steps = repositories.process_steps();
    let process = process_steps.create_process(ProcessTypeId::UserProvisioning);
    process_steps.create_process_step(
        ProcessStepTypeId::DeleteCentralUser,
        ProcessStepStatusId::Todo,
        process.id,
    );

    assert!(repositories.has_changes());
    assert_eq!(repositories.pending_changes().len(), 2);
    assert!(store.find_process(process.id).await.unwrap().is_none());

    assert_eq!(repositories.save_changes().await.unwrap(), 2);
    assert!(!repositories.has_changes());
    assert_eq!(store.commit_count(), 1);
    assert_eq!(
        store.find_process(process.id).await.unwrap().unwrap().steps.len(),
        1
    );
}

#[tokio::test]
async fn test_failed_flush_persists_nothing() {
    let store = Arc::new(FailingStore::new());
    let repositories = PortalRepositories::new(store.clone());
    let process_steps = repositories.process_steps();

    let processes = process_steps.create_process_range([
        ProcessTypeId::UserProvisioning,
        ProcessTypeId::UserProvisioning,
    ]);
    process_steps.create_process_step_range(
        processes
            .iter()
            .map(|p| (ProcessStepTypeId::DeleteCentralUser, ProcessStepStatusId::Todo, p.id)),
    );
    process_steps.create_process_step_range([(
        ProcessStepTypeId::DeleteCompanyUserAssignedProcess,
        ProcessStepStatusId::Todo,
        processes[1].id,
    )]);

    store.fail_next_apply();
    let err = repositories.save_changes().await.unwrap_err();
    assert!(matches!(err, PortalError::DatabaseError(_)));
    assert!(!repositories.has_changes());

    for process in &processes {
        let (is_valid, data) = process_steps
            .is_valid_process(
                process.id,
                ProcessTypeId::UserProvisioning,
                [
                    ProcessStepTypeId::DeleteCentralUser,
                    ProcessStepTypeId::DeleteCompanyUserAssignedProcess,
                ],
            )
            .await
            .unwrap();
        assert!(!is_valid);
        assert!(data.process_steps.is_empty());
    }
    assert_eq!(store.inner().step_count(), 0);
    assert_eq!(store.apply_calls(), 1);
}

#[tokio::test]
async fn test_discarded_changes_are_never_flushed() {
    let (store, repositories) = in_memory_repositories();
    repositories
        .process_steps()
        .create_process(ProcessTypeId::ApplicationChecklist);
    repositories.discard_changes();

    assert_eq!(repositories.save_changes().await.unwrap(), 0);
    assert_eq!(store.process_count(), 0);
}

#[tokio::test]
async fn test_concurrent_step_updates_conflict() {
    let (store, first) = in_memory_repositories();
    let second = PortalRepositories::new(store.clone());
    let (_, steps) = seed_process(
        &first,
        ProcessTypeId::IdentityproviderProvisioning,
        &[(ProcessStepTypeId::DeleteIdpSharedRealm, ProcessStepStatusId::Todo)],
    )
    .await;

    first
        .process_steps()
        .modify_process_step_status(&steps[0], StepEvent::Complete)
        .unwrap();
    second
        .process_steps()
        .modify_process_step_status(&steps[0], StepEvent::Fail)
        .unwrap();

    first.save_changes().await.unwrap();
    let err = second.save_changes().await.unwrap_err();
    assert!(err.is_conflict());

    let snapshot = store.find_process(steps[0].process_id).await.unwrap().unwrap();
    assert_eq!(
        snapshot.steps[0].process_step_status_id,
        ProcessStepStatusId::Done
    );
}
