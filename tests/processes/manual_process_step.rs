use chrono::{Duration, Utc};
use std::cell::Cell;

use portal_process::config::ProcessConfig;
use portal_process::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use portal_process::database::{InMemoryProcessStore, ProcessStore};
use portal_process::error::PortalError;
use portal_process::models::{Process, VerifyProcessData};
use portal_process::repositories::PortalRepositories;

use crate::common::fixtures::{in_memory_repositories, seed_process, steps_of_type};

use portal_process::constants::ProcessStepStatusId::{Done, Duplicate, Skipped, Todo};
use portal_process::constants::ProcessStepTypeId::{
    AwaitSelfDescriptionConnectorResponse as AwaitResponse,
    RetriggerAwaitSelfDescriptionConnectorResponse as RetriggerAwaitResponse,
    RetriggerSelfDescriptionConnectorCreation as RetriggerCreation,
    SelfDescriptionConnectorCreation as Creation,
};

async fn validate(
    repositories: &PortalRepositories<InMemoryProcessStore>,
    process: &Process,
    step_types: &[ProcessStepTypeId],
) -> VerifyProcessData {
    let (is_valid, data) = repositories
        .process_steps()
        .is_valid_process(
            process.id,
            ProcessTypeId::SelfDescriptionCreation,
            step_types.iter().copied(),
        )
        .await
        .unwrap();
    assert!(is_valid);
    data
}

fn entity(process: &Process) -> impl FnOnce() -> String + '_ {
    move || format!("processId {}", process.id)
}

#[tokio::test]
async fn test_retrigger_round_trip() {
    let (store, repositories) = in_memory_repositories();
    let (process, steps) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    let scheduled = context.schedule_process_steps([Creation]);
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    assert_eq!(scheduled.len(), 1);
    assert_eq!(store.commit_count(), 2);

    let retrigger = steps_of_type(&repositories, process.id, RetriggerCreation).await;
    assert_eq!(retrigger.len(), 1);
    assert_eq!(retrigger[0].id, steps[0].id);
    assert_eq!(retrigger[0].process_step_status_id, Done);
    assert!(retrigger[0].date_last_changed >= steps[0].date_created);

    let next = steps_of_type(&repositories, process.id, Creation).await;
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].process_step_status_id, Todo);
    assert_eq!(next[0].id, scheduled[0].id);

    let committed = store.find_process(process.id).await.unwrap().unwrap().process;
    assert_ne!(committed.version, process.version);
    assert!(committed.lock_expiry_date.is_none());
}

#[tokio::test]
async fn test_missing_process_is_not_found() {
    let (_store, repositories) = in_memory_repositories();
    let err = VerifyProcessData::default()
        .create_manual_process_data(Some(RetriggerCreation), &repositories, || {
            "processId 42".to_string()
        })
        .err()
        .unwrap();

    assert_eq!(err, PortalError::NotFound("processId 42 does not exist".to_string()));
}

#[tokio::test]
async fn test_entity_name_is_only_built_for_errors() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let calls = Cell::new(0);
    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    data.create_manual_process_data(Some(RetriggerCreation), &repositories, || {
        calls.set(calls.get() + 1);
        "unused".to_string()
    })
    .unwrap();
    assert_eq!(calls.get(), 0);

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let err = data
        .create_manual_process_data(Some(RetriggerAwaitResponse), &repositories, || {
            calls.set(calls.get() + 1);
            format!("processId {}", process.id)
        })
        .err()
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(
        err,
        PortalError::Conflict(format!(
            "processId {}, process step RETRIGGER_AWAIT_SELF_DESCRIPTION_CONNECTOR_RESPONSE is not eligible to run",
            process.id
        ))
    );
}

#[tokio::test]
async fn test_locked_process_is_conflict() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let expiry = Utc::now() + Duration::minutes(10);
    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(None, &repositories, entity(&process))
        .unwrap();
    context.request_lock(expiry).unwrap();
    assert!(context.request_lock(expiry).is_err());
    drop(context);
    repositories.save_changes().await.unwrap();

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let err = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .err()
        .unwrap();
    match err {
        PortalError::Conflict(message) => {
            assert!(message.starts_with(&format!(
                "process {} associated with processId {} is locked, lock expiry is set to ",
                process.id, process.id
            )));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_lock_does_not_block() {
    let (store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(None, &repositories, entity(&process))
        .unwrap();
    context.request_lock(Utc::now() - Duration::seconds(1)).unwrap();
    drop(context);
    repositories.save_changes().await.unwrap();

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    let committed = store.find_process(process.id).await.unwrap().unwrap().process;
    assert!(committed.lock_expiry_date.is_none());
}

#[tokio::test]
async fn test_non_pending_step_is_unexpected() {
    let (_store, repositories) = in_memory_repositories();
    let (process, steps) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Done)],
    )
    .await;

    let data = VerifyProcessData::new(Some(process.clone()), steps, Vec::new());
    let err = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .err()
        .unwrap();
    assert!(matches!(err, PortalError::UnexpectedCondition(_)));
}

#[tokio::test]
async fn test_schedule_skips_pending_and_repeated_types() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerAwaitResponse, Todo), (AwaitResponse, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerAwaitResponse]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerAwaitResponse), &repositories, entity(&process))
        .unwrap();

    let first = context.schedule_process_steps([Creation, AwaitResponse, Creation]);
    let second = context.schedule_process_steps([Creation]);
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    assert_eq!(
        first.iter().map(|s| s.process_step_type_id).collect::<Vec<_>>(),
        vec![Creation]
    );
    assert!(second.is_empty());
    assert_eq!(steps_of_type(&repositories, process.id, Creation).await.len(), 1);
    assert_eq!(steps_of_type(&repositories, process.id, AwaitResponse).await.len(), 1);
}

#[tokio::test]
async fn test_schedule_after_skip_creates_new_step() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo), (AwaitResponse, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation, AwaitResponse]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    context.skip_process_steps([AwaitResponse]).unwrap();
    assert_eq!(context.schedule_process_steps([AwaitResponse]).len(), 1);
    assert!(context.schedule_process_steps([AwaitResponse]).is_empty());
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    let await_response = steps_of_type(&repositories, process.id, AwaitResponse).await;
    assert_eq!(
        await_response.iter().map(|s| s.process_step_status_id).collect::<Vec<_>>(),
        vec![Skipped, Todo]
    );
}

#[tokio::test]
async fn test_schedule_sees_steps_staged_in_same_unit_of_work() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    repositories
        .process_steps()
        .create_process_step(Creation, Todo, process.id);
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();

    assert!(context.schedule_process_steps([Creation]).is_empty());
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    assert_eq!(steps_of_type(&repositories, process.id, Creation).await.len(), 1);
}

#[tokio::test]
async fn test_schedule_after_completion_creates_new_attempt() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(Creation, Done), (RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    assert_eq!(context.schedule_process_steps([Creation]).len(), 1);
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    let attempts = steps_of_type(&repositories, process.id, Creation).await;
    assert_eq!(
        attempts.iter().map(|s| s.process_step_status_id).collect::<Vec<_>>(),
        vec![Done, Todo]
    );
}

#[tokio::test]
async fn test_finalize_marks_extra_steps_duplicate() {
    let (_store, repositories) = in_memory_repositories();
    let (process, steps) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo), (RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    data.create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap()
        .finalize_process_step()
        .unwrap();
    repositories.save_changes().await.unwrap();

    let committed = steps_of_type(&repositories, process.id, RetriggerCreation).await;
    assert_eq!(committed[0].id, steps[0].id);
    assert_eq!(committed[0].process_step_status_id, Done);
    assert_eq!(committed[1].process_step_status_id, Duplicate);
}

#[tokio::test]
async fn test_skip_process_steps_never_skips_finalized_step() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[
            (RetriggerCreation, Todo),
            (RetriggerAwaitResponse, Todo),
            (RetriggerAwaitResponse, Todo),
        ],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation, RetriggerAwaitResponse]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    context
        .skip_process_steps([RetriggerCreation, RetriggerAwaitResponse])
        .unwrap();
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    let retrigger = steps_of_type(&repositories, process.id, RetriggerCreation).await;
    assert_eq!(retrigger[0].process_step_status_id, Done);
    let await_response = steps_of_type(&repositories, process.id, RetriggerAwaitResponse).await;
    assert_eq!(
        await_response.iter().map(|s| s.process_step_status_id).collect::<Vec<_>>(),
        vec![Skipped, Duplicate]
    );
}

#[tokio::test]
async fn test_skip_process_steps_except() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo), (RetriggerAwaitResponse, Todo), (AwaitResponse, Todo)],
    )
    .await;

    let data = validate(
        &repositories,
        &process,
        &[RetriggerCreation, RetriggerAwaitResponse, AwaitResponse],
    )
    .await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    context.skip_process_steps_except([AwaitResponse]).unwrap();
    context.finalize_process_step().unwrap();
    repositories.save_changes().await.unwrap();

    assert_eq!(
        steps_of_type(&repositories, process.id, RetriggerAwaitResponse).await[0].process_step_status_id,
        Skipped
    );
    assert_eq!(
        steps_of_type(&repositories, process.id, AwaitResponse).await[0].process_step_status_id,
        Todo
    );
}

#[tokio::test]
async fn test_finalize_releases_lock() {
    let (store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    context.request_default_lock().unwrap();
    assert!(context.process().is_locked());
    context.finalize_process_step().unwrap();
    assert_eq!(repositories.pending_changes().process_updates.len(), 2);
    repositories.save_changes().await.unwrap();

    let committed = store.find_process(process.id).await.unwrap().unwrap().process;
    assert!(committed.lock_expiry_date.is_none());
}

#[tokio::test]
async fn test_oversized_default_lock_is_configuration_error() {
    let (store, seeding) = in_memory_repositories();
    let (process, _) = seed_process(
        &seeding,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;
    let repositories = PortalRepositories::with_config(
        store,
        ProcessConfig {
            default_lock_seconds: 10_000_000_000_000,
            ..ProcessConfig::default()
        },
    );

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let mut context = data
        .create_manual_process_data(Some(RetriggerCreation), &repositories, entity(&process))
        .unwrap();
    let err = context.request_default_lock().unwrap_err();

    assert!(matches!(err, PortalError::ConfigurationError(_)));
    assert!(!context.process().is_locked());
    assert!(!repositories.has_changes());
}

#[tokio::test]
async fn test_finalize_without_step_type_is_unexpected() {
    let (_store, repositories) = in_memory_repositories();
    let (process, _) = seed_process(
        &repositories,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let data = validate(&repositories, &process, &[RetriggerCreation]).await;
    let err = data
        .create_manual_process_data(None, &repositories, entity(&process))
        .unwrap()
        .finalize_process_step()
        .unwrap_err();
    assert!(matches!(err, PortalError::UnexpectedCondition(_)));
    assert!(!repositories.has_changes());
}

#[tokio::test]
async fn test_concurrent_finalization_fails_second_save() {
    let (store, first) = in_memory_repositories();
    let second = PortalRepositories::new(store.clone());
    let (process, _) = seed_process(
        &first,
        ProcessTypeId::SelfDescriptionCreation,
        &[(RetriggerCreation, Todo)],
    )
    .await;

    let first_data = validate(&first, &process, &[RetriggerCreation]).await;
    let second_data = validate(&second, &process, &[RetriggerCreation]).await;

    for (data, repositories) in [(first_data, &first), (second_data, &second)] {
        let mut context = data
            .create_manual_process_data(Some(RetriggerCreation), repositories, entity(&process))
            .unwrap();
        context.schedule_process_steps([Creation]);
        context.finalize_process_step().unwrap();
    }

    first.save_changes().await.unwrap();
    let err = second.save_changes().await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(steps_of_type(&first, process.id, Creation).await.len(), 1);
}
