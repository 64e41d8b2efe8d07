//! # Postgres Process Store
//!
//! [`ProcessStore`] backed by PostgreSQL through SQLx. Each `apply` runs in a
//! single transaction; creations are written with multi-row inserts so a
//! batch costs one round trip per table chunk rather than one per row.
//!
//! Optimistic updates carry their expectation in the `WHERE` clause. An
//! update that touches no row aborts the transaction with a concurrency
//! conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::store::{ChangeSet, ProcessSnapshot, ProcessStore};
use crate::constants::{ProcessStepStatusId, ProcessStepTypeId, ProcessTypeId};
use crate::error::{PortalError, Result};
use crate::models::{
    AssignedEntity, Process, ProcessAssignment, ProcessStep, ProcessStepUpdate, ProcessUpdate,
};

// Keeps multi-row inserts well below the 65535 bind parameter limit.
const INSERT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct PgProcessStore {
    pool: PgPool,
}

impl PgProcessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Committed steps of `process_id` in creation order
    pub async fn list_steps(&self, process_id: Uuid) -> Result<Vec<ProcessStep>> {
        let rows = sqlx::query(
            r#"
            SELECT id, process_step_type_id, process_step_status_id, process_id,
                   date_created, date_last_changed
            FROM process_steps
            WHERE process_id = $1
            ORDER BY creation_order
            "#,
        )
        .bind(process_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| step_from_row(row, "id")).collect()
    }
}

fn process_from_row(row: &PgRow) -> Result<Process> {
    let type_id: i32 = row.try_get("process_type_id")?;
    let process_type_id = ProcessTypeId::from_id(type_id).ok_or_else(|| {
        PortalError::DatabaseError(format!("unknown process_type_id {type_id}"))
    })?;

    Ok(Process {
        id: row.try_get("id")?,
        process_type_id,
        version: row.try_get("version")?,
        lock_expiry_date: row.try_get::<Option<DateTime<Utc>>, _>("lock_expiry_date")?,
    })
}

fn step_from_row(row: &PgRow, id_column: &str) -> Result<ProcessStep> {
    let type_id: i32 = row.try_get("process_step_type_id")?;
    let status_id: i32 = row.try_get("process_step_status_id")?;

    Ok(ProcessStep {
        id: row.try_get(id_column)?,
        process_step_type_id: ProcessStepTypeId::from_id(type_id).ok_or_else(|| {
            PortalError::DatabaseError(format!("unknown process_step_type_id {type_id}"))
        })?,
        process_step_status_id: ProcessStepStatusId::from_id(status_id).ok_or_else(|| {
            PortalError::DatabaseError(format!("unknown process_step_status_id {status_id}"))
        })?,
        process_id: row.try_get("process_id")?,
        date_created: row.try_get("date_created")?,
        date_last_changed: row.try_get("date_last_changed")?,
    })
}

async fn insert_processes(tx: &mut Transaction<'_, Postgres>, processes: &[Process]) -> Result<()> {
    for chunk in processes.chunks(INSERT_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO processes (id, process_type_id, version, lock_expiry_date) ",
        );
        builder.push_values(chunk, |mut row, process| {
            row.push_bind(process.id)
                .push_bind(process.process_type_id.id())
                .push_bind(process.version)
                .push_bind(process.lock_expiry_date);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_steps(tx: &mut Transaction<'_, Postgres>, steps: &[ProcessStep]) -> Result<()> {
    for chunk in steps.chunks(INSERT_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO process_steps (id, process_step_type_id, process_step_status_id, \
             process_id, date_created, date_last_changed) ",
        );
        builder.push_values(chunk, |mut row, step| {
            row.push_bind(step.id)
                .push_bind(step.process_step_type_id.id())
                .push_bind(step.process_step_status_id.id())
                .push_bind(step.process_id)
                .push_bind(step.date_created)
                .push_bind(step.date_last_changed);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn update_step(tx: &mut Transaction<'_, Postgres>, update: &ProcessStepUpdate) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE process_steps
        SET process_step_status_id = $1, date_last_changed = $2
        WHERE id = $3 AND process_step_status_id = $4
        "#,
    )
    .bind(update.status.id())
    .bind(update.date_last_changed)
    .bind(update.step_id)
    .bind(update.expected_status.id())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PortalError::ConcurrencyConflict {
            entity: "process step",
            id: update.step_id,
        });
    }
    Ok(())
}

async fn update_process(tx: &mut Transaction<'_, Postgres>, update: &ProcessUpdate) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE processes
        SET version = $1, lock_expiry_date = $2
        WHERE id = $3 AND version = $4
        "#,
    )
    .bind(update.version)
    .bind(update.lock_expiry_date)
    .bind(update.process_id)
    .bind(update.expected_version)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PortalError::ConcurrencyConflict {
            entity: "process",
            id: update.process_id,
        });
    }
    Ok(())
}

async fn upsert_assignment(
    tx: &mut Transaction<'_, Postgres>,
    assignment: &ProcessAssignment,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO process_assignments (entity_kind, entity_id, process_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (entity_kind, entity_id) DO UPDATE SET process_id = EXCLUDED.process_id
        "#,
    )
    .bind(assignment.entity.kind())
    .bind(assignment.entity.entity_id())
    .bind(assignment.process_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ProcessStore for PgProcessStore {
    async fn find_process(&self, process_id: Uuid) -> Result<Option<ProcessSnapshot>> {
        // one statement, so the process row and its steps share a snapshot
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.process_type_id, p.version, p.lock_expiry_date,
                   s.id AS step_id, s.process_step_type_id, s.process_step_status_id,
                   s.process_id, s.date_created, s.date_last_changed
            FROM processes p
            LEFT JOIN process_steps s ON s.process_id = p.id
            WHERE p.id = $1
            ORDER BY s.creation_order
            "#,
        )
        .bind(process_id)
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let process = process_from_row(first)?;

        let mut steps = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.try_get::<Option<Uuid>, _>("step_id")?.is_some() {
                steps.push(step_from_row(row, "step_id")?);
            }
        }

        Ok(Some(ProcessSnapshot { process, steps }))
    }

    async fn process_type(&self, process_id: Uuid) -> Result<Option<ProcessTypeId>> {
        let type_id: Option<i32> =
            sqlx::query_scalar("SELECT process_type_id FROM processes WHERE id = $1")
                .bind(process_id)
                .fetch_optional(&self.pool)
                .await?;

        type_id
            .map(|id| {
                ProcessTypeId::from_id(id).ok_or_else(|| {
                    PortalError::DatabaseError(format!("unknown process_type_id {id}"))
                })
            })
            .transpose()
    }

    async fn assigned_process(&self, entity: AssignedEntity) -> Result<Option<Uuid>> {
        let process_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT process_id FROM process_assignments WHERE entity_kind = $1 AND entity_id = $2",
        )
        .bind(entity.kind())
        .bind(entity.entity_id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(process_id)
    }

    #[instrument(skip(self, changes), fields(change_count = changes.len()))]
    async fn apply(&self, changes: ChangeSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        insert_processes(&mut tx, &changes.processes).await?;
        insert_steps(&mut tx, &changes.process_steps).await?;
        for update in &changes.step_updates {
            update_step(&mut tx, update).await?;
        }
        for update in &changes.process_updates {
            update_process(&mut tx, update).await?;
        }
        for assignment in &changes.assignments {
            upsert_assignment(&mut tx, assignment).await?;
        }

        tx.commit().await?;
        debug!("postgres process store committed change set");
        Ok(())
    }
}
