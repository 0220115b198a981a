use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::engine::transition;
use crate::util::idempotency::try_acquire_task_lock;

use super::gateway::{GatewayError, StoreGateway};
use super::models::{
    FoundJob, ScrapedPosting, StatusTransitionActor, Task, TaskStatus, TaskType, clamp_match_score,
    normalize_job_url,
};

/// Postgres-backed [`StoreGateway`]. Owns `agent_tasks`, `agent_found_jobs`,
/// and the append-only `agent_task_status_history` audit table.
pub struct PgStoreGateway {
    pool: PgPool,
}

impl PgStoreGateway {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    let task_type_raw: String = row.try_get("task_type")?;
    let status_raw: String = row.try_get("status")?;

    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        task_type: TaskType::from_str(&task_type_raw).map_err(|()| {
            sqlx::Error::ColumnDecode {
                index: "task_type".to_string(),
                source: format!("unrecognized task_type: {task_type_raw}").into(),
            }
        })?,
        task_description: row.try_get("task_description")?,
        status: TaskStatus::from_str(&status_raw).map_err(|()| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unrecognized status: {status_raw}").into(),
        })?,
        task_instructions: row.try_get("task_instructions")?,
        execution_result: row.try_get("execution_result")?,
        other_message: row.try_get("other_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        is_recurring: row.try_get("is_recurring")?,
        recurrence_config: row.try_get("recurrence_config")?,
        next_execution_at: row.try_get("next_execution_at")?,
        last_execution_at: row.try_get("last_execution_at")?,
        execution_count: row.try_get("execution_count")?,
        max_executions: row.try_get("max_executions")?,
        is_active: row.try_get("is_active")?,
    })
}

fn found_job_from_row(row: &PgRow) -> Result<FoundJob, sqlx::Error> {
    Ok(FoundJob {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        agent_task_id: row.try_get("agent_task_id")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        location: row.try_get("location")?,
        salary: row.try_get("salary")?,
        job_url: row.try_get("job_url")?,
        work_type: row.try_get("work_type")?,
        detailed_description: row.try_get("detailed_description")?,
        source_platform: row.try_get("source_platform")?,
        application_status: row.try_get("application_status")?,
        match_score: row.try_get("match_score")?,
        ai_analysis: row.try_get("ai_analysis")?,
        saved: row.try_get("saved")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl StoreGateway for PgStoreGateway {
    async fn create_task(
        &self,
        user_id: Uuid,
        task_type: TaskType,
        task_description: Option<String>,
        task_instructions: Value,
    ) -> Result<Task, GatewayError> {
        let row = sqlx::query(
            r"
            INSERT INTO agent_tasks (
                id, user_id, task_type, task_description, status, task_instructions,
                is_recurring, execution_count, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 'pending', $5, false, 0, true, now(), now())
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(task_type.as_str())
        .bind(task_description)
        .bind(task_instructions)
        .fetch_one(&self.pool)
        .await?;

        task_from_row(&row).map_err(GatewayError::from)
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task, GatewayError> {
        let row = sqlx::query("SELECT * FROM agent_tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::TaskNotFound(task_id))?;
        task_from_row(&row).map_err(GatewayError::from)
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, GatewayError> {
        let rows = sqlx::query("SELECT * FROM agent_tasks WHERE user_id = $1 ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| task_from_row(row).map_err(GatewayError::from))
            .collect()
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        to: TaskStatus,
        other_message: Option<String>,
        actor: StatusTransitionActor,
        reason: Option<String>,
    ) -> Result<Task, GatewayError> {
        let mut tx = self.pool.begin().await?;

        try_acquire_task_lock(&mut tx, task_id)
            .await
            .map_err(|error| GatewayError::Database(sqlx::Error::Protocol(error.to_string())))?;

        let current_row = sqlx::query("SELECT status FROM agent_tasks WHERE id = $1 FOR UPDATE")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(GatewayError::TaskNotFound(task_id))?;
        let current_raw: String = current_row.try_get("status")?;
        let current = TaskStatus::from_str(&current_raw).ok();

        if !transition::validate(current, to) {
            return Err(GatewayError::InvalidTransition { from: current, to });
        }

        let row = sqlx::query(
            r"
            UPDATE agent_tasks
            SET status = $1,
                other_message = COALESCE($2, other_message),
                updated_at = now(),
                started_at = CASE WHEN $1 = 'running' AND started_at IS NULL THEN now() ELSE started_at END,
                completed_at = CASE WHEN $1 IN ('completed', 'failed', 'cancelled') THEN now() ELSE completed_at END
            WHERE id = $3 AND status = $4
            RETURNING *
            ",
        )
        .bind(to.as_str())
        .bind(other_message)
        .bind(task_id)
        .bind(current_raw)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GatewayError::InvalidTransition { from: current, to })?;

        sqlx::query(
            r"
            INSERT INTO agent_task_status_history (task_id, from_status, to_status, reason, actor, at)
            VALUES ($1, $2, $3, $4, $5, now())
            ",
        )
        .bind(task_id)
        .bind(current.map(TaskStatus::as_str))
        .bind(to.as_str())
        .bind(reason)
        .bind(actor.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        task_from_row(&row).map_err(GatewayError::from)
    }

    async fn set_execution_result(
        &self,
        task_id: Uuid,
        execution_result: Value,
    ) -> Result<Task, GatewayError> {
        let row = sqlx::query(
            r"
            UPDATE agent_tasks
            SET execution_result = $1, updated_at = now()
            WHERE id = $2
            RETURNING *
            ",
        )
        .bind(execution_result)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::TaskNotFound(task_id))?;

        task_from_row(&row).map_err(GatewayError::from)
    }

    async fn insert_found_jobs(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        postings: Vec<ScrapedPosting>,
    ) -> Result<Vec<FoundJob>, GatewayError> {
        let mut inserted = Vec::with_capacity(postings.len());
        let mut tx = self.pool.begin().await?;

        for posting in postings {
            let normalized = posting.job_url.as_deref().map(normalize_job_url);

            let row = sqlx::query(
                r"
                INSERT INTO agent_found_jobs (
                    id, user_id, agent_task_id, title, company, location, salary, job_url,
                    work_type, detailed_description, source_platform, application_status,
                    saved, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'not_applied', false, now(), now())
                ON CONFLICT (agent_task_id, job_url) WHERE job_url IS NOT NULL DO NOTHING
                RETURNING *
                ",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(task_id)
            .bind(&posting.title)
            .bind(&posting.company)
            .bind(&posting.location)
            .bind(&posting.salary)
            .bind(normalized)
            .bind(&posting.work_type)
            .bind(&posting.detailed_description)
            .bind(&posting.source_platform)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = row {
                inserted.push(found_job_from_row(&row)?);
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_found_jobs(&self, task_id: Uuid) -> Result<Vec<FoundJob>, GatewayError> {
        let rows = sqlx::query(
            "SELECT * FROM agent_found_jobs WHERE agent_task_id = $1 ORDER BY created_at",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| found_job_from_row(row).map_err(GatewayError::from))
            .collect()
    }

    async fn get_found_job(&self, found_job_id: Uuid) -> Result<FoundJob, GatewayError> {
        let row = sqlx::query("SELECT * FROM agent_found_jobs WHERE id = $1")
            .bind(found_job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job_from_row(&row).map_err(GatewayError::from)
    }

    async fn set_found_job_score(
        &self,
        found_job_id: Uuid,
        match_score: i32,
        ai_analysis: Value,
    ) -> Result<FoundJob, GatewayError> {
        let row = sqlx::query(
            r"
            UPDATE agent_found_jobs
            SET match_score = $1, ai_analysis = $2, updated_at = now()
            WHERE id = $3
            RETURNING *
            ",
        )
        .bind(clamp_match_score(match_score))
        .bind(ai_analysis)
        .bind(found_job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job_from_row(&row).map_err(GatewayError::from)
    }

    async fn update_found_job_application_status(
        &self,
        found_job_id: Uuid,
        application_status: String,
    ) -> Result<FoundJob, GatewayError> {
        let row = sqlx::query(
            r"
            UPDATE agent_found_jobs
            SET application_status = $1, updated_at = now()
            WHERE id = $2
            RETURNING *
            ",
        )
        .bind(application_status)
        .bind(found_job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job_from_row(&row).map_err(GatewayError::from)
    }

    async fn set_found_job_saved(
        &self,
        found_job_id: Uuid,
        saved: bool,
    ) -> Result<FoundJob, GatewayError> {
        let row = sqlx::query(
            r"
            UPDATE agent_found_jobs
            SET saved = $1, updated_at = now()
            WHERE id = $2
            RETURNING *
            ",
        )
        .bind(saved)
        .bind(found_job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job_from_row(&row).map_err(GatewayError::from)
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
