use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::models::{FoundJob, ScrapedPosting, StatusTransitionActor, Task, TaskStatus, TaskType};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    #[error("found_job {0} not found")]
    FoundJobNotFound(Uuid),
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: Option<TaskStatus>,
        to: TaskStatus,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The Store Gateway contract (spec §4.A): the only way the engine and
/// pipelines touch persisted `Task`/`FoundJob` rows. A trait rather than a
/// concrete type so unit tests can run against [`super::mock::MockStoreGateway`]
/// without a live Postgres instance.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn create_task(
        &self,
        user_id: Uuid,
        task_type: TaskType,
        task_description: Option<String>,
        task_instructions: Value,
    ) -> Result<Task, GatewayError>;

    async fn get_task(&self, task_id: Uuid) -> Result<Task, GatewayError>;

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, GatewayError>;

    /// Transitions `task_id` from whatever status it is currently in to
    /// `to`, provided `crate::engine::transition::validate` allows it. The
    /// implementation enforces this with a conditional `UPDATE`, not just
    /// the caller's own pre-check, so two racing writers can't both
    /// "succeed" in moving a task through an invalid edge.
    async fn update_task_status(
        &self,
        task_id: Uuid,
        to: TaskStatus,
        other_message: Option<String>,
        actor: StatusTransitionActor,
        reason: Option<String>,
    ) -> Result<Task, GatewayError>;

    async fn set_execution_result(
        &self,
        task_id: Uuid,
        execution_result: Value,
    ) -> Result<Task, GatewayError>;

    /// Inserts postings discovered by a scraper run against `task_id`,
    /// silently dropping any whose normalized `job_url` already exists for
    /// that task (spec §3 FoundJob.4). Returns the rows actually inserted.
    async fn insert_found_jobs(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        postings: Vec<ScrapedPosting>,
    ) -> Result<Vec<FoundJob>, GatewayError>;

    async fn list_found_jobs(&self, task_id: Uuid) -> Result<Vec<FoundJob>, GatewayError>;

    async fn get_found_job(&self, found_job_id: Uuid) -> Result<FoundJob, GatewayError>;

    async fn set_found_job_score(
        &self,
        found_job_id: Uuid,
        match_score: i32,
        ai_analysis: Value,
    ) -> Result<FoundJob, GatewayError>;

    async fn update_found_job_application_status(
        &self,
        found_job_id: Uuid,
        application_status: String,
    ) -> Result<FoundJob, GatewayError>;

    async fn set_found_job_saved(
        &self,
        found_job_id: Uuid,
        saved: bool,
    ) -> Result<FoundJob, GatewayError>;

    async fn health_check(&self) -> Result<(), GatewayError>;
}
