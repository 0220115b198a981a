use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::store::models::{StatusTransitionActor, Task, TaskStatus, TaskType};

use super::error::AppError;

// A fixed development-mode user id until an authentication layer assigns
// one per request. Every handler in this module goes through here rather
// than hardcoding Uuid::nil() in several places.
fn current_user_id() -> Uuid {
    Uuid::nil()
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskResponse {
    #[serde(flatten)]
    task: Task,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self { task }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WaitParams {
    #[serde(default)]
    wait: bool,
}

/// Polls `GET task` on the same async path until it reaches a terminal
/// status or `budget` elapses — the `?wait=true` contract in spec §6, never
/// a second code path from the async one.
async fn wait_for_terminal(state: &AppState, task_id: Uuid, budget: Duration) -> Task {
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        if let Ok(task) = state.gateway().get_task(task_id).await {
            if task.status.is_terminal() {
                return task;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return state
                .gateway()
                .get_task(task_id)
                .await
                .expect("task exists, it was just created");
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeekScraperRequest {
    job_titles: Vec<String>,
    location: String,
    desired_result_count: usize,
    #[serde(default)]
    source_platform: Option<String>,
    #[serde(default)]
    task_description: Option<String>,
}

pub(crate) async fn create_seek_scraper(
    State(state): State<AppState>,
    Query(wait): Query<WaitParams>,
    Json(body): Json<SeekScraperRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let instructions = serde_json::json!({
        "job_titles": body.job_titles,
        "location": body.location,
        "desired_result_count": body.desired_result_count,
        "source_platform": body.source_platform.unwrap_or_else(|| "seek".to_string()),
    });

    let task = state
        .engine()
        .submit_task(
            current_user_id(),
            TaskType::SeekScraper,
            body.task_description,
            instructions,
        )
        .await?;

    respond_with_optional_wait(&state, task, wait.wait, state.config().seek_scraper_budget()).await
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResumeJobMatchingRequest {
    resume_text: String,
    found_job_ids: Vec<Uuid>,
    llm_provider: String,
    #[serde(default)]
    task_description: Option<String>,
}

pub(crate) async fn create_resume_job_matching(
    State(state): State<AppState>,
    Query(wait): Query<WaitParams>,
    Json(body): Json<ResumeJobMatchingRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let instructions = serde_json::json!({
        "resume_text": body.resume_text,
        "found_job_ids": body.found_job_ids,
        "llm_provider": body.llm_provider,
    });

    let task = state
        .engine()
        .submit_task(
            current_user_id(),
            TaskType::ResumeJobMatching,
            body.task_description,
            instructions,
        )
        .await?;

    respond_with_optional_wait(
        &state,
        task,
        wait.wait,
        state.config().resume_job_matching_budget(),
    )
    .await
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobAgentRequest {
    job_titles: Vec<String>,
    location: String,
    desired_result_count: usize,
    #[serde(default)]
    source_platform: Option<String>,
    resume_text: String,
    llm_provider: String,
    #[serde(default)]
    task_description: Option<String>,
}

pub(crate) async fn create_job_agent(
    State(state): State<AppState>,
    Query(wait): Query<WaitParams>,
    Json(body): Json<JobAgentRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let instructions = serde_json::json!({
        "job_titles": body.job_titles,
        "location": body.location,
        "desired_result_count": body.desired_result_count,
        "source_platform": body.source_platform.unwrap_or_else(|| "seek".to_string()),
        "resume_text": body.resume_text,
        "llm_provider": body.llm_provider,
    });

    let task = state
        .engine()
        .submit_task(
            current_user_id(),
            TaskType::JobAgent,
            body.task_description,
            instructions,
        )
        .await?;

    respond_with_optional_wait(&state, task, wait.wait, state.config().job_agent_budget()).await
}

async fn respond_with_optional_wait(
    state: &AppState,
    task: Task,
    wait: bool,
    budget: Duration,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    if wait {
        let task = wait_for_terminal(state, task.id, budget).await;
        return Ok((StatusCode::OK, Json(task.into())));
    }
    Ok((StatusCode::ACCEPTED, Json(task.into())))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListTasksParams {
    #[serde(default)]
    status: Option<String>,
}

pub(crate) async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let mut tasks = state.gateway().list_tasks(current_user_id()).await?;

    if let Some(status) = params.status {
        let status: TaskStatus = status
            .parse()
            .map_err(|()| AppError::Validation(format!("unrecognized status: {status}")))?;
        tasks.retain(|task| task.status == status);
    }

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

pub(crate) async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = state.gateway().get_task(task_id).await?;
    Ok(Json(task.into()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateTaskRequest {
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    other_message: Option<String>,
    #[serde(default)]
    execution_result: Option<Value>,
}

pub(crate) async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let mut task = state.gateway().get_task(task_id).await?;

    if let Some(execution_result) = body.execution_result {
        task = state
            .gateway()
            .set_execution_result(task_id, execution_result)
            .await?;
    }

    if let Some(status) = body.status {
        task = if status == TaskStatus::Cancelled {
            state.engine().cancel_task(task_id).await?
        } else {
            state
                .gateway()
                .update_task_status(
                    task_id,
                    status,
                    body.other_message,
                    StatusTransitionActor::User,
                    None,
                )
                .await?
        };
    }

    Ok(Json(task.into()))
}
