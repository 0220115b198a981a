use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::store::models::FoundJob;

use super::error::AppError;

#[derive(Debug, Deserialize)]
pub(crate) struct ListFoundJobsParams {
    task_id: Uuid,
    #[serde(default)]
    saved_only: bool,
}

pub(crate) async fn list_found_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListFoundJobsParams>,
) -> Result<Json<Vec<FoundJob>>, AppError> {
    let mut jobs = state.gateway().list_found_jobs(params.task_id).await?;
    if params.saved_only {
        jobs.retain(|job| job.saved);
    }
    Ok(Json(jobs))
}

pub(crate) async fn get_found_job(
    State(state): State<AppState>,
    Path(found_job_id): Path<Uuid>,
) -> Result<Json<FoundJob>, AppError> {
    let job = state.gateway().get_found_job(found_job_id).await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateFoundJobRequest {
    #[serde(default)]
    saved: Option<bool>,
    #[serde(default)]
    application_status: Option<String>,
}

pub(crate) async fn update_found_job(
    State(state): State<AppState>,
    Path(found_job_id): Path<Uuid>,
    Json(body): Json<UpdateFoundJobRequest>,
) -> Result<Json<FoundJob>, AppError> {
    let mut job = state.gateway().get_found_job(found_job_id).await?;

    if let Some(saved) = body.saved {
        job = state.gateway().set_found_job_saved(found_job_id, saved).await?;
    }

    if let Some(application_status) = body.application_status {
        job = state
            .gateway()
            .update_found_job_application_status(found_job_id, application_status)
            .await?;
    }

    Ok(Json(job))
}
