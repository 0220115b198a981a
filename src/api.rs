pub(crate) mod error;
pub(crate) mod found_jobs;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod tasks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/tasks/seek-scraper", post(tasks::create_seek_scraper))
        .route(
            "/tasks/resume-job-matching",
            post(tasks::create_resume_job_matching),
        )
        .route("/tasks/job-agent", post(tasks::create_job_agent))
        .route("/tasks", get(tasks::list_tasks))
        .route(
            "/tasks/{task_id}",
            get(tasks::get_task).put(tasks::update_task),
        )
        .route("/tasks/found-jobs", get(found_jobs::list_found_jobs))
        .route(
            "/tasks/found-jobs/{found_job_id}",
            get(found_jobs::get_found_job).put(found_jobs::update_found_job),
        )
        .with_state(state)
}
