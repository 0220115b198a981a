use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::engine::transition;

use super::gateway::{GatewayError, StoreGateway};
use super::models::{
    FoundJob, ScrapedPosting, StatusTransitionActor, Task, TaskStatus, TaskType, clamp_match_score,
    normalize_job_url,
};

/// In-memory [`StoreGateway`] for engine/pipeline unit tests that don't need
/// a live Postgres instance. Enforces the same transition rules and dedup
/// invariant as [`super::postgres::PgStoreGateway`], just without SQL.
#[derive(Default)]
pub struct MockStoreGateway {
    tasks: Mutex<HashMap<Uuid, Task>>,
    found_jobs: Mutex<HashMap<Uuid, FoundJob>>,
}

impl MockStoreGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreGateway for MockStoreGateway {
    async fn create_task(
        &self,
        user_id: Uuid,
        task_type: TaskType,
        task_description: Option<String>,
        task_instructions: Value,
    ) -> Result<Task, GatewayError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            task_type,
            task_description,
            status: TaskStatus::Pending,
            task_instructions,
            execution_result: None,
            other_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            is_recurring: false,
            recurrence_config: None,
            next_execution_at: None,
            last_execution_at: None,
            execution_count: 0,
            max_executions: None,
            is_active: true,
        };
        self.tasks.lock().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task, GatewayError> {
        self.tasks
            .lock()
            .await
            .get(&task_id)
            .cloned()
            .ok_or(GatewayError::TaskNotFound(task_id))
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, GatewayError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        to: TaskStatus,
        other_message: Option<String>,
        _actor: StatusTransitionActor,
        _reason: Option<String>,
    ) -> Result<Task, GatewayError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(GatewayError::TaskNotFound(task_id))?;

        if !transition::validate(Some(task.status), to) {
            return Err(GatewayError::InvalidTransition {
                from: Some(task.status),
                to,
            });
        }

        let now = Utc::now();
        task.status = to;
        task.updated_at = now;
        if other_message.is_some() {
            task.other_message = other_message;
        }
        if to == TaskStatus::Running && task.started_at.is_none() {
            task.started_at = Some(now);
        }
        if to.is_terminal() {
            task.completed_at = Some(now);
        }
        Ok(task.clone())
    }

    async fn set_execution_result(
        &self,
        task_id: Uuid,
        execution_result: Value,
    ) -> Result<Task, GatewayError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(GatewayError::TaskNotFound(task_id))?;
        task.execution_result = Some(execution_result);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn insert_found_jobs(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        postings: Vec<ScrapedPosting>,
    ) -> Result<Vec<FoundJob>, GatewayError> {
        let mut found_jobs = self.found_jobs.lock().await;
        let existing_urls: std::collections::HashSet<String> = found_jobs
            .values()
            .filter(|f| f.agent_task_id == Some(task_id))
            .filter_map(|f| f.job_url.as_deref().map(normalize_job_url))
            .collect();

        let mut inserted = Vec::new();
        let mut seen_this_batch = existing_urls;
        for posting in postings {
            if let Some(key) = posting.dedup_key() {
                if seen_this_batch.contains(&key) {
                    continue;
                }
                seen_this_batch.insert(key);
            }

            let now = Utc::now();
            let found_job = FoundJob {
                id: Uuid::new_v4(),
                user_id,
                agent_task_id: Some(task_id),
                title: posting.title,
                company: posting.company,
                location: posting.location,
                salary: posting.salary,
                job_url: posting.job_url,
                work_type: posting.work_type,
                detailed_description: posting.detailed_description,
                source_platform: posting.source_platform,
                application_status: "not_applied".to_string(),
                match_score: None,
                ai_analysis: None,
                saved: false,
                created_at: now,
                updated_at: now,
            };
            found_jobs.insert(found_job.id, found_job.clone());
            inserted.push(found_job);
        }
        Ok(inserted)
    }

    async fn list_found_jobs(&self, task_id: Uuid) -> Result<Vec<FoundJob>, GatewayError> {
        let mut jobs: Vec<FoundJob> = self
            .found_jobs
            .lock()
            .await
            .values()
            .filter(|f| f.agent_task_id == Some(task_id))
            .cloned()
            .collect();
        jobs.sort_by_key(|f| f.created_at);
        Ok(jobs)
    }

    async fn get_found_job(&self, found_job_id: Uuid) -> Result<FoundJob, GatewayError> {
        self.found_jobs
            .lock()
            .await
            .get(&found_job_id)
            .cloned()
            .ok_or(GatewayError::FoundJobNotFound(found_job_id))
    }

    async fn set_found_job_score(
        &self,
        found_job_id: Uuid,
        match_score: i32,
        ai_analysis: Value,
    ) -> Result<FoundJob, GatewayError> {
        let mut found_jobs = self.found_jobs.lock().await;
        let found_job = found_jobs
            .get_mut(&found_job_id)
            .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job.match_score = Some(clamp_match_score(match_score));
        found_job.ai_analysis = Some(ai_analysis);
        found_job.updated_at = Utc::now();
        Ok(found_job.clone())
    }

    async fn update_found_job_application_status(
        &self,
        found_job_id: Uuid,
        application_status: String,
    ) -> Result<FoundJob, GatewayError> {
        let mut found_jobs = self.found_jobs.lock().await;
        let found_job = found_jobs
            .get_mut(&found_job_id)
            .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job.application_status = application_status;
        found_job.updated_at = Utc::now();
        Ok(found_job.clone())
    }

    async fn set_found_job_saved(
        &self,
        found_job_id: Uuid,
        saved: bool,
    ) -> Result<FoundJob, GatewayError> {
        let mut found_jobs = self.found_jobs.lock().await;
        let found_job = found_jobs
            .get_mut(&found_job_id)
            .ok_or(GatewayError::FoundJobNotFound(found_job_id))?;
        found_job.saved = saved;
        found_job.updated_at = Utc::now();
        Ok(found_job.clone())
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let gateway = MockStoreGateway::new();
        let user_id = Uuid::new_v4();
        let task = gateway
            .create_task(user_id, TaskType::SeekScraper, None, json!({}))
            .await
            .expect("create succeeds");

        let fetched = gateway.get_task(task.id).await.expect("get succeeds");
        assert_eq!(fetched.id, task.id);
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn update_task_status_rejects_invalid_transition() {
        let gateway = MockStoreGateway::new();
        let user_id = Uuid::new_v4();
        let task = gateway
            .create_task(user_id, TaskType::SeekScraper, None, json!({}))
            .await
            .unwrap();

        let error = gateway
            .update_task_status(
                task.id,
                TaskStatus::Completed,
                None,
                StatusTransitionActor::Engine,
                None,
            )
            .await
            .expect_err("pending -> completed is invalid");

        assert!(matches!(error, GatewayError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn insert_found_jobs_deduplicates_by_job_url() {
        let gateway = MockStoreGateway::new();
        let user_id = Uuid::new_v4();
        let task = gateway
            .create_task(user_id, TaskType::SeekScraper, None, json!({}))
            .await
            .unwrap();

        let posting = ScrapedPosting {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            salary: "n/a".to_string(),
            job_url: Some("https://jobs.example/1?ref=feed".to_string()),
            work_type: "full_time".to_string(),
            detailed_description: String::new(),
            source_platform: "seek".to_string(),
        };

        let first = gateway
            .insert_found_jobs(user_id, task.id, vec![posting.clone()])
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = gateway
            .insert_found_jobs(user_id, task.id, vec![posting])
            .await
            .unwrap();
        assert!(second.is_empty(), "duplicate job_url must be dropped");
    }

    #[tokio::test]
    async fn set_found_job_saved_toggles_flag() {
        let gateway = MockStoreGateway::new();
        let user_id = Uuid::new_v4();
        let task = gateway
            .create_task(user_id, TaskType::SeekScraper, None, json!({}))
            .await
            .unwrap();
        let inserted = gateway
            .insert_found_jobs(
                user_id,
                task.id,
                vec![ScrapedPosting {
                    title: "Engineer".to_string(),
                    company: "Acme".to_string(),
                    location: "Remote".to_string(),
                    salary: "n/a".to_string(),
                    job_url: None,
                    work_type: "full_time".to_string(),
                    detailed_description: String::new(),
                    source_platform: "seek".to_string(),
                }],
            )
            .await
            .unwrap();
        let found_job = inserted.into_iter().next().unwrap();

        let updated = gateway
            .set_found_job_saved(found_job.id, true)
            .await
            .unwrap();
        assert!(updated.saved);
    }
}
