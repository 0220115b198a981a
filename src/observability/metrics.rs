use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// Prometheus metric collector, one instance per process.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub tasks_created: Counter,
    pub tasks_completed: Counter,
    pub tasks_failed: Counter,
    pub tasks_cancelled: Counter,
    pub tasks_deadline_exceeded: Counter,
    pub tasks_rejected_run_queue_full: Counter,
    pub retries_total: Counter,

    pub postings_scraped: Counter,
    pub postings_deduplicated: Counter,
    pub postings_scored: Counter,
    pub llm_calls_total: Counter,
    pub llm_calls_failed: Counter,
    pub llm_json_extraction_fallbacks: Counter,
    pub browser_sessions_opened: Counter,
    pub browser_sessions_leaked: Counter,

    pub task_duration: Histogram,
    pub scrape_duration: Histogram,
    pub matcher_batch_duration: Histogram,
    pub llm_call_duration: Histogram,

    pub active_tasks: Gauge,
    pub run_queue_depth: Gauge,
}

impl Metrics {
    #[allow(clippy::too_many_lines)]
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            tasks_created: register_counter_with_registry!(
                "agent_tasks_created_total",
                "Total number of tasks created",
                registry
            )?,
            tasks_completed: register_counter_with_registry!(
                "agent_tasks_completed_total",
                "Total number of tasks that reached the completed status",
                registry
            )?,
            tasks_failed: register_counter_with_registry!(
                "agent_tasks_failed_total",
                "Total number of tasks that reached the failed status",
                registry
            )?,
            tasks_cancelled: register_counter_with_registry!(
                "agent_tasks_cancelled_total",
                "Total number of tasks cancelled by a user",
                registry
            )?,
            tasks_deadline_exceeded: register_counter_with_registry!(
                "agent_tasks_deadline_exceeded_total",
                "Total number of tasks forced to failed by wall-clock budget enforcement",
                registry
            )?,
            tasks_rejected_run_queue_full: register_counter_with_registry!(
                "agent_tasks_rejected_run_queue_full_total",
                "Total number of task creations rejected because the user's run queue was full",
                registry
            )?,
            retries_total: register_counter_with_registry!(
                "agent_retries_total",
                "Total number of retried upstream calls",
                registry
            )?,
            postings_scraped: register_counter_with_registry!(
                "agent_postings_scraped_total",
                "Total number of job postings harvested by the scraper",
                registry
            )?,
            postings_deduplicated: register_counter_with_registry!(
                "agent_postings_deduplicated_total",
                "Total number of postings dropped as duplicates by job_url",
                registry
            )?,
            postings_scored: register_counter_with_registry!(
                "agent_postings_scored_total",
                "Total number of postings scored by the matcher",
                registry
            )?,
            llm_calls_total: register_counter_with_registry!(
                "agent_llm_calls_total",
                "Total number of LLM provider calls",
                registry
            )?,
            llm_calls_failed: register_counter_with_registry!(
                "agent_llm_calls_failed_total",
                "Total number of LLM provider calls that exhausted retries",
                registry
            )?,
            llm_json_extraction_fallbacks: register_counter_with_registry!(
                "agent_llm_json_extraction_fallbacks_total",
                "Total number of LLM responses that needed fence-stripping or brace extraction",
                registry
            )?,
            browser_sessions_opened: register_counter_with_registry!(
                "agent_browser_sessions_opened_total",
                "Total number of WebDriver sessions opened by the scraper",
                registry
            )?,
            browser_sessions_leaked: register_counter_with_registry!(
                "agent_browser_sessions_leaked_total",
                "Total number of WebDriver sessions whose Drop-time close call failed",
                registry
            )?,
            task_duration: register_histogram_with_registry!(
                "agent_task_duration_seconds",
                "Duration of a task from dispatch to terminal status",
                registry
            )?,
            scrape_duration: register_histogram_with_registry!(
                "agent_scrape_duration_seconds",
                "Duration of a single scraper run",
                registry
            )?,
            matcher_batch_duration: register_histogram_with_registry!(
                "agent_matcher_batch_duration_seconds",
                "Duration of a single matcher batch",
                registry
            )?,
            llm_call_duration: register_histogram_with_registry!(
                "agent_llm_call_duration_seconds",
                "Duration of a single LLM provider call",
                registry
            )?,
            active_tasks: register_gauge_with_registry!(
                "agent_active_tasks",
                "Number of tasks currently running",
                registry
            )?,
            run_queue_depth: register_gauge_with_registry!(
                "agent_run_queue_depth",
                "Number of tasks queued behind the per-user concurrency cap",
                registry
            )?,
        })
    }
}
