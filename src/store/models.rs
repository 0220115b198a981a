use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The three pipelines the Task Engine can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SeekScraper,
    ResumeJobMatching,
    JobAgent,
}

impl TaskType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeekScraper => "seek_scraper",
            Self::ResumeJobMatching => "resume_job_matching",
            Self::JobAgent => "job_agent",
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seek_scraper" => Ok(Self::SeekScraper),
            "resume_job_matching" => Ok(Self::ResumeJobMatching),
            "job_agent" => Ok(Self::JobAgent),
            _ => Err(()),
        }
    }
}

/// Lifecycle state of a [`Task`]. Transitions are validated by
/// `crate::engine::transition::validate`, never by the DAO layer alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Paused,
    Scheduled,
    Recurring,
}

impl TaskStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
            Self::Scheduled => "scheduled",
            Self::Recurring => "recurring",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "paused" => Ok(Self::Paused),
            "scheduled" => Ok(Self::Scheduled),
            "recurring" => Ok(Self::Recurring),
            _ => Err(()),
        }
    }
}

/// A durable record of one pipeline run. See spec §3.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_type: TaskType,
    pub task_description: Option<String>,
    pub status: TaskStatus,
    pub task_instructions: Value,
    pub execution_result: Option<Value>,
    pub other_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence_config: Option<Value>,
    pub next_execution_at: Option<DateTime<Utc>>,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub execution_count: i32,
    pub max_executions: Option<i32>,
    pub is_active: bool,
}

/// `task_instructions` shape for `TaskType::SeekScraper`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekScraperInstructions {
    pub job_titles: Vec<String>,
    pub location: String,
    pub desired_result_count: usize,
    #[serde(default = "default_source_platform")]
    pub source_platform: String,
}

/// `task_instructions` shape for `TaskType::ResumeJobMatching`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeJobMatchingInstructions {
    pub resume_text: String,
    pub found_job_ids: Vec<Uuid>,
    pub llm_provider: String,
}

/// `task_instructions` shape for `TaskType::JobAgent`: the composite
/// scraper-then-matcher pipeline, so it carries both sides' inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAgentInstructions {
    pub job_titles: Vec<String>,
    pub location: String,
    pub desired_result_count: usize,
    #[serde(default = "default_source_platform")]
    pub source_platform: String,
    pub resume_text: String,
    pub llm_provider: String,
}

fn default_source_platform() -> String {
    "seek".to_string()
}

/// A posting discovered by a scraper run, optionally scored. See spec §3.
#[derive(Debug, Clone, Serialize)]
pub struct FoundJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_task_id: Option<Uuid>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub job_url: Option<String>,
    pub work_type: String,
    pub detailed_description: String,
    pub source_platform: String,
    pub application_status: String,
    pub match_score: Option<i32>,
    pub ai_analysis: Option<Value>,
    pub saved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A posting as harvested by the scraper, before it has an identity or a
/// score. Distinct from [`FoundJob`] so the scraper never has to fabricate
/// timestamps or ids that the Store Gateway owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub job_url: Option<String>,
    pub work_type: String,
    pub detailed_description: String,
    pub source_platform: String,
}

impl ScrapedPosting {
    /// `job_url` normalized for dedup: scheme+host+path, tracking query
    /// params stripped. Postings without a URL are never deduplicated
    /// against each other (spec §3 FoundJob.4 only applies when present).
    #[must_use]
    pub fn dedup_key(&self) -> Option<String> {
        self.job_url.as_deref().map(normalize_job_url)
    }
}

#[must_use]
pub fn normalize_job_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _query)) => base.to_string(),
        None => url.to_string(),
    }
}

/// The six-field structured scoring output. See spec §4.B.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "deserialize_matching_score")]
    pub matching_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub reasoning: String,
}

impl AnalysisResult {
    #[must_use]
    pub fn unavailable(raw_text: &str) -> Self {
        const RAW_TEXT_LIMIT: usize = 500;
        let truncated: String = raw_text.chars().take(RAW_TEXT_LIMIT).collect();
        Self {
            matching_score: 0,
            summary: "analysis unavailable".to_string(),
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendations: Vec::new(),
            reasoning: truncated,
        }
    }
}

/// Matching score clamp shared by the LLM parse path and the Store Gateway
/// write path (spec §3.1 FoundJob invariant, §4.B step 4) so a score is
/// bounded to `[0, 100]` no matter which boundary it crosses first.
#[must_use]
pub fn clamp_match_score(score: i32) -> i32 {
    score.clamp(0, 100)
}

/// Some providers return `matching_score` as a JSON string (`"95"`) rather
/// than a number. Accept either, then clamp to the valid range.
fn deserialize_matching_score<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScoreRepr {
        Number(i32),
        Text(String),
    }

    let repr = ScoreRepr::deserialize(deserializer)?;
    let score = match repr {
        ScoreRepr::Number(score) => score,
        ScoreRepr::Text(text) => text
            .trim()
            .parse::<i32>()
            .map_err(serde::de::Error::custom)?,
    };
    Ok(clamp_match_score(score))
}

/// Actor that initiated a status transition, recorded in the task's audit
/// trail (`agent_task_status_history`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTransitionActor {
    Engine,
    User,
}

impl StatusTransitionActor {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusTransition {
    pub task_id: Uuid,
    pub from_status: Option<TaskStatus>,
    pub to_status: TaskStatus,
    pub reason: Option<String>,
    pub actor: StatusTransitionActor,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_job_url_strips_query() {
        assert_eq!(
            normalize_job_url("https://seek.example/job/123?utm_source=feed"),
            "https://seek.example/job/123"
        );
        assert_eq!(
            normalize_job_url("https://seek.example/job/123"),
            "https://seek.example/job/123"
        );
    }

    #[test]
    fn task_status_round_trips_through_str() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
            TaskStatus::Paused,
            TaskStatus::Scheduled,
            TaskStatus::Recurring,
        ] {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn analysis_result_coerces_string_matching_score() {
        let value = serde_json::json!({
            "matching_score": "95",
            "summary": "solid fit",
            "strengths": ["rust"],
            "gaps": [],
            "recommendations": [],
            "reasoning": "five years of matching experience",
        });
        let parsed: AnalysisResult = serde_json::from_value(value).expect("string score coerces");
        assert_eq!(parsed.matching_score, 95);
    }

    #[test]
    fn analysis_result_clamps_out_of_range_matching_score() {
        let value = serde_json::json!({
            "matching_score": 150,
            "summary": "solid fit",
            "strengths": [],
            "gaps": [],
            "recommendations": [],
            "reasoning": "score over 100 must clamp",
        });
        let parsed: AnalysisResult = serde_json::from_value(value).expect("parses");
        assert_eq!(parsed.matching_score, 100);

        let negative = serde_json::json!({
            "matching_score": -10,
            "summary": "poor fit",
            "strengths": [],
            "gaps": [],
            "recommendations": [],
            "reasoning": "negative score must clamp to zero",
        });
        let parsed: AnalysisResult = serde_json::from_value(negative).expect("parses");
        assert_eq!(parsed.matching_score, 0);
    }

    #[test]
    fn clamp_match_score_bounds_to_zero_and_hundred() {
        assert_eq!(clamp_match_score(-5), 0);
        assert_eq!(clamp_match_score(150), 100);
        assert_eq!(clamp_match_score(42), 42);
    }

    #[test]
    fn terminal_statuses_are_exactly_three() {
        let all = [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
            TaskStatus::Paused,
            TaskStatus::Scheduled,
            TaskStatus::Recurring,
        ];
        let terminal_count = all.iter().filter(|s| s.is_terminal()).count();
        assert_eq!(terminal_count, 3);
    }
}
