use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::LlmProviderConfig;
use crate::store::models::AnalysisResult;
use crate::util::json::extract_json_object;
use crate::util::redact::redact;

use super::prompt::{ResumeMatchInputs, render_resume_match_prompt};
use super::provider::LlmProvider;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider {0:?} is not configured")]
    ProviderNotConfigured(LlmProvider),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("upstream returned no usable response body")]
    EmptyResponse,
}

/// Full-jitter delay, same shape as [`crate::util::retry::RetryConfig`] but
/// with a uniform draw instead of exponential growth — used here for the
/// scraper's human-delay jitter and (parameterized with growth) for retry
/// backoff between LLM attempts.
fn full_jitter_delay(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let exponential = base_ms.saturating_mul(1_u64.saturating_shl(attempt));
    let capped = exponential.min(cap_ms);
    let jittered = if capped > 0 {
        rand::rng().random_range(0..=capped)
    } else {
        0
    };
    Duration::from_millis(jittered)
}

/// Talks to whichever LLM provider a task requested. One HTTP client shared
/// across providers; provider-specific request/response shapes are handled
/// per call, not via separate client types, since they differ only in
/// wire format, not in retry/redaction/logging behavior.
pub struct LlmClient {
    http: Client,
    max_retries: usize,
    backoff_base_ms: u64,
    backoff_cap_ms: u64,
}

impl LlmClient {
    #[must_use]
    pub fn new(http: Client, max_retries: usize, backoff_base_ms: u64, backoff_cap_ms: u64) -> Self {
        Self {
            http,
            max_retries,
            backoff_base_ms,
            backoff_cap_ms,
        }
    }

    /// Scores one posting against a résumé using the configured provider.
    /// Never returns an `Err` for a malformed LLM response body — a bad
    /// response degrades to [`AnalysisResult::unavailable`] so one
    /// uncooperative posting can't fail an entire matcher batch.
    pub async fn score_resume_match(
        &self,
        provider: LlmProvider,
        config: &LlmProviderConfig,
        inputs: &ResumeMatchInputs<'_>,
    ) -> Result<AnalysisResult, LlmError> {
        let prompt = render_resume_match_prompt(inputs);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = full_jitter_delay(
                    self.backoff_base_ms,
                    self.backoff_cap_ms,
                    u32::try_from(attempt).unwrap_or(u32::MAX),
                );
                tokio::time::sleep(delay).await;
            }

            match self.call_provider(provider, config, &prompt).await {
                Ok(raw_text) => {
                    return Ok(extract_json_object(&raw_text)
                        .and_then(|value| parse_analysis(&value))
                        .unwrap_or_else(|| AnalysisResult::unavailable(&raw_text)));
                }
                Err(error) => {
                    warn!(
                        provider = provider.as_str(),
                        attempt,
                        api_key = %redact(config.api_key.as_deref().unwrap_or("")),
                        %error,
                        "llm call failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::EmptyResponse))
    }

    async fn call_provider(
        &self,
        provider: LlmProvider,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<String, LlmError> {
        match provider {
            LlmProvider::Google => self.call_gemini_style(config, prompt).await,
            LlmProvider::Ollama => self.call_ollama_style(config, prompt).await,
            LlmProvider::OpenAi | LlmProvider::DeepSeek | LlmProvider::AzureOpenAi => {
                self.call_openai_style(config, prompt).await
            }
        }
    }

    async fn call_openai_style(
        &self,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<String, LlmError> {
        if config.supports_function_calls {
            if let Some(arguments) = self.call_openai_style_with_tools(config, prompt).await? {
                return Ok(arguments);
            }
            warn!(
                base_url = %config.base_url,
                "function-calling response had no usable tool call, falling back to json-only prompt"
            );
        }
        self.call_openai_style_json_only(config, prompt).await
    }

    /// Requests a structured tool call instead of free-form JSON content.
    /// Returns `Ok(None)` (not an error) when the provider accepted the
    /// request but didn't return a usable tool call, so the caller can fall
    /// back to the JSON-only prompt.
    async fn call_openai_style_with_tools(
        &self,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<Option<String>, LlmError> {
        let body = json!({
            "model": config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
            "tools": [{
                "type": "function",
                "function": {
                    "name": "report_resume_match",
                    "description": "Report a structured résumé-to-job match analysis.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "matching_score": {"type": "integer"},
                            "summary": {"type": "string"},
                            "strengths": {"type": "array", "items": {"type": "string"}},
                            "gaps": {"type": "array", "items": {"type": "string"}},
                            "recommendations": {"type": "array", "items": {"type": "string"}},
                            "reasoning": {"type": "string"},
                        },
                        "required": [
                            "matching_score", "summary", "strengths", "gaps",
                            "recommendations", "reasoning",
                        ],
                    },
                },
            }],
            "tool_choice": {"type": "function", "function": {"name": "report_resume_match"}},
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", config.base_url.trim_end_matches('/')))
            .json(&body);
        if let Some(api_key) = &config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?.error_for_status()?;
        let payload: Value = response.json().await?;
        Ok(payload["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .map(str::to_string))
    }

    async fn call_openai_style_json_only(
        &self,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", config.base_url.trim_end_matches('/')))
            .json(&body);
        if let Some(api_key) = &config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?.error_for_status()?;
        let payload: Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn call_gemini_style(
        &self,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            config.base_url.trim_end_matches('/'),
            config.model,
            config.api_key.as_deref().unwrap_or_default(),
        );

        let response = self.http.post(url).json(&body).send().await?.error_for_status()?;
        let payload: Value = response.json().await?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn call_ollama_style(
        &self,
        config: &LlmProviderConfig,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": config.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });

        let response = self
            .http
            .post(format!("{}/api/chat", config.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: Value = response.json().await?;
        payload["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}

fn parse_analysis(value: &Value) -> Option<AnalysisResult> {
    serde_json::from_value(value.clone()).ok()
}

/// Logs the effective provider config at startup without ever emitting the
/// raw API key.
pub fn log_provider_selection(provider: LlmProvider, config: &LlmProviderConfig) {
    info!(
        provider = provider.as_str(),
        base_url = %config.base_url,
        model = %config.model,
        api_key = %redact(config.api_key.as_deref().unwrap_or("")),
        "llm provider configured"
    );
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_config(base_url: String, supports_function_calls: bool) -> LlmProviderConfig {
        LlmProviderConfig {
            api_key: None,
            base_url,
            model: "gpt-test".to_string(),
            supports_function_calls,
        }
    }

    #[tokio::test]
    async fn call_openai_style_uses_tool_call_path_when_supported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "tool_calls": [{"function": {"arguments": json!({
                        "matching_score": 88,
                        "summary": "great fit",
                        "strengths": ["rust"],
                        "gaps": [],
                        "recommendations": [],
                        "reasoning": "strong alignment",
                    }).to_string()}}],
                }}]
            })))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(reqwest::Client::new(), 0, 10, 50);
        let config = provider_config(mock_server.uri(), true);
        let raw = client
            .call_openai_style(&config, "score this resume")
            .await
            .expect("tool call succeeds");

        let parsed: AnalysisResult = serde_json::from_str(&raw).expect("arguments parse");
        assert_eq!(parsed.matching_score, 88);
    }

    #[tokio::test]
    async fn call_openai_style_falls_back_to_json_only_without_tool_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "plain json-only reply"}}]
            })))
            .mount(&mock_server)
            .await;

        let client = LlmClient::new(reqwest::Client::new(), 0, 10, 50);
        let config = provider_config(mock_server.uri(), true);
        let raw = client
            .call_openai_style(&config, "score this resume")
            .await
            .expect("falls back to json-only");

        assert_eq!(raw, "plain json-only reply");
    }

    #[test]
    fn full_jitter_delay_never_exceeds_cap() {
        for attempt in 0..6 {
            let delay = full_jitter_delay(100, 1000, attempt);
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn parse_analysis_accepts_well_formed_object() {
        let value = json!({
            "matching_score": 75,
            "summary": "solid fit",
            "strengths": ["rust"],
            "gaps": ["no kubernetes"],
            "recommendations": ["mention k8s exposure"],
            "reasoning": "candidate has 5 years rust experience matching the core requirement",
        });
        let parsed = parse_analysis(&value).expect("parses");
        assert_eq!(parsed.matching_score, 75);
    }

    #[test]
    fn parse_analysis_rejects_missing_fields() {
        let value = json!({"matching_score": 75});
        assert!(parse_analysis(&value).is_none());
    }
}
