//! OpenAI-backed batch analyzer
//!
//! Thin chat-completions client with client-side request pacing. Retry is
//! deliberately not implemented here: the dispatcher owns retry policy for
//! analysis calls, so this client reports each failure exactly once.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::llm::error::LlmError;
use crate::llm::{BatchAnalyzer, render_batch_prompt, render_narrative_prompt};
use crate::pipeline::Batch;
use crate::report::SiteReport;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Fallback Retry-After when the API omits the header
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Longest error-body excerpt kept in an error message
const MAX_ERROR_BODY: usize = 300;

/// Options for the OpenAI client
#[derive(Debug, Clone)]
pub struct OpenAiOptions {
    /// API key used as a bearer token
    pub api_key: String,

    /// Model name for analysis calls
    pub model: String,

    /// Base URL of the API, overridable for tests
    pub base_url: String,

    /// Client-side pacing: requests allowed per minute
    pub requests_per_minute: u32,

    /// Sampling temperature; low, since responses must follow a template
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiOptions {
    /// Options for a given key and model, with defaults for the rest
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com".to_string(),
            requests_per_minute: 60,
            temperature: 0.2,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chat-completions client implementing [`BatchAnalyzer`]
#[derive(Clone)]
pub struct OpenAiClient {
    client: ReqwestClient,
    options: OpenAiOptions,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl OpenAiClient {
    /// Create a client from options
    pub fn new(options: OpenAiOptions) -> Self {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        let quota = Quota::per_minute(
            NonZeroU32::new(options.requests_per_minute.max(1)).expect("nonzero requests per minute"),
        );

        Self {
            client,
            options,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Send one chat prompt and return the model's text reply
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        self.limiter.until_ready().await;

        let body = json!({
            "model": self.options.model,
            "temperature": self.options.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let url = format!("{}/v1/chat/completions", self.options.base_url);
        debug!("sending chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::MalformedResponse("response contained no message content".to_string()))
    }
}

impl BatchAnalyzer for OpenAiClient {
    async fn analyze_batch(&self, batch: &Batch) -> Result<String, LlmError> {
        self.chat(&render_batch_prompt(batch)).await
    }

    async fn synthesize_narrative(&self, report: &SiteReport) -> Result<String, LlmError> {
        self.chat(&render_narrative_prompt(report)).await
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::test_record;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        let mut options = OpenAiOptions::new("test-key", "gpt-4o-mini");
        options.base_url = server.url();
        options.requests_per_minute = 10_000;
        OpenAiClient::new(options)
    }

    fn batch() -> Batch {
        Batch::new(0, vec![test_record("https://a.test/")])
    }

    #[tokio::test]
    async fn test_successful_completion_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"URL: https://a.test/\nSEO SCORE: 80\nPRIORITY: Low"}}]}"#,
            )
            .create_async()
            .await;

        let raw = client_for(&server).analyze_batch(&batch()).await.unwrap();
        assert!(raw.contains("SEO SCORE: 80"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_reports_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let err = client_for(&server).analyze_batch(&batch()).await.unwrap_err();
        match err {
            LlmError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 7),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = client_for(&server).analyze_batch(&batch()).await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server).analyze_batch(&batch()).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
