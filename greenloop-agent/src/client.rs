//! # Gemini API client
//!
//! Sends the accumulated conversation plus tool declarations to the model
//! endpoint and normalizes the response into a single reply.
//!
//! ## Design
//! - Stateless on the wire: the full history is resent on every call
//! - Typed request/response structs validated at the serialization boundary
//! - HTTP 429 and 5xx are retried with doubling backoff, no jitter; any
//!   other non-200 status is fatal and propagates with the server payload
//! - Body-shape problems on a 200 never become errors: they degrade into a
//!   tagged `ModelReply` so the orchestration loop stays single-pathed

use crate::conversation::{Part, Turn};
use crate::tool::ToolDefinition;
use greenloop_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Total attempts per call, including the first
pub const MAX_RETRIES: usize = 3;

/// Starting backoff between retried attempts
pub const INITIAL_BACKOFF_MS: u64 = 1000;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the Gemini client.
///
/// The credential is injected here once, at the process boundary, and never
/// looked up from the environment anywhere else.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            timeout_secs: 120,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Turn],
    tools: [ToolsEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ToolsEntry<'a> {
    #[serde(rename = "functionDeclarations")]
    function_declarations: &'a [ToolDefinition],
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// Replies
// ============================================================================

/// Normalized result of one model call.
///
/// Application-level problems in a 200 body are tagged here rather than
/// raised, so the orchestrator can switch on what happened instead of
/// sniffing result strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// The first content part of the first candidate
    Part(Part),
    /// HTTP 200, but the body carried an error instead of candidates.
    /// Terminal for the workflow.
    ApiError(String),
    /// A candidate was present but its shape could not be extracted.
    /// Degraded to a text signal; the workflow continues.
    Malformed(String),
}

// ============================================================================
// Client trait - the seam for orchestration tests
// ============================================================================

/// A model endpoint the orchestrator can talk to
#[allow(async_fn_in_trait)]
pub trait ModelClient {
    /// Send the full history and tool declarations, returning one reply.
    ///
    /// Fails only after exhausting retries or on a non-retryable status.
    async fn send(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelReply>;
}

// ============================================================================
// Gemini implementation
// ============================================================================

/// HTTP client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                Error::config_invalid(format!("failed to create HTTP client: {}", e))
                    .with_operation("client::new")
                    .set_source(e)
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

impl ModelClient for GeminiClient {
    async fn send(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelReply> {
        let request = GenerateRequest {
            contents: history,
            tools: [ToolsEntry {
                function_declarations: tools,
            }],
        };
        let url = format!("{}?key={}", self.endpoint(), self.config.api_key);

        let mut attempts = 0;
        let mut backoff = self.config.initial_backoff;

        loop {
            attempts += 1;

            let response = self
                .http
                .post(&url)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    Error::network_failed(e.to_string())
                        .with_operation("client::send")
                        .set_source(e)
                })?;

            let status = response.status();
            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    Error::network_failed(format!("failed to read response body: {}", e))
                        .with_operation("client::send")
                        .set_source(e)
                })?;
                return Ok(parse_response(&body));
            }

            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            eprintln!("API call failed with code {}. Response: {}", code, body);

            let retryable = code == 429 || status.is_server_error();
            if retryable && attempts < self.config.max_retries {
                eprintln!(
                    "Attempt {} failed. Retrying in {} ms...",
                    attempts,
                    backoff.as_millis()
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            let err = if code == 429 {
                Error::rate_limited(body)
            } else if status.is_server_error() {
                Error::upstream_unavailable(code, body)
            } else {
                Error::api_failed(code, body)
            };
            // Retryable kinds arriving here have exhausted their budget.
            return Err(err
                .persist()
                .with_operation("client::send")
                .with_context("attempts", attempts.to_string()));
        }
    }
}

// ============================================================================
// Response normalization
// ============================================================================

/// Normalize a 200 response body into a tagged reply. Never panics and
/// never fails: shape problems degrade into `ApiError` or `Malformed`.
pub fn parse_response(body: &str) -> ModelReply {
    let root: serde_json::Value = match serde_json::from_str(body) {
        Ok(root) => root,
        Err(e) => return ModelReply::Malformed(format!("response body is not JSON: {}", e)),
    };

    let Some(candidates) = root.get("candidates") else {
        // The API answered 200 but embedded an application-level error.
        let message = root
            .get("error")
            .and_then(|e| serde_json::from_value::<ApiErrorBody>(e.clone()).ok())
            .and_then(|e| match (e.message, e.status) {
                (Some(message), Some(status)) => Some(format!("{} ({})", message, status)),
                (Some(message), None) => Some(message),
                (None, status) => status,
            })
            .unwrap_or_else(|| "Unknown error".to_string());
        return ModelReply::ApiError(message);
    };

    match extract_first_part(candidates.clone()) {
        Ok(part) => ModelReply::Part(part),
        Err(e) => ModelReply::Malformed(e.message().to_string()),
    }
}

fn extract_first_part(candidates: serde_json::Value) -> Result<Part> {
    let candidates: Vec<Candidate> = serde_json::from_value(candidates)
        .map_err(|e| Error::parse_failed(format!("malformed candidates: {}", e)))?;

    candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .ok_or_else(|| Error::parse_failed("candidate carries no content parts"))
}
