pub mod normalize;
pub mod types;

use std::fmt;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use self::normalize::{NormalizeError, normalize_body};
use self::types::{CompletionRequest, CompletionResponse, ModelsResponse};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyPrompt,
    MissingModel,
    InvalidCompletionId,
    Timeout,
    NetworkError,
    ServerError,
    MalformedPayload,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::EmptyPrompt => "empty prompt",
            ErrorKind::MissingModel => "missing model",
            ErrorKind::InvalidCompletionId => "invalid completion id",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkError => "network error",
            ErrorKind::ServerError => "server error",
            ErrorKind::MalformedPayload => "malformed payload",
        };
        f.write_str(name)
    }
}

/// A failure converted into one user-presentable message.
///
/// `status_code` is the HTTP status (408 for timeouts) or 0 when no response
/// was received. `raw_cause` carries the underlying error or response body for
/// logging; it is never shown to the user.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: u16,
    pub raw_cause: Option<String>,
}

impl ClassifiedError {
    fn local(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            status_code: 0,
            raw_cause: None,
        }
    }
}

/// Outcome of a single failed HTTP exchange, before classification.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Malformed(#[from] NormalizeError),
}

impl AttemptError {
    /// Malformed bodies are not retried: a second attempt returns the same body.
    fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Malformed(_))
    }
}

/// Optional `{message}` body carried by non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

fn body_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

const NETWORK_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";
const TIMEOUT_MESSAGE: &str = "Request timeout. The server took too long to respond.";
const MALFORMED_MESSAGE: &str = "Received a malformed response from the server.";

/// Human-readable message for a non-2xx status.
pub fn status_message(status: u16, body_message: Option<String>) -> String {
    match status {
        0 => NETWORK_MESSAGE.to_string(),
        400 => body_message
            .unwrap_or_else(|| "Invalid request. Please check your input.".to_string()),
        404 => "The requested resource was not found.".to_string(),
        408 => TIMEOUT_MESSAGE.to_string(),
        429 => "Too many requests. Please wait a moment and try again.".to_string(),
        500 => "Internal server error. Please try again later.".to_string(),
        503 => "Service temporarily unavailable. Please try again later.".to_string(),
        _ => body_message.unwrap_or_else(|| format!("Server error: {status}")),
    }
}

fn classify(err: AttemptError) -> ClassifiedError {
    match err {
        AttemptError::Timeout(_) => ClassifiedError {
            kind: ErrorKind::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
            status_code: StatusCode::REQUEST_TIMEOUT.as_u16(),
            raw_cause: Some(err.to_string()),
        },
        AttemptError::Transport(ref e) if e.is_timeout() => ClassifiedError {
            kind: ErrorKind::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
            status_code: StatusCode::REQUEST_TIMEOUT.as_u16(),
            raw_cause: Some(err.to_string()),
        },
        AttemptError::Transport(_) => ClassifiedError {
            kind: ErrorKind::NetworkError,
            message: NETWORK_MESSAGE.to_string(),
            status_code: 0,
            raw_cause: Some(err.to_string()),
        },
        AttemptError::Status { status, body } => ClassifiedError {
            kind: ErrorKind::ServerError,
            message: status_message(status, body_message(&body)),
            status_code: status,
            raw_cause: Some(body),
        },
        AttemptError::Malformed(_) => ClassifiedError {
            kind: ErrorKind::MalformedPayload,
            message: MALFORMED_MESSAGE.to_string(),
            status_code: 0,
            raw_cause: Some(err.to_string()),
        },
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Settings the client is constructed with.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub ask_timeout: Duration,
    pub models_timeout: Duration,
    pub health_timeout: Duration,
    /// Extra attempts after the first failed `submit` attempt.
    pub retry_count: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".to_string(),
            ask_timeout: Duration::from_millis(120_000),
            models_timeout: Duration::from_millis(10_000),
            health_timeout: Duration::from_millis(5_000),
            retry_count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Client for the completion backend.
///
/// Holds no mutable state; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AskClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AskClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self::with_http(config, http))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http(config: ClientConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    /// Build a full API URL from a path (e.g. "/ask").
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Submit a question and return the normalized answer.
    ///
    /// Validation failures return before any request is made. Timeouts,
    /// transport failures and non-2xx responses are retried up to
    /// `retry_count` times, sequentially and without delay.
    pub async fn submit(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ClassifiedError> {
        if request.prompt.trim().is_empty() {
            return Err(ClassifiedError::local(
                ErrorKind::EmptyPrompt,
                "Question cannot be empty",
            ));
        }
        if request.model.is_empty() {
            return Err(ClassifiedError::local(
                ErrorKind::MissingModel,
                "Model must be specified",
            ));
        }

        let url = self.url("/ask");
        let max_attempts = self.config.retry_count.saturating_add(1);
        let mut attempt = 1;

        loop {
            tracing::debug!(%url, model = %request.model, attempt, "submitting completion request");

            let builder = self
                .http
                .post(&url)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/json")
                .json(request);

            let result = self
                .fetch_text(builder, self.config.ask_timeout)
                .await
                .and_then(|body| normalize_body(&body).map_err(AttemptError::from));

            match result {
                Ok(resp) => {
                    tracing::info!(
                        id = %resp.id,
                        total_tokens = resp.usage.total_tokens,
                        attempt,
                        "completion received"
                    );
                    return Ok(resp);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(attempt, "completion attempt failed, retrying: {e}");
                    attempt += 1;
                }
                Err(e) => {
                    let classified = classify(e);
                    tracing::warn!(
                        kind = %classified.kind,
                        status = classified.status_code,
                        attempt,
                        cause = classified.raw_cause.as_deref().unwrap_or(""),
                        "completion request failed"
                    );
                    return Err(classified);
                }
            }
        }
    }

    /// Fetch a stored completion by id. Not retried.
    pub async fn get_completion(&self, id: u64) -> Result<CompletionResponse, ClassifiedError> {
        if id == 0 {
            return Err(ClassifiedError::local(
                ErrorKind::InvalidCompletionId,
                "Invalid completion ID",
            ));
        }

        let builder = self.http.get(self.url(&format!("/textcompletion/{id}")));
        let body = self
            .fetch_text(builder, self.config.ask_timeout)
            .await
            .map_err(classify)?;
        normalize_body(&body).map_err(|e| classify(e.into()))
    }

    /// Fetch the model catalog. Not retried; callers fall back to
    /// [`ModelsResponse::fallback`] on failure.
    pub async fn list_models(&self) -> Result<ModelsResponse, ClassifiedError> {
        let builder = self.http.get(self.url("/models"));
        let body = self
            .fetch_text(builder, self.config.models_timeout)
            .await
            .map_err(|e| {
                tracing::warn!("model catalog fetch failed: {e}");
                classify(e)
            })?;

        serde_json::from_str::<ModelsResponse>(&body)
            .map_err(|e| classify(AttemptError::Malformed(e.into())))
    }

    /// Liveness probe. Not retried. A non-JSON body is returned as a string.
    pub async fn health_check(&self) -> Result<serde_json::Value, ClassifiedError> {
        let builder = self.http.get(self.url("/health"));
        let body = self
            .fetch_text(builder, self.config.health_timeout)
            .await
            .map_err(classify)?;

        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }

    /// Send one request and read its body, bounded by `limit`.
    async fn fetch_text(
        &self,
        builder: RequestBuilder,
        limit: Duration,
    ) -> Result<String, AttemptError> {
        tokio::time::timeout(limit, exchange(builder))
            .await
            .map_err(|_| AttemptError::Timeout(limit))?
    }
}

/// Check status and read the response body.
async fn exchange(builder: RequestBuilder) -> Result<String, AttemptError> {
    let resp = builder.send().await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_else(|e| {
            tracing::debug!(status = status.as_u16(), "failed to read error body: {e}");
            String::new()
        });
        return Err(AttemptError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp.text().await?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
