use std::time::{Duration, Instant};

use async_trait::async_trait;
use ollabench_core::{BenchError, OllamaConfig, Result, TaskResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::client::InferenceClient;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
    list_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Only the decode metrics are read; the generated text is discarded.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    /// Nanoseconds
    #[serde(default)]
    eval_duration: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaClient {
    pub fn new(host: &str) -> Result<Self> {
        Self::with_timeouts(host, DEFAULT_REQUEST_TIMEOUT, DEFAULT_LIST_TIMEOUT)
    }

    pub fn from_config(config: &OllamaConfig) -> Result<Self> {
        Self::with_timeouts(&config.host, config.request_timeout(), config.list_timeout())
    }

    pub fn with_timeouts(host: &str, request_timeout: Duration, list_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BenchError::Http(e.to_string()))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            client,
            list_timeout,
        })
    }

    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.host);
        let resp = self
            .client
            .get(&url)
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| BenchError::Http(describe_transport_error(&e)))?;

        if !resp.status().is_success() {
            return Err(BenchError::OllamaError(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| BenchError::Http(e.to_string()))?;

        info!(count = tags.models.len(), "Fetched models from Ollama");
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Non-streaming `/api/generate` with temperature pinned to zero.
    async fn generate(&self, model: &str, prompt: &str) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BenchError::InferenceRequest(describe_transport_error(&e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BenchError::InferenceRequest(describe_transport_error(&e)))?;

        if status != StatusCode::OK {
            return Err(BenchError::InferenceRequest(format!(
                "API error {}: {}",
                status,
                server_message(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            BenchError::InferenceRequest(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                truncate(&body)
            ))
        })
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    #[instrument(skip_all, fields(model = %model))]
    async fn execute(
        &self,
        model: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        if model.trim().is_empty() {
            return Err(BenchError::EmptyModel);
        }
        if prompt.trim().is_empty() {
            return Err(BenchError::InferenceRequest("prompt must not be empty".into()));
        }

        let start = Instant::now();
        // Dropping the request future aborts the HTTP exchange.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BenchError::Cancelled),
            resp = self.generate(model, prompt) => resp?,
        };
        let latency_secs = start.elapsed().as_secs_f64();

        let result = TaskResult::new(
            prompt,
            latency_secs,
            response.eval_duration.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        debug!(
            latency_secs = result.latency_secs,
            tokens_per_sec = result.tokens_per_sec,
            "Generation finished"
        );
        Ok(result)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        return format!("request timed out: {}", e);
    }
    if e.is_connect() {
        return format!("connection failed - is Ollama running? ({})", e);
    }
    e.to_string()
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body.
fn server_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.error,
        Err(_) => truncate(body.trim()),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
