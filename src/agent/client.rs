//! HTTP client for the remote analysis API.
//!
//! The API exposes two endpoints:
//! - `POST /analyze` takes a query plus the conversation so far and returns
//!   the dataset analyst's answer, the economics expert's answer and an
//!   optional chart payload.
//! - `GET /health` answers 2xx when the backend is available.

use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the analysis client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// One prior message sent along with a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Body of `POST /analyze`.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    query: &'a str,
    conversation_history: &'a [HistoryEntry],
}

/// Body returned by `POST /analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AnalysisData>,
    /// Chart payload, passed through untouched.
    #[serde(default)]
    pub chart_data: Option<Value>,
    /// Older backends answer here instead of `data.csv_response`.
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisData {
    #[serde(default)]
    pub csv_response: Option<String>,
    /// Either an object or a JSON-encoded string.
    #[serde(default)]
    pub economics_response: Option<Value>,
}

/// Anything that can answer analysis queries.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Ask a question, passing the conversation so far.
    async fn analyze(
        &self,
        query: &str,
        history: &[HistoryEntry],
    ) -> Result<AnalyzeResponse, ApiError>;

    /// Whether the backend is reachable and healthy.
    async fn health_check(&self) -> bool;
}

/// reqwest-backed client for the analysis API.
pub struct AnalysisClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            ApiError::Connect(self.config.base_url.clone())
        } else {
            ApiError::Http(e)
        }
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(
        &self,
        query: &str,
        history: &[HistoryEntry],
    ) -> Result<AnalyzeResponse, ApiError> {
        let url = self.endpoint("/analyze");
        let request = AnalyzeRequest {
            query,
            conversation_history: history,
        };

        debug!("Sending analysis request ({} history messages)", history.len());
        debug!(
            "Request body: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Analysis API returned {}: {}", status, body);
            return Err(ApiError::Status { status, body });
        }

        let analysis: AnalyzeResponse = response.json().await?;
        debug!("Analysis succeeded: {}", analysis.success);

        Ok(analysis)
    }

    async fn health_check(&self) -> bool {
        let url = self.endpoint("/health");
        debug!("Checking backend health at {}", url);

        match self.http_client.get(&url).send().await {
            Ok(response) => {
                debug!("Health status: {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }
}
