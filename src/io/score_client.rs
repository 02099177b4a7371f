//! HTTP client for the score persistence endpoint
//!
//! One POST per submission, no retry. The caller decides what a failure means.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("score request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("score rejected with status {status}: {error}")]
    Rejected { status: u16, error: String, details: Option<String> },
    #[error("unexpected score response: {0}")]
    Decode(String),
}

impl ScoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::Transport(e) if e.is_timeout() => "timeout",
            ScoreError::Transport(_) => "transport",
            ScoreError::Rejected { .. } => "rejected",
            ScoreError::Decode(_) => "decode",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ScoreRequest {
    score: u32,
}

/// Acknowledgement returned by the persistence endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    pub success: bool,
    #[serde(default)]
    pub user_scores: Vec<f64>,
    #[serde(default)]
    pub user_total_score: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

pub struct ScoreClient {
    url: String,
    http: reqwest::Client,
}

impl ScoreClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ScoreError> {
        // Created once for connection reuse
        let http = reqwest::Client::builder().timeout(timeout).http1_only().build()?;
        Ok(Self { url: url.to_string(), http })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{"score": n}` and decode the receipt
    pub async fn submit(&self, score: u32) -> Result<ScoreReceipt, ScoreError> {
        let response = self.http.post(&self.url).json(&ScoreRequest { score }).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = %status.as_u16(), bytes = %body.len(), "score_response");

        if !status.is_success() {
            let (error, details) = match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(parsed) => (parsed.error, parsed.details),
                Err(_) => (String::from_utf8_lossy(&body).trim().to_string(), None),
            };
            return Err(ScoreError::Rejected { status: status.as_u16(), error, details });
        }

        serde_json::from_slice(&body).map_err(|e| ScoreError::Decode(e.to_string()))
    }
}
