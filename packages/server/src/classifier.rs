use std::time::Duration;

use async_trait::async_trait;
use common::Severity;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier unreachable: {0}")]
    Transport(String),
    #[error("classifier returned HTTP {0}")]
    Status(u16),
    #[error("malformed classifier response: {0}")]
    Decode(String),
    #[error("unrecognized priority label '{0}'")]
    UnknownLabel(String),
}

/// Maps free-text incident descriptions to a severity.
#[async_trait]
pub trait SeverityClassifier: Send + Sync {
    async fn classify(&self, description: &str) -> Result<Severity, ClassifyError>;
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    priority: String,
}

/// Classifier reached over HTTP at `{base_url}/classify`.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/classify", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl SeverityClassifier for HttpClassifier {
    async fn classify(&self, description: &str) -> Result<Severity, ClassifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "incidentDescription": description, "text": description }))
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Decode(e.to_string()))?;

        Severity::from_label(&body.priority).ok_or(ClassifyError::UnknownLabel(body.priority))
    }
}
