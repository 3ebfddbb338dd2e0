use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

pub const GENERIC_FAILURE_TEXT: &str = "Error: Unable to fetch response.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Network Error: Unable to connect to server ({0})")]
    Network(String),

    #[error("Server Error: {status} - {}", .message.as_deref().unwrap_or("Unknown error"))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Protocol Error: {0}")]
    Protocol(String),
}

impl RelayError {
    /// Text for the terminal AI message that replaces a pending
    /// placeholder when a send fails.
    pub fn display_text(&self) -> String {
        match self {
            RelayError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_FAILURE_TEXT.to_string(),
        }
    }
}

/// Anything that can turn a prompt into response text.
#[async_trait]
pub trait PromptRelay: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, RelayError>;
}

#[derive(Deserialize)]
struct ContentResponse {
    result: Option<Value>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// HTTP client for the relay server's `POST /api/content` endpoint.
#[derive(Clone, Debug)]
pub struct RelayClient {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PromptRelay for RelayClient {
    async fn send(&self, prompt: &str) -> Result<String, RelayError> {
        if prompt.trim().is_empty() {
            return Err(RelayError::Validation("prompt is empty".to_string()));
        }

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&json!({ "question": prompt }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error fetching content: {}", e);
                RelayError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error);
            tracing::error!("Server Error: {} {}", status, body);
            return Err(RelayError::Server { status, message });
        }

        let parsed: ContentResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Unexpected response structure: {}", body);
            RelayError::Protocol(e.to_string())
        })?;
        match parsed.result {
            Some(Value::String(result)) => Ok(result),
            _ => {
                tracing::error!("Unexpected response structure: {}", body);
                Err(RelayError::Protocol(
                    "Invalid response format from server".to_string(),
                ))
            }
        }
    }
}
