use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Failures from the external generation capability, grouped by what
/// the user can do about them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Invalid API key. Check the server configuration.")]
    InvalidCredential,

    #[error("Quota exceeded. Please try again later.")]
    QuotaExceeded,

    #[error("The response was blocked by the safety filter.")]
    SafetyBlocked,

    #[error("Content generation service is unavailable.")]
    Unavailable(String),

    #[error("Content generation failed: {0}")]
    Other(String),
}

impl ProviderError {
    /// Sort a provider error response into a category by status code
    /// and error text.
    pub fn classify(status: StatusCode, message: &str) -> Self {
        let text = message.to_lowercase();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || text.contains("api key")
            || text.contains("api_key_invalid")
            || text.contains("permission_denied")
            || text.contains("unauthenticated")
        {
            ProviderError::InvalidCredential
        } else if status == StatusCode::TOO_MANY_REQUESTS
            || text.contains("quota")
            || text.contains("resource_exhausted")
            || text.contains("rate limit")
        {
            ProviderError::QuotaExceeded
        } else if text.contains("safety") || text.contains("blocked") {
            ProviderError::SafetyBlocked
        } else if message.trim().is_empty() {
            ProviderError::Other(status.to_string())
        } else {
            ProviderError::Other(message.to_string())
        }
    }
}

/// Opaque text generation: a prompt and a model in, text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

pub type SharedGenerator = Arc<dyn Generator + Send + Sync + 'static>;

// {
//   "candidates": [
//     {
//       "content": { "parts": [{ "text": "Hi there" }], "role": "model" },
//       "finishReason": "STOP"
//     }
//   ],
//   "promptFeedback": { "blockReason": "SAFETY" }
// }
#[derive(Deserialize, Debug)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

// { "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" } }
#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Client for Gemini's `generateContent` REST endpoint.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_hostname: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn parse_error(status: StatusCode, body: &str) -> ProviderError {
        let message = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(resp) => {
                let detail = resp.error;
                format!(
                    "{} {}",
                    detail.status.unwrap_or_default(),
                    detail.message.unwrap_or_default()
                )
                .trim()
                .to_string()
            }
            Err(_) => body.to_string(),
        };
        ProviderError::classify(status, &message)
    }

    fn parse_text(resp: GenerateContentResponse) -> Result<String, ProviderError> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            tracing::warn!("Prompt blocked by provider: {}", reason);
            return Err(ProviderError::SafetyBlocked);
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No candidates returned".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return match candidate.finish_reason.as_deref() {
                Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
                    Err(ProviderError::SafetyBlocked)
                }
                reason => Err(ProviderError::Other(format!(
                    "Empty response (finish reason: {})",
                    reason.unwrap_or("unknown")
                ))),
            };
        }

        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_hostname.trim_end_matches("/"),
            model
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(60 * 2))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Provider error for model {}: {} {}", model, status, body);
            return Err(Self::parse_error(status, &body));
        }

        let resp: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Other(format!("Invalid provider response: {}", e)))?;
        Self::parse_text(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_provider_errors() {
        assert_eq!(
            ProviderError::classify(StatusCode::BAD_REQUEST, "API key not valid. Please pass a valid API key."),
            ProviderError::InvalidCredential
        );
        assert_eq!(
            ProviderError::classify(StatusCode::FORBIDDEN, ""),
            ProviderError::InvalidCredential
        );
        assert_eq!(
            ProviderError::classify(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::QuotaExceeded
        );
        assert_eq!(
            ProviderError::classify(StatusCode::BAD_REQUEST, "RESOURCE_EXHAUSTED you ran out"),
            ProviderError::QuotaExceeded
        );
        assert_eq!(
            ProviderError::classify(StatusCode::BAD_REQUEST, "Candidate was blocked due to SAFETY"),
            ProviderError::SafetyBlocked
        );
        assert_eq!(
            ProviderError::classify(StatusCode::NOT_FOUND, "models/nope is not found"),
            ProviderError::Other("models/nope is not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_generate_returns_joined_parts() {
        let mut server = mockito::Server::new_async().await;
        let response_body = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "Hello"}, {"text": " there!"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "Hi"}]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create_async()
            .await;

        let client = GeminiClient::new(&server.url(), "test-key");
        let text = client.generate("gemini-test", "Hi").await.unwrap();
        assert_eq!(text, "Hello there!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_invalid_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(400)
            .with_body(
                r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::new(&server.url(), "bad-key");
        let err = client.generate("gemini-test", "Hi").await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidCredential);
    }

    #[tokio::test]
    async fn test_generate_maps_quota() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&server.url(), "test-key");
        let err = client.generate("gemini-test", "Hi").await.unwrap_err();
        assert_eq!(err, ProviderError::QuotaExceeded);
    }

    #[tokio::test]
    async fn test_generate_maps_blocked_prompt() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&server.url(), "test-key");
        let err = client.generate("gemini-test", "Hi").await.unwrap_err();
        assert_eq!(err, ProviderError::SafetyBlocked);
    }

    #[tokio::test]
    async fn test_generate_maps_safety_finish_reason() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&server.url(), "test-key");
        let err = client.generate("gemini-test", "Hi").await.unwrap_err();
        assert_eq!(err, ProviderError::SafetyBlocked);
    }

    #[tokio::test]
    async fn test_generate_unreachable_provider() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new(&format!("http://{}", addr), "test-key");
        let err = client.generate("gemini-test", "Hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
