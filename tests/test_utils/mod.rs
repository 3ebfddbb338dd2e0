//! Test utilities for integration tests
#![allow(dead_code)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use axum::{Router, body::Body};

use relaychat::api::{AppState, RelayState, app};
use relaychat::core::AppConfig;
use relaychat::gemini::{Generator, ProviderError, SharedGenerator};

pub const TEST_MODEL: &str = "test-model";
pub const TEST_ORIGIN: &str = "http://localhost:3000";

/// Generator that answers every prompt with a fixed result and
/// remembers what it was asked.
pub struct FakeGenerator {
    reply: Result<String, ProviderError>,
    working_models: Option<Vec<String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            working_models: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            working_models: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Only the listed models answer, everything else is "not found"
    pub fn with_models(models: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(String::from("pong")),
            working_models: Some(models.iter().map(|m| m.to_string()).collect()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        if let Some(models) = &self.working_models {
            if !models.iter().any(|m| m == model) {
                return Err(ProviderError::Other(format!("models/{} is not found", model)));
            }
        }
        self.reply.clone()
    }
}

pub fn test_config(candidates: &[&str]) -> AppConfig {
    AppConfig {
        gemini_api_hostname: String::from("http://localhost:0"),
        gemini_api_key: String::from("test-api-key"),
        model_candidates: candidates.iter().map(|c| c.to_string()).collect(),
        smoke_test_prompt: String::from("Hello"),
        allowed_origins: vec![String::from(TEST_ORIGIN)],
    }
}

/// Creates a test application router in the given relay state.
pub fn test_app_in_state(generator: Arc<FakeGenerator>, relay: RelayState) -> Router {
    let generator: SharedGenerator = generator;
    let mut app_state = AppState::new(generator, test_config(&[TEST_MODEL]));
    app_state.relay = relay;
    app(Arc::new(RwLock::new(app_state)))
}

/// Creates a ready test application router backed by `generator`.
pub fn test_app(generator: Arc<FakeGenerator>) -> Router {
    test_app_in_state(
        generator,
        RelayState::Ready {
            model: TEST_MODEL.to_string(),
        },
    )
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
