//! Router for the content API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::{AppState, RelayState};

type SharedState = Arc<RwLock<AppState>>;

/// Forward a question to the active model and return the generated
/// text
async fn content_handler(
    State(state): State<SharedState>,
    payload: Result<Json<public::ContentRequest>, JsonRejection>,
) -> Result<Json<public::ContentResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e.body_text())))?;
    let question = payload.question()?;

    let (model, generator) = {
        let shared_state = state
            .read()
            .map_err(|_| ApiError::Internal("Unable to read shared state".to_string()))?;
        match &shared_state.relay {
            RelayState::Ready { model } => (model.clone(), Arc::clone(&shared_state.generator)),
            RelayState::Uninitialized | RelayState::Selecting => {
                return Err(ApiError::NotReady(
                    "Model selection in progress, retry shortly".to_string(),
                ));
            }
            RelayState::Fatal { reason } => {
                return Err(ApiError::NotReady(format!("No model available: {}", reason)));
            }
        }
    };

    tracing::debug!("Generating content with model {}", model);
    let result = generator.generate(&model, question).await?;

    Ok(Json(public::ContentResponse { result }))
}

/// Create the content router
pub fn router() -> Router<SharedState> {
    Router::new().route("/content", post(content_handler))
}
