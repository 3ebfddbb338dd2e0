//! Startup model selection.
//!
//! Candidates are tried in order with a small smoke test generation
//! and the first one that answers becomes the model for every request
//! afterwards. If nothing answers the server must not start.
use super::core::Generator;
use crate::core::StartupError;

pub async fn select_model(
    generator: &(dyn Generator + Send + Sync),
    candidates: &[String],
    smoke_test_prompt: &str,
) -> Result<String, StartupError> {
    for candidate in candidates {
        tracing::debug!("Trying model candidate {}", candidate);
        match generator.generate(candidate, smoke_test_prompt).await {
            Ok(_) => {
                tracing::info!("Selected model {}", candidate);
                return Ok(candidate.clone());
            }
            Err(e) => {
                tracing::warn!("Model candidate {} failed: {}", candidate, e);
            }
        }
    }

    Err(StartupError::NoWorkingModel {
        tried: candidates.to_vec(),
    })
}
