use thiserror::Error;

/// Failures that must stop the relay server before it accepts traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("missing required env var {0}")]
    MissingCredential(String),

    #[error("no working model candidate (tried: {})", .tried.join(", "))]
    NoWorkingModel { tried: Vec<String> },
}
