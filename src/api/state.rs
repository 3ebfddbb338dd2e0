use crate::core::AppConfig;
use crate::gemini::SharedGenerator;

/// Lifecycle of the relay. Only `Ready` serves content requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayState {
    Uninitialized,
    Selecting,
    Ready { model: String },
    Fatal { reason: String },
}

pub struct AppState {
    pub relay: RelayState,
    pub generator: SharedGenerator,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(generator: SharedGenerator, config: AppConfig) -> Self {
        Self {
            relay: RelayState::Uninitialized,
            generator,
            config,
        }
    }

    /// The active model, if model selection has finished.
    pub fn active_model(&self) -> Option<&str> {
        match &self.relay {
            RelayState::Ready { model } => Some(model.as_str()),
            _ => None,
        }
    }
}
