use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::error::StartupError;

pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL_CANDIDATES: &str = "gemini-2.0-flash,gemini-1.5-flash,gemini-1.5-pro";
pub const DEFAULT_RELAY_URL: &str = "http://localhost:8000/api/content";

/// Configuration for the relay server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini_api_hostname: String,
    pub gemini_api_key: String,
    pub model_candidates: Vec<String>,
    pub smoke_test_prompt: String,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Read the server configuration from the environment. The API
    /// key is the only required value.
    pub fn from_env() -> Result<Self, StartupError> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| StartupError::MissingCredential("GEMINI_API_KEY".to_string()))?;
        let gemini_api_hostname =
            env::var("RELAYCHAT_GEMINI_HOST").unwrap_or_else(|_| DEFAULT_GEMINI_HOST.to_string());
        let model_candidates = split_list(
            &env::var("RELAYCHAT_MODEL_CANDIDATES")
                .unwrap_or_else(|_| DEFAULT_MODEL_CANDIDATES.to_string()),
        );
        let smoke_test_prompt =
            env::var("RELAYCHAT_SMOKE_TEST_PROMPT").unwrap_or_else(|_| "Hello".to_string());
        let allowed_origins = split_list(
            &env::var("RELAYCHAT_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        Ok(Self {
            gemini_api_hostname,
            gemini_api_key,
            model_candidates,
            smoke_test_prompt,
            allowed_origins,
        })
    }
}

/// Configuration for the terminal chat client and history commands.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub storage_path: PathBuf,
    pub relay_url: String,
    pub relay_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let storage_path =
            PathBuf::from(env::var("RELAYCHAT_STORAGE_PATH").unwrap_or("./".to_string()));
        let relay_url =
            env::var("RELAYCHAT_RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string());
        let relay_timeout = env::var("RELAYCHAT_RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        Self {
            storage_path,
            relay_url,
            relay_timeout,
        }
    }
}

// Comma separated, blanks dropped, order kept
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_split_list_keeps_order_and_drops_blanks() {
        assert_eq!(
            split_list(" gemini-a, ,gemini-b,,gemini-c "),
            vec!["gemini-a", "gemini-b", "gemini-c"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    #[serial]
    fn test_missing_api_key_is_a_startup_error() {
        // SAFETY: tests touching the environment are serialized
        unsafe { env::remove_var("GEMINI_API_KEY") };
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, StartupError::MissingCredential(ref name) if name == "GEMINI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-key");
            env::remove_var("RELAYCHAT_MODEL_CANDIDATES");
            env::remove_var("RELAYCHAT_ALLOWED_ORIGINS");
        }
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.gemini_api_key, "test-key");
        assert_eq!(
            config.model_candidates,
            vec!["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"]
        );
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        unsafe { env::remove_var("GEMINI_API_KEY") };
    }
}
