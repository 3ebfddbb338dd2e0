//! Public types for the content API
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::public::ApiError;

#[derive(Deserialize, Debug)]
pub struct ContentRequest {
    // Any JSON value, checked by `question()`
    pub question: Option<Value>,
}

impl ContentRequest {
    pub fn question(&self) -> Result<&str, ApiError> {
        match &self.question {
            Some(Value::String(q)) if !q.trim().is_empty() => Ok(q.as_str()),
            Some(Value::String(_)) => Err(ApiError::Validation(
                "Question must not be empty".to_string(),
            )),
            Some(_) => Err(ApiError::Validation(
                "Question must be a string".to_string(),
            )),
            None => Err(ApiError::Validation("Question is required".to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ContentResponse {
    pub result: String,
}
