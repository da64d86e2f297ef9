use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON body returned for every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Short, static description of the failure ("error" for unexpected failures)
    pub message: String,
    /// Underlying error text for unexpected failures
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn unexpected(error: impl Into<String>) -> Self {
        Self {
            message: "error".to_string(),
            error: Some(error.into()),
        }
    }
}
