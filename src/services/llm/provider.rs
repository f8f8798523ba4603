use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::models::trip_input::ValidationError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Output did not match the expected schema: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Network(err.to_string())
    }
}

/// Progressive structured output. Each item is an immutable snapshot that
/// only ever gains fields or array elements; the last `Ok` item before the
/// stream ends is the terminal value. An `Err` item is terminal.
pub type PartialObjectStream =
    Pin<Box<dyn Stream<Item = Result<Arc<Value>, GenerationError>> + Send>>;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub schema_name: &'static str,
    pub schema: Value,
    pub max_output_tokens: u32,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Start one schema-constrained, streamed generation.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<PartialObjectStream, GenerationError>;
}
