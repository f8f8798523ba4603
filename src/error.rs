use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::models::trip_input::ValidationError;
use crate::services::coalescer::CoalesceError;
use crate::services::llm::GenerationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Generation failed: {0}")]
    Generation(GenerationError),
    #[error("Storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.0)
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(v) => ApiError::BadRequest(v.0),
            other => ApiError::Generation(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(what),
            StoreError::Conflict(message) => ApiError::Conflict(message),
            StoreError::Backend(message) => ApiError::Storage(message),
        }
    }
}

/// Message safe to show a visitor. Credentials and provider bodies stay in
/// the log.
pub fn public_generation_message(err: &GenerationError) -> String {
    match err {
        GenerationError::Validation(v) => v.0.clone(),
        GenerationError::Configuration(_) => {
            "Trip suggestions are unavailable right now".to_string()
        }
        GenerationError::Provider { .. } | GenerationError::Network(_) => {
            "Failed to generate suggestions. Please try again.".to_string()
        }
        GenerationError::Schema(_) => {
            "The generated plan was incomplete. Please try again.".to_string()
        }
    }
}

pub fn public_coalesce_message(err: &CoalesceError<GenerationError>) -> String {
    match err {
        CoalesceError::Failed(inner) => public_generation_message(inner),
        CoalesceError::Cancelled => "This search was replaced by a newer one".to_string(),
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Generation(GenerationError::Configuration(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Generation(err) => {
                error!("Generation error: {}", err);
                public_generation_message(err)
            }
            ApiError::Storage(err) => {
                error!("Storage error: {}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(StoreError::NotFound("Wishlist")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(GenerationError::Configuration("missing key".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(GenerationError::Validation(ValidationError::new("bad"))).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_public_messages_hide_details() {
        let message = public_generation_message(&GenerationError::Provider {
            status: 401,
            body: "invalid api key sk-123".to_string(),
        });
        assert!(!message.contains("sk-123"));
        let message =
            public_generation_message(&GenerationError::Configuration("OPENAI_API_KEY".into()));
        assert!(!message.contains("OPENAI_API_KEY"));
    }
}
