use crate::error::IllustrationError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Server misconfigured: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidBody(_) => "invalid_request_error",
            ApiError::Config(_) => "configuration_error",
            ApiError::NotFound(_) => "not_found_error",
            ApiError::Internal(_) => "api_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let field = match self {
            ApiError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.kind(),
                field,
            },
        })
    }
}

impl From<IllustrationError> for ApiError {
    fn from(e: IllustrationError) -> Self {
        match e {
            IllustrationError::ValidationError { field, message } => {
                ApiError::Validation { field, message }
            }
            IllustrationError::ConfigError(message) => ApiError::Config(message),
            IllustrationError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                ApiError::NotFound(io.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
