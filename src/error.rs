use thiserror::Error;

#[derive(Debug, Error)]
pub enum IllustrationError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The model answered but no image could be extracted from its response.
    #[error("No image produced by the generation model")]
    NoImage,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IllustrationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        IllustrationError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for IllustrationError {
    fn from(e: reqwest::Error) -> Self {
        IllustrationError::RequestError(e.to_string())
    }
}

impl From<serde_json::Error> for IllustrationError {
    fn from(e: serde_json::Error) -> Self {
        IllustrationError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IllustrationError>;
