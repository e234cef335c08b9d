// src/utils/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Failures of a single enrollment request. The display text is what the
/// caller sees in the `message` field of the error response.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Validation(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EnrollmentError {
    pub fn missing_token() -> Self {
        EnrollmentError::Auth("missing token".into())
    }

    pub fn authentication_failed(detail: impl std::fmt::Display) -> Self {
        EnrollmentError::Auth(format!("authentication failed: {}", detail))
    }

    pub fn no_email() -> Self {
        EnrollmentError::Auth("no email".into())
    }

    pub fn missing_images() -> Self {
        EnrollmentError::Validation("missing images".into())
    }

    pub fn wrong_image_count(expected: usize, actual: usize) -> Self {
        EnrollmentError::Validation(format!("expected {} images, got {}", expected, actual))
    }
}

impl From<crate::storage::StorageError> for EnrollmentError {
    fn from(error: crate::storage::StorageError) -> Self {
        EnrollmentError::Internal(error.to_string())
    }
}
