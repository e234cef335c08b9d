// src/api/types.rs
use serde::{Deserialize, Serialize};

use crate::core::services::enrollment::EnrollmentReceipt;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub status: String,
    pub message: String,
    pub path: String,
}

impl From<&EnrollmentReceipt> for EnrollmentResponse {
    fn from(receipt: &EnrollmentReceipt) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: receipt.message(),
            path: receipt.directory.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
