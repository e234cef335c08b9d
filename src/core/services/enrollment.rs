// src/core/services/enrollment.rs
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    core::{
        identity::{derive_storage_key, StorageKey, ENROLLMENT_IMAGE_COUNT},
        services::verification::TokenVerifier,
    },
    storage::EnrollmentStore,
    utils::error::EnrollmentError,
};

const BEARER_PREFIX: &str = "Bearer ";

/// An authenticated enrollee whose directory already exists.
#[derive(Debug, Clone)]
pub struct EnrollmentTarget {
    pub email: String,
    pub key: StorageKey,
    pub directory: PathBuf,
}

/// Outcome of a fully stored enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentReceipt {
    pub key: StorageKey,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

impl EnrollmentReceipt {
    pub fn message(&self) -> String {
        format!(
            "Enrollment saved for {} under branch {}",
            self.key.folder_id, self.key.branch
        )
    }
}

/// Returns the token carried by an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, EnrollmentError> {
    header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .ok_or_else(EnrollmentError::missing_token)
}

/// Pulls the photo list out of an enrollment body.
pub fn parse_images(body: &[u8]) -> Result<Vec<String>, EnrollmentError> {
    let document: Value = serde_json::from_slice(body)
        .map_err(|e| EnrollmentError::Validation(format!("invalid JSON body: {}", e)))?;

    let images = match document.get("images") {
        None | Some(Value::Null) => return Err(EnrollmentError::missing_images()),
        Some(Value::Array(images)) => images,
        Some(_) => return Err(EnrollmentError::Validation("images must be an array".into())),
    };

    if images.len() != ENROLLMENT_IMAGE_COUNT {
        return Err(EnrollmentError::wrong_image_count(ENROLLMENT_IMAGE_COUNT, images.len()));
    }

    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            image
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| EnrollmentError::Validation(format!("image {} is not a string", i)))
        })
        .collect()
}

pub struct EnrollmentService {
    verifier: Arc<dyn TokenVerifier>,
    store: EnrollmentStore,
}

impl EnrollmentService {
    pub fn new(verifier: Arc<dyn TokenVerifier>, store: EnrollmentStore) -> Self {
        Self { verifier, store }
    }

    /// Authenticates the caller and provisions their enrollment directory.
    ///
    /// The directory is created before the body is looked at, so a request
    /// rejected later for a bad payload still leaves it behind.
    pub async fn prepare(&self, authorization: Option<&str>) -> Result<EnrollmentTarget, EnrollmentError> {
        let token = extract_bearer_token(authorization)?;

        let claims = self.verifier.verify(token).await.map_err(|e| {
            warn!(error = %e, "Token verification failed");
            EnrollmentError::authentication_failed(e)
        })?;
        let email = claims.email().ok_or_else(|| {
            warn!(uid = %claims.uid, "Verified token carries no email");
            EnrollmentError::no_email()
        })?;

        let key = derive_storage_key(email);
        info!(email = %email, branch = %key.branch, folder = %key.folder_id, "Enrollment request");

        let directory = self.store.provision(&key).await?;

        Ok(EnrollmentTarget {
            email: email.to_string(),
            key,
            directory,
        })
    }

    /// Validates the body and writes the photos into the prepared directory.
    pub async fn complete(&self, target: EnrollmentTarget, body: &[u8]) -> Result<EnrollmentReceipt, EnrollmentError> {
        let images = parse_images(body)?;
        let files = self.store.write_image_set(&target.directory, &images).await?;

        info!(
            email = %target.email,
            folder = %target.key.folder_id,
            directory = %target.directory.display(),
            count = files.len(),
            "Saved enrollment images"
        );

        Ok(EnrollmentReceipt {
            key: target.key,
            directory: target.directory,
            files,
        })
    }

    pub async fn enroll(&self, authorization: Option<&str>, body: &[u8]) -> Result<EnrollmentReceipt, EnrollmentError> {
        let target = self.prepare(authorization).await?;
        self.complete(target, body).await
    }
}
