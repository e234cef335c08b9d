// src/storage/enrollment.rs
use std::path::{Component, Path, PathBuf};

use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::identity::types::{ImageAngle, StorageKey};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid base64 data for {angle} image: {source}")]
    Decode {
        angle: ImageAngle,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Standard alphabet with padding, tolerant of non-zero trailing bits.
const IMAGE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decodes one submitted image, either a data URL or a bare base64 string.
///
/// For data URLs everything up to and including the first comma is dropped.
/// ASCII whitespace inside the payload is ignored.
pub fn decode_image(angle: ImageAngle, entry: &str) -> Result<Vec<u8>> {
    let payload = entry.split_once(',').map_or(entry, |(_, payload)| payload);
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    IMAGE_ENGINE
        .decode(compact.as_bytes())
        .map_err(|source| StorageError::Decode { angle, source })
}

/// On-disk layout of enrollment photos: `<root>/<branch>/<folder_id>/<angle>.jpg`.
#[derive(Debug, Clone)]
pub struct EnrollmentStore {
    root: PathBuf,
}

impl EnrollmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })?;
        info!(root = %self.root.display(), "Enrollment storage ready");
        Ok(())
    }

    pub fn directory_for(&self, key: &StorageKey) -> Result<PathBuf> {
        check_component(&key.branch)?;
        check_component(&key.folder_id)?;
        Ok(self.root.join(key.relative_path()))
    }

    /// Creates the enrollee directory and any missing parents. Reusing an
    /// existing directory is not an error.
    pub async fn provision(&self, key: &StorageKey) -> Result<PathBuf> {
        let directory = self.directory_for(key)?;
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|source| StorageError::Io {
                path: directory.clone(),
                source,
            })?;
        debug!(directory = %directory.display(), "Provisioned enrollment directory");
        Ok(directory)
    }

    /// Writes one photo, replacing any earlier file for the same angle.
    pub async fn write_image(&self, directory: &Path, angle: ImageAngle, bytes: &[u8]) -> Result<PathBuf> {
        let path = directory.join(angle.file_name());
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), size = bytes.len(), "Wrote enrollment image");
        Ok(path)
    }

    /// Decodes and writes the photos in angle order.
    ///
    /// Stops at the first failure. Photos already written stay on disk.
    pub async fn write_image_set<S: AsRef<str>>(&self, directory: &Path, images: &[S]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(images.len());
        for (angle, entry) in ImageAngle::ALL.into_iter().zip(images) {
            let bytes = decode_image(angle, entry.as_ref())?;
            written.push(self.write_image(directory, angle, &bytes).await?);
        }
        Ok(written)
    }
}

// A key component must stay a single directory level below its parent.
fn check_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Ok(());
    }
    let mut components = Path::new(component).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !component.chars().any(std::path::is_separator) => Ok(()),
        _ => Err(StorageError::InvalidKey(format!(
            "'{component}' is not a single path segment"
        ))),
    }
}
