// src/core/identity/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Number of photos making up one enrollment.
pub const ENROLLMENT_IMAGE_COUNT: usize = 5;

/// Claims the identity provider vouches for once a bearer token is verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: Option<String>,
}

impl IdentityClaims {
    /// The verified email, treating an empty claim as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }
}

/// Identifies one enrollee's directory as `<branch>/<folder_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    pub branch: String,
    pub folder_id: String,
}

impl StorageKey {
    pub fn new(branch: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            folder_id: folder_id.into(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.branch).join(&self.folder_id)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.folder_id)
    }
}

/// Head pose of an enrollment photo. Declaration order is the order in which
/// clients submit the photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAngle {
    Frontal,
    Left,
    Right,
    Up,
    Down,
}

impl ImageAngle {
    pub const ALL: [ImageAngle; ENROLLMENT_IMAGE_COUNT] = [
        ImageAngle::Frontal,
        ImageAngle::Left,
        ImageAngle::Right,
        ImageAngle::Up,
        ImageAngle::Down,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ImageAngle::Frontal => "frontal",
            ImageAngle::Left => "left",
            ImageAngle::Right => "right",
            ImageAngle::Up => "up",
            ImageAngle::Down => "down",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.jpg", self.label())
    }
}

impl fmt::Display for ImageAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
