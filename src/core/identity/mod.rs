pub mod key;
pub mod types;

pub use key::derive_storage_key;
pub use types::{IdentityClaims, ImageAngle, StorageKey, ENROLLMENT_IMAGE_COUNT};
