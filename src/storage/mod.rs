pub mod enrollment;

pub use enrollment::{EnrollmentStore, StorageError};
