pub mod enrollment;
pub mod verification;
