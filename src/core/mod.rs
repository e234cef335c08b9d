pub mod identity;
pub mod services;
