#[path = "../common/mod.rs"]
mod common;

mod enrollment_tests;
mod startup_tests;
