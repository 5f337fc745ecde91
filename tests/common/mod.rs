//! Common test utilities for podcast-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
