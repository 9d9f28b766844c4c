//! Shared fixtures for unit tests
//!
//! Permissive and hostile signature verifiers plus ready-made chain managers.

pub mod test_utils;

pub use test_utils::*;
