//! Common test infrastructure module
//!
//! Shared mock store and spawn helpers used across integration tests.

#![allow(dead_code)]


// Re-export commonly used items at module level
pub use mock_store::{spawn_store, spawn_store_with_token, MockStore, StoreHarness};
