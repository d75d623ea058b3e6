//! Low-code database boundary.
//!
//! This crate provides:
//! - The [`DataStore`] trait the orchestration layer reads and writes through
//! - A REST client for a NocoDB-style table API with paginated listing
//! - Row decoding that resolves artifact shapes once, at the boundary
//! - Retry with exponential backoff and request metrics
//! - An in-memory store for local runs and tests

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod rows;
pub mod store;

#[cfg(test)]
mod client_tests;

pub use client::{DataStoreClient, DataStoreConfig};
pub use error::{DataStoreError, DataStoreResult};
pub use memory::InMemoryDataStore;
pub use retry::RetryConfig;
pub use rows::{SceneRow, VideoRow};
pub use store::DataStore;
