//! S3-compatible object storage.
//!
//! This crate provides:
//! - An object-storage client (delete, existence checks, connectivity)
//! - Mapping from public artifact URLs back to object keys
//! - The best-effort [`FileRemover`] used when a stage supersedes a file

pub mod client;
pub mod error;
pub mod keys;
pub mod remover;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::key_from_url;
pub use remover::{FileRemover, NoopRemover};
