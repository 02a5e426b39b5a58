//! Persistent key-value storage for the storefront client core.
//!
//! This crate provides the storage abstraction shared by the session manager
//! and the favorites reconciler:
//! - [`KeyValueStore`]: the backend trait (string keys, string values)
//! - [`MemoryStore`]: in-process backend for tests and ephemeral embedders
//! - [`JsonFileStore`]: durable single-file backend surviving restarts
//! - [`SessionVault`]: high-level token persistence API

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::JsonFileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
pub use vault::SessionVault;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
