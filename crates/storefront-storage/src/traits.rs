//! Storage trait definitions.

use crate::StorageResult;

/// Trait for key-value storage backends.
///
/// Backends are synchronous: a read-modify-write on a single key completes
/// without suspension, so concurrent logical tasks never observe a
/// half-written value.
pub trait KeyValueStore: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
