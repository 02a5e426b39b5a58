//! High-level API for persisting session credentials.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use std::sync::Arc;

/// Token persistence API over a shared key-value store.
///
/// The vault owns the session's slice of the store (the token keys); the
/// favorites cache lives under its own key and is managed elsewhere.
#[derive(Clone)]
pub struct SessionVault {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionVault {
    /// Create a vault over the given storage backend.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Store the access token
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    /// Retrieve the access token
    pub fn get_access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Store the refresh token
    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Retrieve the refresh token
    pub fn get_refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Store both tokens of a freshly minted session
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) -> StorageResult<()> {
        self.set_access_token(access_token)?;
        self.set_refresh_token(refresh_token)?;
        Ok(())
    }

    /// Check if any persisted credential exists
    pub fn has_tokens(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    /// Erase all persisted credentials
    pub fn clear(&self) -> StorageResult<()> {
        let _ = self.storage.remove(StorageKeys::ACCESS_TOKEN);
        let _ = self.storage.remove(StorageKeys::REFRESH_TOKEN);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn vault() -> SessionVault {
        SessionVault::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_tokens_roundtrip() {
        let vault = vault();
        vault.set_tokens("access-1", "refresh-1").unwrap();
        assert_eq!(
            vault.get_access_token().unwrap(),
            Some("access-1".to_string())
        );
        assert_eq!(
            vault.get_refresh_token().unwrap(),
            Some("refresh-1".to_string())
        );
        assert!(vault.has_tokens().unwrap());
    }

    #[test]
    fn test_clear_erases_both_tokens() {
        let vault = vault();
        vault.set_tokens("access-1", "refresh-1").unwrap();
        vault.clear().unwrap();
        assert_eq!(vault.get_access_token().unwrap(), None);
        assert_eq!(vault.get_refresh_token().unwrap(), None);
        assert!(!vault.has_tokens().unwrap());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let vault = vault();
        vault.clear().unwrap();
        vault.clear().unwrap();
        assert!(!vault.has_tokens().unwrap());
    }

    #[test]
    fn test_access_token_replaced_independently() {
        let vault = vault();
        vault.set_tokens("access-1", "refresh-1").unwrap();
        vault.set_access_token("access-2").unwrap();
        assert_eq!(
            vault.get_access_token().unwrap(),
            Some("access-2".to_string())
        );
        assert_eq!(
            vault.get_refresh_token().unwrap(),
            Some("refresh-1".to_string())
        );
    }
}
