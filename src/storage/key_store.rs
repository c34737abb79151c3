//! # Key Store
//!
//! Persistent home of each user's non-extractable private-key handle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY STORE CONTRACT                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  put(user_id, handle)    - Store (or replace) the user's key handle     │
//! │  get(user_id)            - Handle, or None if no key is stored          │
//! │  delete(user_id)         - The only way to invalidate a stored key      │
//! │                                                                         │
//! │  Values are capability objects. A store never sees, serializes or       │
//! │  returns raw private-key bytes.                                         │
//! │                                                                         │
//! │  Browser builds back this with IndexedDB holding WebCrypto keys with    │
//! │  `extractable: false`; native builds with the platform keychain.        │
//! │  `MemoryKeyStore` is the in-process implementation.                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::crypto::PrivateKeyHandle;
use crate::error::Result;

/// Shared, read-only private-key capability
pub type SharedKeyHandle = Arc<dyn PrivateKeyHandle>;

/// Opaque persistent store of private-key handles, addressed by user id
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store the handle for `user_id`, replacing any previous one
    async fn put(&self, user_id: &str, handle: SharedKeyHandle) -> Result<()>;

    /// Fetch the handle for `user_id`
    async fn get(&self, user_id: &str) -> Result<Option<SharedKeyHandle>>;

    /// Remove the handle for `user_id`; returns whether one existed
    async fn delete(&self, user_id: &str) -> Result<bool>;

    /// Check whether a handle exists for `user_id`
    async fn contains(&self, user_id: &str) -> Result<bool> {
        Ok(self.get(user_id).await?.is_some())
    }
}

/// In-memory key store
///
/// Handles live for the lifetime of the process.
#[derive(Default)]
pub struct MemoryKeyStore {
    handles: RwLock<HashMap<String, SharedKeyHandle>>,
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored handles
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn put(&self, user_id: &str, handle: SharedKeyHandle) -> Result<()> {
        let replaced = self
            .handles
            .write()
            .insert(user_id.to_string(), handle)
            .is_some();
        tracing::debug!(user_id, replaced, "Stored private key handle");
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<SharedKeyHandle>> {
        Ok(self.handles.read().get(user_id).cloned())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let removed = self.handles.write().remove(user_id).is_some();
        tracing::debug!(user_id, removed, "Deleted private key handle");
        Ok(removed)
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("handles", &self.len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
