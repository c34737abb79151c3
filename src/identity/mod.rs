//! # Identity Module
//!
//! Signup, device restore and lookup of a user's private key.
//!
//! ## Identity Creation Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      IDENTITY CREATION (SIGNUP)                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Identity::create(user_id, store, config)                              │
//! │         │                                                               │
//! │         ├──► generate RSA keypair (background thread)                   │
//! │         │                                                               │
//! │         ├──► import private half as non-extractable handle              │
//! │         │                                                               │
//! │         ├──► store.put(user_id, handle)                                 │
//! │         │                                                               │
//! │         └──► return (Principal, AsymmetricKeyPair)                      │
//! │                         │              │                                │
//! │                         │              ├── public_key → server          │
//! │                         │              └── private_key → optional       │
//! │                         │                  password backup, then drop   │
//! │                         ▼                                               │
//! │                  passed explicitly into Session                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Restore Flow (new device)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backup file + password                                                 │
//! │         │                                                               │
//! │         ├──► decrypt_private_key_for_restore ── None ──► "wrong         │
//! │         │                                                password"      │
//! │         └──► Some(key) ──► import ──► store.put ──► Principal           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::{
    generate_key_pair, import_private_key_non_extractable, AsymmetricKeyPair,
    PasswordKeyProtection, PasswordProtectedKeyBlob, PrivateKeyHandle, RecipientPublicKey,
};
use crate::error::Result;
use crate::storage::{KeyStore, SharedKeyHandle};
use crate::CoreConfig;

/// The acting user: id plus their private-key capability
///
/// Threaded explicitly into every operation that needs "the current user".
#[derive(Clone)]
pub struct Principal {
    user_id: String,
    key: SharedKeyHandle,
}

impl Principal {
    /// Create a principal from a user id and key handle
    pub fn new(user_id: impl Into<String>, key: SharedKeyHandle) -> Self {
        Self {
            user_id: user_id.into(),
            key,
        }
    }

    /// The user's id
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The user's private-key capability
    pub fn key(&self) -> &dyn PrivateKeyHandle {
        self.key.as_ref()
    }

    /// The user's public key, derived from the handle
    pub fn public_key(&self) -> RecipientPublicKey {
        self.key.public_key()
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Identity lifecycle operations against a key store
pub struct Identity;

impl Identity {
    /// Create a new identity for `user_id`
    ///
    /// Generates a keypair off the async executor, stores the private half as
    /// a non-extractable handle and returns the principal together with the
    /// exportable keypair. The caller publishes `public_key` and may create a
    /// password backup from `private_key` before dropping it.
    pub async fn create(
        user_id: &str,
        store: &dyn KeyStore,
        config: &CoreConfig,
    ) -> Result<(Principal, AsymmetricKeyPair)> {
        config.validate()?;

        let bits = config.rsa_modulus_bits;
        let keypair = tokio::task::spawn_blocking(move || generate_key_pair(bits)).await??;

        let handle: SharedKeyHandle =
            Arc::new(import_private_key_non_extractable(&keypair.private_key)?);
        store.put(user_id, Arc::clone(&handle)).await?;

        tracing::info!(user_id, modulus_bits = bits, "Created identity");
        Ok((Principal::new(user_id, handle), keypair))
    }

    /// Restore an identity on a new device from a password-protected backup
    ///
    /// Returns `Ok(None)` when the password is wrong (or the blob is not a
    /// backup), so the caller can prompt again.
    pub async fn restore_from_backup(
        user_id: &str,
        blob: &PasswordProtectedKeyBlob,
        password: &str,
        store: &dyn KeyStore,
        config: &CoreConfig,
    ) -> Result<Option<Principal>> {
        let protection = PasswordKeyProtection::from_config(config)?;

        // PBKDF2 runs off the async executor, like key generation
        let blob = blob.clone();
        let password = Zeroizing::new(password.to_owned());
        let restored = tokio::task::spawn_blocking(move || {
            protection.decrypt_private_key_for_restore(&blob, &password)
        })
        .await?;

        let material = match restored {
            Some(material) => material,
            None => {
                tracing::warn!(user_id, "Backup restore failed");
                return Ok(None);
            }
        };

        let handle: SharedKeyHandle = Arc::new(import_private_key_non_extractable(&material)?);
        store.put(user_id, Arc::clone(&handle)).await?;

        tracing::info!(user_id, "Restored identity from backup");
        Ok(Some(Principal::new(user_id, handle)))
    }

    /// Load the principal for `user_id` from the store
    pub async fn load(user_id: &str, store: &dyn KeyStore) -> Result<Option<Principal>> {
        Ok(store
            .get(user_id)
            .await?
            .map(|handle| Principal::new(user_id, handle)))
    }

    /// Remove the stored key for `user_id`
    ///
    /// Existing principals keep working until dropped; new loads fail.
    pub async fn remove(user_id: &str, store: &dyn KeyStore) -> Result<bool> {
        let removed = store.delete(user_id).await?;
        if removed {
            tracing::info!(user_id, "Removed identity");
        }
        Ok(removed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
