//! # Hush Core
//!
//! End-to-end encryption core for a chat client: per-user RSA identities,
//! per-conversation AES keys, encrypted messages and media, and
//! password-protected private-key backups for device migration.
//!
//! The server only ever sees public keys, wrapped conversation keys and
//! ciphertext.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           HUSH CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐           ┌────────────────────────────────────────┐   │
//! │  │  Identity   │ Principal │                Session                 │   │
//! │  │             │──────────►│                                        │   │
//! │  │ - Signup    │           │ - establish / open conversation        │   │
//! │  │ - Restore   │           │ - encrypt / decrypt / read message     │   │
//! │  │ - Load      │           │ - conversation key cache (memory only) │   │
//! │  └──────┬──────┘           └────────────────────┬───────────────────┘   │
//! │         │                                       │                       │
//! │         ▼                                       ▼                       │
//! │  ┌─────────────┐           ┌────────────────────────────────────────┐   │
//! │  │   Storage   │           │                 Crypto                 │   │
//! │  │             │           │                                        │   │
//! │  │ - KeyStore  │◄──────────│ - RSA-OAEP keypairs, key wrapping      │   │
//! │  │ - handles   │           │ - AES-256-GCM cipher                   │   │
//! │  │   only      │           │ - PBKDF2 password backups              │   │
//! │  └─────────────┘           └────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Keys, wrapping, message cipher and password backups
//! - [`storage`] - Private-key handle storage
//! - [`identity`] - Signup, restore and lookup of the acting user
//! - [`session`] - Per-device conversation state
//!
//! ## Message Lifecycle
//!
//! ```text
//! Alice                               Server                          Bob
//!   │                                   │                               │
//!   │  establish_conversation           │                               │
//!   │  (K wrapped for Alice and Bob) ──►│  stores wrapped entries       │
//!   │                                   │                               │
//!   │  encrypt_message(K, "hello") ────►│  stores {nonce, ciphertext}   │
//!   │                                   │                               │
//!   │                                   │──► wrapped entries ──────────►│ open_conversation
//!   │                                   │──► {nonce, ciphertext} ──────►│ decrypt_message
//!   │                                   │                               │ → "hello"
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod identity;
pub mod session;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{
    ConversationKey, EncryptedPayload, OutputKind, Participant, Plaintext, RecipientPublicKey,
    WrappedKeyEntry,
};
pub use error::{Error, Result};
pub use identity::{Identity, Principal};
pub use session::{EstablishedConversation, MessageState, Session};
pub use storage::{KeyStore, MemoryKeyStore};

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tunable parameters for Hush Core
///
/// Defaults match the deployed client. Both values are floors as well as
/// defaults: [`CoreConfig::validate`] rejects anything weaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// RSA modulus size for new identities
    pub rsa_modulus_bits: usize,
    /// PBKDF2 iteration count for key backups
    pub pbkdf2_iterations: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: crypto::RSA_MODULUS_BITS,
            pbkdf2_iterations: crypto::MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl CoreConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults
    ///
    /// ## Example
    ///
    /// ```
    /// use hush_core::CoreConfig;
    ///
    /// let config = CoreConfig::from_json(r#"{ "pbkdf2Iterations": 200000 }"#).unwrap();
    /// assert_eq!(config.pbkdf2_iterations, 200_000);
    /// assert_eq!(config.rsa_modulus_bits, 2048);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameters weaker than the supported minimums
    pub fn validate(&self) -> Result<()> {
        if self.rsa_modulus_bits < crypto::MIN_RSA_MODULUS_BITS {
            return Err(Error::InvalidConfig(format!(
                "RSA modulus must be at least {} bits, got {}",
                crypto::MIN_RSA_MODULUS_BITS,
                self.rsa_modulus_bits
            )));
        }
        if self.pbkdf2_iterations < crypto::MIN_PBKDF2_ITERATIONS {
            return Err(Error::InvalidConfig(format!(
                "PBKDF2 iterations must be at least {}, got {}",
                crypto::MIN_PBKDF2_ITERATIONS,
                self.pbkdf2_iterations
            )));
        }
        Ok(())
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Hush Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
