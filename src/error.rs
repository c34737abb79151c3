//! # Error Handling
//!
//! Error types for Hush Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                      │
//! │  │                                                                      │
//! │  ├── Configuration Errors                                               │
//! │  │   └── InvalidConfig         - Rejected key size / iteration count    │
//! │  │                                                                      │
//! │  ├── Identity Errors                                                    │
//! │  │   ├── KeyGenerationFailed   - RSA keypair could not be generated     │
//! │  │   └── KeyImportFailed       - Malformed exported key material        │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                      │
//! │  │   ├── WrapFailed            - Key wrap under a public key failed     │
//! │  │   ├── UnwrapFailed          - Wrapped key could not be recovered     │
//! │  │   ├── EncryptionFailed      - AES-GCM encryption failed              │
//! │  │   ├── DecryptionFailed      - Corrupt payload or wrong key           │
//! │  │   └── InvalidKey            - Wrong key length / format              │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                     │
//! │  │   ├── StorageReadError      - Key store read failed                  │
//! │  │   └── StorageWriteError     - Key store write failed                 │
//! │  │                                                                      │
//! │  ├── Conversation Errors                                                │
//! │  │   ├── InvalidParticipants   - Bad participant list                   │
//! │  │   ├── NoWrappedKey          - No wrapped key entry for this user     │
//! │  │   ├── ConversationKeyUnavailable - Key not unwrapped this session    │
//! │  │   └── ConversationAlreadyEstablished - Key already live for this id  │
//! │  │                                                                      │
//! │  └── Internal Errors                                                    │
//! │      ├── SerializationError    - serde failure                          │
//! │      └── Internal              - Should not happen                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handling Policy
//!
//! Nothing in this crate fails silently. Every primitive failure is mapped to
//! one of the variants above and returned to the caller, who decides how to
//! present it:
//!
//! | Variant | Caller reaction |
//! |---------|-----------------|
//! | `KeyGenerationFailed` | Abort signup, offer "try again" |
//! | `KeyImportFailed` / `WrapFailed` / `UnwrapFailed` | "Cannot secure this conversation" |
//! | `DecryptionFailed` | Render the single message as undecryptable |
//!
//! A wrong backup password is not an error at all: restoring returns `None`.

use thiserror::Error;

/// Result type alias for Hush Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Hush Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors (100-199)
    // ========================================================================

    /// Configuration value outside the allowed range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================

    /// The crypto provider could not generate a keypair
    #[error("Failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    /// Exported key material could not be imported
    #[error("Failed to import key: {0}")]
    KeyImportFailed(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Wrapping a conversation key under a public key failed
    #[error("Key wrap failed: {0}")]
    WrapFailed(String),

    /// Unwrapping a conversation key with a private key failed
    #[error("Key unwrap failed: {0}")]
    UnwrapFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Failed to read from the key store
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to the key store
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    // ========================================================================
    // Conversation Errors (700-799)
    // ========================================================================

    /// Participant list is empty, has duplicates, or misstates the acting user
    #[error("Invalid participants: {0}")]
    InvalidParticipants(String),

    /// The conversation has no wrapped key for the given user
    #[error("No wrapped key for user {0}")]
    NoWrappedKey(String),

    /// The conversation key has not been unwrapped in this session
    #[error("Conversation key unavailable for {0}")]
    ConversationKeyUnavailable(String),

    /// A key is already live for this conversation id
    #[error("Conversation already established: {0}")]
    ConversationAlreadyEstablished(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code for the UI boundary
    ///
    /// Error codes are organized by category:
    /// - 100-199: Configuration
    /// - 200-299: Identity
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 700-799: Conversation
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Configuration (100-199)
            Error::InvalidConfig(_) => 100,

            // Identity (200-299)
            Error::KeyGenerationFailed(_) => 200,
            Error::KeyImportFailed(_) => 201,

            // Crypto (300-399)
            Error::WrapFailed(_) => 300,
            Error::UnwrapFailed(_) => 301,
            Error::EncryptionFailed(_) => 302,
            Error::DecryptionFailed(_) => 303,
            Error::InvalidKey(_) => 304,

            // Storage (400-499)
            Error::StorageReadError(_) => 400,
            Error::StorageWriteError(_) => 401,

            // Conversation (700-799)
            Error::InvalidParticipants(_) => 700,
            Error::NoWrappedKey(_) => 701,
            Error::ConversationKeyUnavailable(_) => 702,
            Error::ConversationAlreadyEstablished(_) => 703,

            // Internal (900-999)
            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Check if this error is recoverable locally
    ///
    /// Recoverable errors affect a single message or a single participant
    /// and must not abort the surrounding flow.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnwrapFailed(_)
                | Error::DecryptionFailed(_)
                | Error::NoWrappedKey(_)
                | Error::ConversationKeyUnavailable(_)
        )
    }

    /// Check if this error requires user action
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::KeyGenerationFailed(_) | Error::ConversationKeyUnavailable(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Background task failed: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
