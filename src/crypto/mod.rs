//! # Cryptography Module
//!
//! All cryptographic primitives used by Hush Core.
//!
//! ## Hybrid Scheme
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    PER USER (once, at signup)                   │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  RSA-2048 keypair (OAEP, SHA-256)                              │   │
//! │  │    • public  → server, other users                             │   │
//! │  │    • private → KeyStore (non-extractable handle)               │   │
//! │  │              → optional PBKDF2 + AES-GCM backup file            │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              PER CONVERSATION (once, by first sender)           │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  AES-256 conversation key K                                    │   │
//! │  │    • wrapped with RSA-OAEP under each participant's public key │   │
//! │  │    • unwrapped by each participant with their private handle   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    PER MESSAGE / MEDIA BLOB                     │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  AES-256-GCM(K, random 96-bit nonce, bytes)                    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | RSA-OAEP-SHA256 | Conversation key wrapping |
//! | AES-256-GCM | Messages, media, key backups |
//! | PBKDF2-HMAC-SHA256 | Backup key from password |
//! | SHA-256 | Salt/IV derivation, key fingerprints |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Conversation keys, exported private keys and
//!    password-derived keys are zeroized when dropped
//! 2. **Capabilities, not bytes**: Imported private keys expose decrypt only
//! 3. **Secure Random**: `rand::rngs::OsRng` for keys, nonces and OAEP
//! 4. **No Key Rotation**: A conversation keeps its first key for its lifetime

mod cipher;
pub(crate) mod encoding;
mod keys;
mod password;
mod symmetric;
mod wrapping;

pub use cipher::{decrypt, encrypt, EncryptedPayload, OutputKind, Plaintext, NONCE_SIZE, TAG_SIZE};
pub use keys::{
    generate_key_pair, import_private_key_non_extractable, AsymmetricKeyPair, ExportedPrivateKey,
    ExportedPublicKey, PrivateKeyHandle, RecipientPublicKey, RsaPrivateKeyHandle,
    MIN_RSA_MODULUS_BITS, RSA_MODULUS_BITS,
};
pub use password::{
    backup_file_name, PasswordDerivedKey, PasswordKeyProtection, PasswordProtectedKeyBlob,
    BACKUP_FILE_EXTENSION, MIN_PBKDF2_ITERATIONS,
};
pub use symmetric::{generate_conversation_key, ConversationKey, CONVERSATION_KEY_SIZE};
pub use wrapping::{
    entry_for, unwrap_key, wrap_for_participants, wrap_key, Participant, WrappedKeyEntry,
};

#[cfg(test)]
pub(crate) use keys::tests as fixtures;
