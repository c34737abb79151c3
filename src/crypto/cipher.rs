//! # Message Cipher
//!
//! AES-256-GCM encryption of message payloads under an unwrapped
//! conversation key.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION FLOW                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM-Encrypt(                                        │       │
//! │  │    key = conversation_key,                                  │       │
//! │  │    nonce = random 96 bits,                                  │       │
//! │  │    plaintext = text or media bytes,                         │       │
//! │  │    aad = "hush-message-v1"                                  │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  EncryptedPayload { nonce, ciphertext || tag }              │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  RECIPIENT                                                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM-Decrypt(key, nonce, ciphertext, aad)            │       │
//! │  │           ↓                                                  │       │
//! │  │  Plaintext::Text / Plaintext::Binary  (or DecryptionFailed) │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cipher is content-type agnostic. Text and media are both plain byte
//! buffers here; the caller picks how to interpret the output.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::encoding::{base64_array, base64_bytes};
use super::symmetric::ConversationKey;
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Associated data binding ciphertexts to the message domain
const MESSAGE_AAD: &[u8] = b"hush-message-v1";

/// How decrypted bytes should be handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// UTF-8 text message
    Text,
    /// Raw bytes (audio, image)
    Binary,
}

/// A decrypted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plaintext {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl Plaintext {
    /// View as bytes regardless of kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Plaintext::Text(text) => text.as_bytes(),
            Plaintext::Binary(bytes) => bytes,
        }
    }

    /// The text, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Plaintext::Text(text) => Some(text),
            Plaintext::Binary(_) => None,
        }
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Plaintext::Text(text) => text.into_bytes(),
            Plaintext::Binary(bytes) => bytes,
        }
    }
}

/// Ciphertext of a single message or media blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Random nonce used for this payload
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the GCM tag appended
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Compact framing: `nonce || ciphertext`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the compact framing produced by [`EncryptedPayload::to_bytes`]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::DecryptionFailed(format!(
                "Payload of {} bytes is shorter than nonce and tag",
                data.len()
            )));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        Ok(Self {
            nonce: nonce_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt a message or media blob
///
/// Accepts anything viewable as bytes (`&str`, `String`, `Vec<u8>`, `&[u8]`).
/// A fresh random nonce is drawn for every call.
pub fn encrypt(plaintext: impl AsRef<[u8]>, key: &ConversationKey) -> Result<EncryptedPayload> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ciphertext = seal(key.as_bytes(), &nonce, plaintext.as_ref(), MESSAGE_AAD)?;
    Ok(EncryptedPayload { nonce, ciphertext })
}

/// Decrypt a payload back into text or bytes
///
/// ## Errors
///
/// Returns `DecryptionFailed` if:
/// - The ciphertext or nonce was tampered with
/// - The key is wrong
/// - `OutputKind::Text` was requested and the bytes are not UTF-8
pub fn decrypt(
    payload: &EncryptedPayload,
    key: &ConversationKey,
    kind: OutputKind,
) -> Result<Plaintext> {
    let bytes = open(key.as_bytes(), &payload.nonce, &payload.ciphertext, MESSAGE_AAD)?;

    match kind {
        OutputKind::Binary => Ok(Plaintext::Binary(bytes)),
        OutputKind::Text => String::from_utf8(bytes)
            .map(Plaintext::Text)
            .map_err(|_| Error::DecryptionFailed("Decrypted bytes are not valid UTF-8".into())),
    }
}

/// AES-256-GCM encrypt with an explicit nonce
pub(crate) fn seal(
    key: &[u8; 32],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .encrypt(
            AesNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))
}

/// AES-256-GCM decrypt with an explicit nonce
pub(crate) fn open(
    key: &[u8; 32],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(
            AesNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| {
            Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
        })
}

// ============================================================================
// TESTS
// ============================================================================
