//! Per-conversation AES-256 keys.
//!
//! One key is minted by whichever participant establishes the conversation.
//! It leaves the minting device only in wrapped form (see `wrapping`), and
//! every participant converges on the same value by unwrapping their own
//! entry.

use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of a conversation key in bytes (256 bits)
pub const CONVERSATION_KEY_SIZE: usize = 32;

/// An AES-256-GCM key shared by all participants of one conversation
///
/// Zeroized when dropped. Never persisted unwrapped.
#[derive(ZeroizeOnDrop)]
pub struct ConversationKey([u8; CONVERSATION_KEY_SIZE]);

impl ConversationKey {
    /// Mint a fresh random key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONVERSATION_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; CONVERSATION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from an unwrapped byte slice, checking its length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; CONVERSATION_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "Conversation key must be {} bytes, got {}",
                CONVERSATION_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw key bytes, for wrapping and cipher construction only
    pub fn as_bytes(&self) -> &[u8; CONVERSATION_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConversationKey(<redacted>)")
    }
}

/// Mint a new conversation key
///
/// Returned in raw form since it must be wrapped for every participant
/// before the first message is sent.
pub fn generate_conversation_key() -> ConversationKey {
    ConversationKey::generate()
}
