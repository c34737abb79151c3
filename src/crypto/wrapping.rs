//! # Key Wrapping (RSA-OAEP-SHA256)
//!
//! A conversation key is wrapped once per participant, under that
//! participant's public key, and unwrapped by each participant with their own
//! non-extractable private key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CONVERSATION SETUP                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ConversationKey K (32 bytes)                                          │
//! │         │                                                               │
//! │         ├──► RSA-OAEP(pub_A, K) ──► WrappedKeyEntry { A, .. }           │
//! │         ├──► RSA-OAEP(pub_B, K) ──► WrappedKeyEntry { B, .. }           │
//! │         └──► RSA-OAEP(pub_C, K) ──► WrappedKeyEntry { C, .. }           │
//! │                                                                         │
//! │   Receiver B:  unwrap(entry_B, priv_B) ──► K                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The asymmetric operation is paid once per (conversation, participant)
//! pair. Wrapping is bounded by the OAEP plaintext ceiling and is never used
//! on message content.

use std::collections::HashSet;

use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::encoding::base64_bytes;
use super::keys::{PrivateKeyHandle, RecipientPublicKey};
use super::symmetric::ConversationKey;
use crate::error::{Error, Result};

/// A conversation key wrapped for one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyEntry {
    /// The participant able to unwrap this entry
    pub user_id: String,
    /// RSA-OAEP ciphertext of the raw conversation key
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
}

/// A conversation participant as seen by the wrapping side
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant's user id
    pub user_id: String,
    /// Participant's published public key
    pub public_key: RecipientPublicKey,
}

impl Participant {
    /// Create a participant entry
    pub fn new(user_id: impl Into<String>, public_key: RecipientPublicKey) -> Self {
        Self {
            user_id: user_id.into(),
            public_key,
        }
    }
}

/// Wrap raw key bytes under a recipient's public key
///
/// Fails with `WrapFailed` if the payload exceeds the OAEP ceiling for this
/// modulus.
pub fn wrap_key(key_material: &[u8], recipient: &RecipientPublicKey) -> Result<Vec<u8>> {
    let limit = recipient.max_wrap_payload();
    if key_material.len() > limit {
        return Err(Error::WrapFailed(format!(
            "Payload of {} bytes exceeds the {} byte limit for a {} bit key",
            key_material.len(),
            limit,
            recipient.modulus_bits()
        )));
    }

    recipient
        .rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key_material)
        .map_err(|e| Error::WrapFailed(e.to_string()))
}

/// Unwrap a conversation key with the owner's private key handle
///
/// Fails with `UnwrapFailed` on corrupt ciphertext or a key mismatch. Callers
/// treat this as "cannot decrypt this conversation", not as fatal.
pub fn unwrap_key(wrapped: &[u8], owner: &dyn PrivateKeyHandle) -> Result<ConversationKey> {
    let material = owner.decrypt(wrapped).map_err(|e| match e {
        Error::DecryptionFailed(msg) => Error::UnwrapFailed(msg),
        other => other,
    })?;

    ConversationKey::from_slice(&material)
        .map_err(|_| Error::UnwrapFailed("Unwrapped material is not a conversation key".into()))
}

/// Wrap a conversation key for every participant
///
/// All-or-nothing: either every participant gets an entry or an error is
/// returned and no entries are produced, so no participant is left without
/// a way to decrypt.
pub fn wrap_for_participants(
    key: &ConversationKey,
    participants: &[Participant],
) -> Result<Vec<WrappedKeyEntry>> {
    if participants.is_empty() {
        return Err(Error::InvalidParticipants("No participants".into()));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !seen.insert(participant.user_id.as_str()) {
            return Err(Error::InvalidParticipants(format!(
                "Duplicate participant {}",
                participant.user_id
            )));
        }
    }

    participants
        .iter()
        .map(|participant| {
            let wrapped_key =
                wrap_key(key.as_bytes(), &participant.public_key).map_err(|e| match e {
                    Error::WrapFailed(msg) => {
                        Error::WrapFailed(format!("{}: {}", participant.user_id, msg))
                    }
                    other => other,
                })?;
            Ok(WrappedKeyEntry {
                user_id: participant.user_id.clone(),
                wrapped_key,
            })
        })
        .collect()
}

/// Find the entry addressed to `user_id`
pub fn entry_for<'a>(entries: &'a [WrappedKeyEntry], user_id: &str) -> Option<&'a WrappedKeyEntry> {
    entries.iter().find(|entry| entry.user_id == user_id)
}

// ============================================================================
// TESTS
// ============================================================================
