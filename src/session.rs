//! # Session
//!
//! Per-device conversation state for the acting user.
//!
//! A [`Session`] holds the user's [`Principal`] and a memory-only cache of
//! unwrapped conversation keys. Each conversation key is unwrapped at most
//! once per session. Every later encrypt or decrypt reuses the cached key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SESSION LIFECYCLE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  First sender                        Other participants                 │
//! │  ────────────                        ──────────────────                 │
//! │  establish_conversation              open_conversation                  │
//! │    ├── mint K                          ├── find own WrappedKeyEntry     │
//! │    ├── wrap K for everyone             ├── unwrap with Principal key    │
//! │    └── cache K                         └── cache K                      │
//! │                                                                         │
//! │  encrypt_message / decrypt_message / read_message use cached K          │
//! │                                                                         │
//! │  close_conversation(id) drops one key, clear() drops all of them.       │
//! │  Dropping the session zeroizes every cached key.                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crypto::{
    decrypt, encrypt, entry_for, generate_conversation_key, unwrap_key, wrap_for_participants,
    ConversationKey, EncryptedPayload, OutputKind, Participant, Plaintext, WrappedKeyEntry,
};
use crate::error::{Error, Result};
use crate::identity::Principal;

/// Memory-only map of conversation id to unwrapped conversation key
#[derive(Default)]
pub struct ConversationKeyCache {
    keys: RwLock<HashMap<String, Arc<ConversationKey>>>,
}

impl ConversationKeyCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key for a conversation
    pub fn get(&self, conversation_id: &str) -> Option<Arc<ConversationKey>> {
        self.keys.read().get(conversation_id).cloned()
    }

    /// Cache a key unless one is already live for the conversation
    ///
    /// Returns `Err` with the live key when the slot is taken. A cached key is
    /// never replaced; only [`ConversationKeyCache::remove`] frees the slot.
    pub fn insert_if_absent(
        &self,
        conversation_id: &str,
        key: Arc<ConversationKey>,
    ) -> std::result::Result<(), Arc<ConversationKey>> {
        match self.keys.write().entry(conversation_id.to_string()) {
            Entry::Occupied(live) => Err(Arc::clone(live.get())),
            Entry::Vacant(slot) => {
                slot.insert(key);
                Ok(())
            }
        }
    }

    /// Drop the key for a conversation
    pub fn remove(&self, conversation_id: &str) -> bool {
        self.keys.write().remove(conversation_id).is_some()
    }

    /// Whether a key is cached for a conversation
    pub fn contains(&self, conversation_id: &str) -> bool {
        self.keys.read().contains_key(conversation_id)
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Drop every cached key
    pub fn clear(&self) {
        self.keys.write().clear();
    }
}

impl std::fmt::Debug for ConversationKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationKeyCache")
            .field("keys", &self.len())
            .finish()
    }
}

/// Result of establishing a new conversation
#[derive(Debug)]
pub struct EstablishedConversation {
    /// The minted conversation key, already cached in the session
    pub key: Arc<ConversationKey>,
    /// One wrapped entry per participant, to upload to the server
    pub entries: Vec<WrappedKeyEntry>,
}

/// Outcome of reading a stored message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageState {
    /// Message decrypted successfully
    Decrypted(Plaintext),
    /// Message could not be decrypted; show a placeholder
    Undecryptable,
}

impl MessageState {
    /// Whether the message decrypted
    pub fn is_decrypted(&self) -> bool {
        matches!(self, MessageState::Decrypted(_))
    }
}

/// Conversation state for one signed-in user on one device
#[derive(Debug)]
pub struct Session {
    principal: Principal,
    cache: ConversationKeyCache,
}

impl Session {
    /// Start a session for a principal
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            cache: ConversationKeyCache::new(),
        }
    }

    /// The acting user
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The conversation key cache
    pub fn cache(&self) -> &ConversationKeyCache {
        &self.cache
    }

    /// Mint a key for a new conversation and wrap it for every participant
    ///
    /// The acting user must be one of the participants, listed under their
    /// own public key, otherwise they could not reopen the conversation from
    /// another session. Fails with `ConversationAlreadyEstablished` if a key
    /// is already live for `conversation_id`; the live key is left untouched.
    pub fn establish_conversation(
        &self,
        conversation_id: &str,
        participants: &[Participant],
    ) -> Result<EstablishedConversation> {
        let user_id = self.principal.user_id();
        let own = participants
            .iter()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| {
                Error::InvalidParticipants(format!(
                    "{} is not a participant of {}",
                    user_id, conversation_id
                ))
            })?;
        if own.public_key != self.principal.public_key() {
            return Err(Error::InvalidParticipants(format!(
                "{} is listed under a public key that is not theirs",
                user_id
            )));
        }

        if self.cache.contains(conversation_id) {
            return Err(already_established(conversation_id));
        }

        let key = Arc::new(generate_conversation_key());
        let entries = wrap_for_participants(&key, participants)?;

        // Re-checked under the write lock: a concurrent call may have won
        self.cache
            .insert_if_absent(conversation_id, Arc::clone(&key))
            .map_err(|_| already_established(conversation_id))?;

        tracing::debug!(
            conversation_id,
            participants = entries.len(),
            "Established conversation"
        );

        Ok(EstablishedConversation { key, entries })
    }

    /// Unwrap the acting user's entry and cache the conversation key
    ///
    /// A no-op if the key is already cached.
    pub fn open_conversation(
        &self,
        conversation_id: &str,
        entries: &[WrappedKeyEntry],
    ) -> Result<Arc<ConversationKey>> {
        if let Some(key) = self.cache.get(conversation_id) {
            return Ok(key);
        }

        let user_id = self.principal.user_id();
        let entry = entry_for(entries, user_id).ok_or_else(|| {
            Error::NoWrappedKey(format!(
                "No wrapped key for {} in {}",
                user_id, conversation_id
            ))
        })?;

        let key = unwrap_key(&entry.wrapped_key, self.principal.key()).map_err(|e| {
            tracing::warn!(conversation_id, error = %e, "Failed to unwrap conversation key");
            e
        })?;

        let key = Arc::new(key);
        match self.cache.insert_if_absent(conversation_id, Arc::clone(&key)) {
            Ok(()) => {
                tracing::debug!(conversation_id, "Opened conversation");
                Ok(key)
            }
            Err(live) => Ok(live),
        }
    }

    /// Encrypt a message or media blob for a cached conversation
    pub fn encrypt_message(
        &self,
        conversation_id: &str,
        plaintext: impl AsRef<[u8]>,
    ) -> Result<EncryptedPayload> {
        let key = self.cached_key(conversation_id)?;
        encrypt(plaintext, &key)
    }

    /// Decrypt a message or media blob for a cached conversation
    pub fn decrypt_message(
        &self,
        conversation_id: &str,
        payload: &EncryptedPayload,
        kind: OutputKind,
    ) -> Result<Plaintext> {
        let key = self.cached_key(conversation_id)?;
        decrypt(payload, &key, kind)
    }

    /// Decrypt for display, mapping any failure to [`MessageState::Undecryptable`]
    pub fn read_message(
        &self,
        conversation_id: &str,
        payload: &EncryptedPayload,
        kind: OutputKind,
    ) -> MessageState {
        match self.decrypt_message(conversation_id, payload, kind) {
            Ok(plaintext) => MessageState::Decrypted(plaintext),
            Err(e) => {
                tracing::debug!(conversation_id, error = %e, "Message undecryptable");
                MessageState::Undecryptable
            }
        }
    }

    /// Drop the cached key for one conversation
    pub fn close_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.cache.remove(conversation_id);
        tracing::debug!(conversation_id, removed, "Closed conversation");
        removed
    }

    /// Drop every cached conversation key
    pub fn clear(&self) {
        let count = self.cache.len();
        self.cache.clear();
        tracing::debug!(count, "Cleared conversation keys");
    }

    fn cached_key(&self, conversation_id: &str) -> Result<Arc<ConversationKey>> {
        self.cache.get(conversation_id).ok_or_else(|| {
            Error::ConversationKeyUnavailable(format!(
                "No key cached for conversation {}",
                conversation_id
            ))
        })
    }
}

fn already_established(conversation_id: &str) -> Error {
    Error::ConversationAlreadyEstablished(format!(
        "A key is already live for conversation {}",
        conversation_id
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::fixtures::{ALICE, BOB};
    use crate::crypto::{
        import_private_key_non_extractable, AsymmetricKeyPair, RecipientPublicKey,
    };

    fn session_for(user_id: &str, pair: &AsymmetricKeyPair) -> Session {
        let handle = Arc::new(import_private_key_non_extractable(&pair.private_key).unwrap());
        Session::new(Principal::new(user_id, handle))
    }

    fn participant(user_id: &str, pair: &AsymmetricKeyPair) -> Participant {
        Participant::new(
            user_id,
            RecipientPublicKey::from_exported(&pair.public_key).unwrap(),
        )
    }

    fn both() -> Vec<Participant> {
        vec![participant("alice", &ALICE), participant("bob", &BOB)]
    }

    #[test]
    fn test_establish_caches_key() {
        let alice = session_for("alice", &ALICE);

        let established = alice.establish_conversation("conv-1", &both()).unwrap();

        assert_eq!(established.entries.len(), 2);
        assert!(alice.cache().contains("conv-1"));
        assert_eq!(
            alice.cache().get("conv-1").unwrap().as_bytes(),
            established.key.as_bytes()
        );
    }

    #[test]
    fn test_establish_requires_self() {
        let alice = session_for("alice", &ALICE);

        let result = alice.establish_conversation("conv-1", &[participant("bob", &BOB)]);
        assert!(matches!(result, Err(Error::InvalidParticipants(_))));
        assert!(alice.cache().is_empty());
    }

    #[test]
    fn test_establish_rejects_wrong_self_key() {
        let alice = session_for("alice", &ALICE);
        let mislabelled = vec![participant("alice", &BOB), participant("bob", &BOB)];

        let result = alice.establish_conversation("conv-1", &mislabelled);
        assert!(matches!(result, Err(Error::InvalidParticipants(_))));
        assert!(alice.cache().is_empty());
    }

    #[test]
    fn test_second_establish_keeps_live_key() {
        let alice = session_for("alice", &ALICE);
        let bob = session_for("bob", &BOB);

        let first = alice.establish_conversation("conv-1", &both()).unwrap();
        bob.open_conversation("conv-1", &first.entries).unwrap();

        let second = alice.establish_conversation("conv-1", &both());
        assert!(matches!(
            second,
            Err(Error::ConversationAlreadyEstablished(_))
        ));

        let live = alice.cache().get("conv-1").unwrap();
        assert!(Arc::ptr_eq(&live, &first.key));

        // Bob still shares the live key
        let payload = alice.encrypt_message("conv-1", "still here").unwrap();
        assert_eq!(
            bob.read_message("conv-1", &payload, OutputKind::Text),
            MessageState::Decrypted(Plaintext::Text("still here".to_string()))
        );
    }

    #[test]
    fn test_establish_after_close_mints_new_key() {
        let alice = session_for("alice", &ALICE);

        let first = alice.establish_conversation("conv-1", &both()).unwrap();
        assert!(alice.close_conversation("conv-1"));

        let second = alice.establish_conversation("conv-1", &both()).unwrap();
        assert_ne!(first.key.as_bytes(), second.key.as_bytes());
    }

    #[test]
    fn test_cache_never_replaces_live_key() {
        let cache = ConversationKeyCache::new();
        let first = Arc::new(generate_conversation_key());
        let second = Arc::new(generate_conversation_key());

        assert!(cache.insert_if_absent("conv-1", Arc::clone(&first)).is_ok());
        let live = cache.insert_if_absent("conv-1", second).unwrap_err();

        assert!(Arc::ptr_eq(&live, &first));
        assert!(Arc::ptr_eq(&cache.get("conv-1").unwrap(), &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_establish_single_winner() {
        let alice = Arc::new(session_for("alice", &ALICE));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alice = Arc::clone(&alice);
                std::thread::spawn(move || alice.establish_conversation("conv-1", &both()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

        assert_eq!(winners.len(), 1);
        assert!(Arc::ptr_eq(
            &alice.cache().get("conv-1").unwrap(),
            &winners[0].key
        ));
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::ConversationAlreadyEstablished(_))));
    }

    #[test]
    fn test_participants_converge_on_same_key() {
        let alice = session_for("alice", &ALICE);
        let bob = session_for("bob", &BOB);

        let established = alice.establish_conversation("conv-1", &both()).unwrap();
        let bob_key = bob.open_conversation("conv-1", &established.entries).unwrap();

        assert_eq!(bob_key.as_bytes(), established.key.as_bytes());
    }

    #[test]
    fn test_message_round_trip() {
        let alice = session_for("alice", &ALICE);
        let bob = session_for("bob", &BOB);

        let established = alice.establish_conversation("conv-1", &both()).unwrap();
        bob.open_conversation("conv-1", &established.entries).unwrap();

        let payload = alice.encrypt_message("conv-1", "hello").unwrap();
        let plaintext = bob
            .decrypt_message("conv-1", &payload, OutputKind::Text)
            .unwrap();

        assert_eq!(plaintext, Plaintext::Text("hello".to_string()));
    }

    #[test]
    fn test_open_without_own_entry() {
        let bob = session_for("bob", &BOB);
        let entries = vec![WrappedKeyEntry {
            user_id: "alice".to_string(),
            wrapped_key: vec![0u8; 256],
        }];

        let result = bob.open_conversation("conv-1", &entries);
        assert!(matches!(result, Err(Error::NoWrappedKey(_))));
        assert!(!bob.cache().contains("conv-1"));
    }

    #[test]
    fn test_open_with_foreign_entry_fails() {
        let alice = session_for("alice", &ALICE);
        let established = alice.establish_conversation("conv-1", &both()).unwrap();

        // Bob's entry relabelled as Alice's: her key cannot unwrap it
        let stolen: Vec<WrappedKeyEntry> = established
            .entries
            .iter()
            .filter(|e| e.user_id == "bob")
            .map(|e| WrappedKeyEntry {
                user_id: "alice".to_string(),
                wrapped_key: e.wrapped_key.clone(),
            })
            .collect();

        let other = session_for("alice", &ALICE);
        let result = other.open_conversation("conv-1", &stolen);
        assert!(matches!(result, Err(Error::UnwrapFailed(_))));
        assert!(result.unwrap_err().is_recoverable());
    }

    #[test]
    fn test_open_is_cached() {
        let alice = session_for("alice", &ALICE);
        let bob = session_for("bob", &BOB);

        let established = alice.establish_conversation("conv-1", &both()).unwrap();
        let first = bob.open_conversation("conv-1", &established.entries).unwrap();

        // Second open never touches the entries
        let second = bob.open_conversation("conv-1", &[]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_conversation() {
        let alice = session_for("alice", &ALICE);

        let result = alice.encrypt_message("missing", "hi");
        assert!(matches!(result, Err(Error::ConversationKeyUnavailable(_))));
    }

    #[test]
    fn test_read_message_states() {
        let alice = session_for("alice", &ALICE);
        alice.establish_conversation("conv-1", &both()).unwrap();
        alice.establish_conversation("conv-2", &both()).unwrap();

        let payload = alice.encrypt_message("conv-1", "hi bob").unwrap();

        assert_eq!(
            alice.read_message("conv-1", &payload, OutputKind::Text),
            MessageState::Decrypted(Plaintext::Text("hi bob".to_string()))
        );
        // Wrong conversation key
        assert_eq!(
            alice.read_message("conv-2", &payload, OutputKind::Text),
            MessageState::Undecryptable
        );
        // No key at all
        assert!(!alice
            .read_message("conv-3", &payload, OutputKind::Text)
            .is_decrypted());
    }

    #[test]
    fn test_close_and_clear() {
        let alice = session_for("alice", &ALICE);
        alice.establish_conversation("conv-1", &both()).unwrap();
        alice.establish_conversation("conv-2", &both()).unwrap();

        assert!(alice.close_conversation("conv-1"));
        assert!(!alice.close_conversation("conv-1"));
        assert_eq!(alice.cache().len(), 1);

        alice.clear();
        assert!(alice.cache().is_empty());
    }
}
