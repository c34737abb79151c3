//! End-to-end conversation flows through the public API.

use std::sync::Arc;

use hush_core::crypto::{
    decrypt, encrypt, generate_key_pair, import_private_key_non_extractable, unwrap_key,
    wrap_key, AsymmetricKeyPair, EncryptedPayload, PasswordKeyProtection,
    PasswordProtectedKeyBlob,
};
use hush_core::{
    CoreConfig, Error, Identity, MemoryKeyStore, MessageState, OutputKind, Participant, Plaintext,
    Principal, RecipientPublicKey, Session, WrappedKeyEntry,
};
use once_cell::sync::Lazy;

static ALICE: Lazy<AsymmetricKeyPair> = Lazy::new(|| generate_key_pair(2048).unwrap());
static BOB: Lazy<AsymmetricKeyPair> = Lazy::new(|| generate_key_pair(2048).unwrap());
static CAROL: Lazy<AsymmetricKeyPair> = Lazy::new(|| generate_key_pair(2048).unwrap());

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

#[test]
fn alice_sends_hello_to_bob() {
    let alice = session_for("alice", &ALICE);
    let bob = session_for("bob", &BOB);

    let established = alice
        .establish_conversation(
            "c1",
            &[participant("alice", &ALICE), participant("bob", &BOB)],
        )
        .unwrap();

    // Everything crosses the server as JSON
    let entries_json = serde_json::to_string(&established.entries).unwrap();
    let payload_json =
        serde_json::to_string(&alice.encrypt_message("c1", "hello").unwrap()).unwrap();

    let entries: Vec<WrappedKeyEntry> = serde_json::from_str(&entries_json).unwrap();
    let payload: EncryptedPayload = serde_json::from_str(&payload_json).unwrap();

    bob.open_conversation("c1", &entries).unwrap();
    let plaintext = bob.decrypt_message("c1", &payload, OutputKind::Text).unwrap();

    assert_eq!(plaintext, Plaintext::Text("hello".to_string()));
}

#[test]
fn media_blob_survives_byte_for_byte() {
    let alice = session_for("alice", &ALICE);
    let bob = session_for("bob", &BOB);

    let established = alice
        .establish_conversation(
            "c2",
            &[participant("alice", &ALICE), participant("bob", &BOB)],
        )
        .unwrap();
    bob.open_conversation("c2", &established.entries).unwrap();

    let blob: Vec<u8> = (0..50 * 1024).map(|i| (i * 7 % 256) as u8).collect();
    let framed = bob.encrypt_message("c2", &blob).unwrap().to_bytes();

    let payload = EncryptedPayload::from_bytes(&framed).unwrap();
    let received = alice
        .decrypt_message("c2", &payload, OutputKind::Binary)
        .unwrap();

    assert_eq!(received.into_bytes(), blob);
}

#[test]
fn outsider_cannot_read_conversation() {
    let alice = session_for("alice", &ALICE);
    let carol = session_for("carol", &CAROL);

    let established = alice
        .establish_conversation(
            "c3",
            &[participant("alice", &ALICE), participant("bob", &BOB)],
        )
        .unwrap();
    let payload = alice.encrypt_message("c3", "not for carol").unwrap();

    // No entry addressed to carol
    let result = carol.open_conversation("c3", &established.entries);
    assert!(matches!(result, Err(Error::NoWrappedKey(_))));

    // Bob's entry under carol's key
    let bob_entry = established
        .entries
        .iter()
        .find(|e| e.user_id == "bob")
        .unwrap();
    let carol_handle = import_private_key_non_extractable(&CAROL.private_key).unwrap();
    assert!(matches!(
        unwrap_key(&bob_entry.wrapped_key, &carol_handle),
        Err(Error::UnwrapFailed(_))
    ));

    assert_eq!(
        carol.read_message("c3", &payload, OutputKind::Text),
        MessageState::Undecryptable
    );
}

#[test]
fn group_conversation_everyone_converges() {
    let alice = session_for("alice", &ALICE);
    let bob = session_for("bob", &BOB);
    let carol = session_for("carol", &CAROL);

    let established = alice
        .establish_conversation(
            "group",
            &[
                participant("alice", &ALICE),
                participant("bob", &BOB),
                participant("carol", &CAROL),
            ],
        )
        .unwrap();
    assert_eq!(established.entries.len(), 3);

    let bob_key = bob.open_conversation("group", &established.entries).unwrap();
    let carol_key = carol
        .open_conversation("group", &established.entries)
        .unwrap();
    assert_eq!(bob_key.as_bytes(), established.key.as_bytes());
    assert_eq!(carol_key.as_bytes(), established.key.as_bytes());

    let payload = carol.encrypt_message("group", "hi all").unwrap();
    assert!(alice
        .read_message("group", &payload, OutputKind::Text)
        .is_decrypted());
    assert!(bob
        .read_message("group", &payload, OutputKind::Text)
        .is_decrypted());
}

#[test]
fn cross_conversation_keys_do_not_mix() {
    let alice = session_for("alice", &ALICE);
    let participants = [participant("alice", &ALICE), participant("bob", &BOB)];

    let first = alice.establish_conversation("one", &participants).unwrap();
    let second = alice.establish_conversation("two", &participants).unwrap();
    assert_ne!(first.key.as_bytes(), second.key.as_bytes());

    let payload = encrypt("secret", &first.key).unwrap();
    assert!(matches!(
        decrypt(&payload, &second.key, OutputKind::Text),
        Err(Error::DecryptionFailed(_))
    ));
}

#[tokio::test]
async fn backup_restores_access_on_new_device() {
    let config = CoreConfig::default();
    let old_device = MemoryKeyStore::new();

    let (alice, keys) = Identity::create("alice", &old_device, &config).await.unwrap();
    let alice_public = RecipientPublicKey::from_exported(&keys.public_key).unwrap();

    let session = Session::new(alice);
    let established = session
        .establish_conversation(
            "history",
            &[
                Participant::new("alice", alice_public.clone()),
                participant("bob", &BOB),
            ],
        )
        .unwrap();
    let payload = session.encrypt_message("history", "remember me").unwrap();

    let protection = PasswordKeyProtection::from_config(&config).unwrap();
    let file_bytes = protection
        .encrypt_private_key_for_backup(&keys.private_key, "s3cret!")
        .unwrap()
        .as_bytes()
        .to_vec();
    drop(keys);

    let new_device = MemoryKeyStore::new();
    let blob = PasswordProtectedKeyBlob::from_bytes(file_bytes);

    assert!(
        Identity::restore_from_backup("alice", &blob, "s3cret", &new_device, &config)
            .await
            .unwrap()
            .is_none()
    );

    let restored = Identity::restore_from_backup("alice", &blob, "s3cret!", &new_device, &config)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.public_key(), alice_public);

    let loaded = Identity::load("alice", &new_device).await.unwrap().unwrap();
    let new_session = Session::new(loaded);
    new_session
        .open_conversation("history", &established.entries)
        .unwrap();

    assert_eq!(
        new_session.read_message("history", &payload, OutputKind::Text),
        MessageState::Decrypted(Plaintext::Text("remember me".to_string()))
    );
}

#[test]
fn wrap_ceiling_enforced() {
    let bob = RecipientPublicKey::from_exported(&BOB.public_key).unwrap();
    let limit = bob.max_wrap_payload();

    assert!(wrap_key(&vec![1u8; limit], &bob).is_ok());
    assert!(matches!(
        wrap_key(&vec![1u8; limit + 1], &bob),
        Err(Error::WrapFailed(_))
    ));
}
