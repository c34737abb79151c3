//! # End-to-End Encryption Demo
//!
//! Walks two users through signup, conversation setup, a text message,
//! a media blob and a device migration via password backup.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example e2ee_demo
//! ```

use hush_core::crypto::{backup_file_name, PasswordKeyProtection};
use hush_core::{
    CoreConfig, Identity, MemoryKeyStore, MessageState, OutputKind, Participant,
    RecipientPublicKey, Session,
};

#[tokio::main]
async fn main() {
    println!("=== Hush Core: End-to-End Encryption Demo ===\n");

    let config = CoreConfig::default();

    // Step 1: Signup
    println!("Step 1: Creating identities for Alice and Bob (RSA-2048)...");

    let alice_store = MemoryKeyStore::new();
    let bob_store = MemoryKeyStore::new();

    let (alice, alice_keys) = Identity::create("alice", &alice_store, &config)
        .await
        .expect("Failed to create Alice's identity");
    let (bob, bob_keys) = Identity::create("bob", &bob_store, &config)
        .await
        .expect("Failed to create Bob's identity");

    let alice_public =
        RecipientPublicKey::from_exported(&alice_keys.public_key).expect("Bad public key");
    let bob_public =
        RecipientPublicKey::from_exported(&bob_keys.public_key).expect("Bad public key");

    println!(
        "  Alice's key fingerprint: {}...",
        &alice_public.fingerprint().expect("Fingerprint failed")[..16]
    );
    println!(
        "  Bob's key fingerprint:   {}...",
        &bob_public.fingerprint().expect("Fingerprint failed")[..16]
    );
    println!();

    // Step 2: Conversation setup
    println!("Step 2: Alice establishes a conversation...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                  CONVERSATION KEY FLOW                      │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   Alice mints K ──► wrap(pub_A, K), wrap(pub_B, K)          │");
    println!("  │                               │                             │");
    println!("  │                               ▼                             │");
    println!("  │                     server stores entries                   │");
    println!("  │                               │                             │");
    println!("  │   Bob fetches entry_B ──► unwrap(priv_B) ──► same K         │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let participants = vec![
        Participant::new("alice", alice_public.clone()),
        Participant::new("bob", bob_public),
    ];

    let alice_session = Session::new(alice);
    let bob_session = Session::new(bob);

    let established = alice_session
        .establish_conversation("demo-conversation", &participants)
        .expect("Failed to establish conversation");

    let wire = serde_json::to_string_pretty(&established.entries).expect("Serialize failed");
    println!("  Wrapped entries uploaded ({} bytes of JSON)", wire.len());

    bob_session
        .open_conversation("demo-conversation", &established.entries)
        .expect("Bob failed to open conversation");
    println!("  Bob unwrapped his entry");
    println!();

    // Step 3: Text message
    println!("Step 3: Alice sends \"hello\"...");

    let payload = alice_session
        .encrypt_message("demo-conversation", "hello")
        .expect("Encryption failed");
    println!("  Nonce:      {}", hex::encode(payload.nonce));
    println!(
        "  Ciphertext: {}... ({} bytes)",
        hex::encode(&payload.ciphertext[..8]),
        payload.ciphertext.len()
    );

    match bob_session.read_message("demo-conversation", &payload, OutputKind::Text) {
        MessageState::Decrypted(plaintext) => {
            println!("  Bob reads:  {:?}", plaintext.as_text().unwrap_or_default())
        }
        MessageState::Undecryptable => println!("  Bob sees:   [message could not be decrypted]"),
    }
    println!();

    // Step 4: Media blob
    println!("Step 4: Bob sends a 50KB voice note...");

    let voice_note: Vec<u8> = (0..50 * 1024).map(|i| (i % 251) as u8).collect();
    let media = bob_session
        .encrypt_message("demo-conversation", &voice_note)
        .expect("Encryption failed");
    let received = alice_session
        .decrypt_message("demo-conversation", &media, OutputKind::Binary)
        .expect("Decryption failed");

    println!(
        "  {} bytes in, {} bytes on the wire, identical on arrival: {}",
        voice_note.len(),
        media.to_bytes().len(),
        received.as_bytes() == voice_note.as_slice()
    );
    println!();

    // Step 5: Device migration
    println!("Step 5: Alice backs up her key and restores it on a new device...");

    let protection = PasswordKeyProtection::from_config(&config).expect("Bad config");
    let blob = protection
        .encrypt_private_key_for_backup(&alice_keys.private_key, "correct horse battery staple")
        .expect("Backup failed");
    println!(
        "  Wrote {} ({} bytes)",
        backup_file_name("alice"),
        blob.as_bytes().len()
    );

    let new_device_store = MemoryKeyStore::new();

    let attempt = Identity::restore_from_backup("alice", &blob, "wrong", &new_device_store, &config)
        .await
        .expect("Restore failed");
    println!("  Wrong password restored: {}", attempt.is_some());

    let restored = Identity::restore_from_backup(
        "alice",
        &blob,
        "correct horse battery staple",
        &new_device_store,
        &config,
    )
    .await
    .expect("Restore failed")
    .expect("Correct password rejected");

    let new_session = Session::new(restored);
    new_session
        .open_conversation("demo-conversation", &established.entries)
        .expect("Failed to reopen conversation");

    let history = new_session.read_message("demo-conversation", &payload, OutputKind::Text);
    println!("  History readable on new device: {}", history.is_decrypted());
    println!();

    println!("=== Demo Complete ===");
}
