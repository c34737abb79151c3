//! # Password-Protected Key Backup
//!
//! Encrypts an exported private key under a key derived from the user's
//! password, for the downloadable backup file used in device migration.
//!
//! ## Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → BACKUP KEY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password (UTF-8)                                                       │
//! │       │                                                                 │
//! │       ├──► SHA-256 ──► digest (32 bytes)                                │
//! │       │                 ├── [0..16]  → KDF salt                         │
//! │       │                 └── [16..28] → AES-GCM IV                       │
//! │       │                                                                 │
//! │       └──► PBKDF2-HMAC-SHA256(password, salt, ≥100k) ──► 256-bit key    │
//! │                                                                         │
//! │  blob = AES-256-GCM(key, iv, pkcs8_der, aad = "hush-key-backup-v1")     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deterministic Salt and IV
//!
//! Salt and IV come from the password itself, so the backup key can be
//! regenerated from nothing but the password and the blob carries no header.
//! The cost: identical passwords always yield identical (salt, IV, key)
//! triples, there is no per-user salt, and two different private keys backed
//! up under the same password reuse an AES-GCM nonce. Backups must therefore
//! only ever be produced for one private key per password. Moving to a random
//! stored salt/IV would break every existing backup file.

use pbkdf2::pbkdf2_hmac;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::cipher::{open, seal, NONCE_SIZE};
use super::keys::ExportedPrivateKey;
use crate::error::{Error, Result};
use crate::CoreConfig;

/// Minimum PBKDF2 iteration count
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the salt taken from the password digest
pub const SALT_SIZE: usize = 16;

/// File extension callers use for backup files
pub const BACKUP_FILE_EXTENSION: &str = "enc";

/// Associated data binding ciphertexts to the backup domain
const BACKUP_AAD: &[u8] = b"hush-key-backup-v1";

/// Ciphertext of an exported private key, ready to be written to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordProtectedKeyBlob(Vec<u8>);

impl PasswordProtectedKeyBlob {
    /// Wrap bytes read back from a backup file
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Bytes to write to the backup file
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Material derived from a password
#[derive(ZeroizeOnDrop)]
pub struct PasswordDerivedKey {
    /// AES-256 key-encryption key
    pub key: [u8; 32],
    /// PBKDF2 salt (first 16 bytes of SHA-256(password))
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM IV (bytes 16..28 of SHA-256(password))
    pub iv: [u8; NONCE_SIZE],
}

/// Password-based protection of exported private keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordKeyProtection {
    iterations: u32,
}

impl Default for PasswordKeyProtection {
    fn default() -> Self {
        Self {
            iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl PasswordKeyProtection {
    /// Create with an explicit PBKDF2 iteration count
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(Error::InvalidConfig(format!(
                "PBKDF2 iterations must be at least {}, got {}",
                MIN_PBKDF2_ITERATIONS, iterations
            )));
        }
        Ok(Self { iterations })
    }

    /// Create from a validated core configuration
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        Self::new(config.pbkdf2_iterations)
    }

    /// Configured PBKDF2 iteration count
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive the backup key, salt and IV from a password
    ///
    /// Deterministic: the same password and iteration count always produce
    /// the same output.
    pub fn derive_key_from_password(&self, password: &str) -> PasswordDerivedKey {
        let mut digest = Zeroizing::new([0u8; 32]);
        digest.copy_from_slice(&Sha256::digest(password.as_bytes()));

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&digest[..SALT_SIZE]);
        let mut iv = [0u8; NONCE_SIZE];
        iv.copy_from_slice(&digest[SALT_SIZE..SALT_SIZE + NONCE_SIZE]);

        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.iterations, &mut key);

        PasswordDerivedKey { key, salt, iv }
    }

    /// Encrypt an exported private key for a downloadable backup
    pub fn encrypt_private_key_for_backup(
        &self,
        private_key: &ExportedPrivateKey,
        password: &str,
    ) -> Result<PasswordProtectedKeyBlob> {
        let derived = self.derive_key_from_password(password);
        let ciphertext = seal(&derived.key, &derived.iv, private_key.as_bytes(), BACKUP_AAD)?;
        Ok(PasswordProtectedKeyBlob(ciphertext))
    }

    /// Decrypt a backup blob
    ///
    /// Returns `None` on any failure. The usual cause is a wrong password,
    /// which the caller should present as a retry prompt.
    pub fn decrypt_private_key_for_restore(
        &self,
        blob: &PasswordProtectedKeyBlob,
        password: &str,
    ) -> Option<ExportedPrivateKey> {
        let derived = self.derive_key_from_password(password);
        let material = open(&derived.key, &derived.iv, blob.as_bytes(), BACKUP_AAD).ok()?;
        let material = ExportedPrivateKey::from_bytes(material);

        // Must decode as PKCS#8, not just authenticate
        RsaPrivateKey::from_pkcs8_der(material.as_bytes()).ok()?;

        Some(material)
    }
}

/// Suggested file name for a user's backup
pub fn backup_file_name(user_id: &str) -> String {
    let safe: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-private-key.{}", safe, BACKUP_FILE_EXTENSION)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::import_private_key_non_extractable;
    use crate::crypto::keys::tests::{ALICE, BOB};

    #[test]
    fn test_derivation_deterministic() {
        let protection = PasswordKeyProtection::default();

        let a = protection.derive_key_from_password("correct horse");
        let b = protection.derive_key_from_password("correct horse");

        assert_eq!(a.key, b.key);
        assert_eq!(a.salt, b.salt);
        assert_eq!(a.iv, b.iv);
    }

    #[test]
    fn test_salt_and_iv_come_from_password_digest() {
        let protection = PasswordKeyProtection::default();
        let derived = protection.derive_key_from_password("correct horse");
        let digest = Sha256::digest(b"correct horse");

        assert_eq!(&derived.salt[..], &digest[..16]);
        assert_eq!(&derived.iv[..], &digest[16..28]);
    }

    #[test]
    fn test_different_passwords_different_keys() {
        let protection = PasswordKeyProtection::default();

        let a = protection.derive_key_from_password("password-one");
        let b = protection.derive_key_from_password("password-two");

        assert_ne!(a.key, b.key);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_iteration_floor() {
        assert!(matches!(
            PasswordKeyProtection::new(99_999),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(PasswordKeyProtection::new(150_000).unwrap().iterations(), 150_000);
    }

    #[test]
    fn test_backup_round_trip() {
        let protection = PasswordKeyProtection::default();

        let blob = protection
            .encrypt_private_key_for_backup(&ALICE.private_key, "hunter2!")
            .unwrap();
        let restored = protection
            .decrypt_private_key_for_restore(&blob, "hunter2!")
            .unwrap();

        assert_eq!(restored, ALICE.private_key);
        assert!(import_private_key_non_extractable(&restored).is_ok());
    }

    #[test]
    fn test_wrong_password_returns_none() {
        let protection = PasswordKeyProtection::default();

        let blob = protection
            .encrypt_private_key_for_backup(&BOB.private_key, "right password")
            .unwrap();

        assert!(protection
            .decrypt_private_key_for_restore(&blob, "wrong password")
            .is_none());
        assert!(protection
            .decrypt_private_key_for_restore(&blob, "")
            .is_none());
    }

    #[test]
    fn test_corrupt_blob_returns_none() {
        let protection = PasswordKeyProtection::default();

        let blob = protection
            .encrypt_private_key_for_backup(&BOB.private_key, "pw")
            .unwrap();
        let mut bytes = blob.as_bytes().to_vec();
        bytes[5] ^= 0x80;

        let corrupted = PasswordProtectedKeyBlob::from_bytes(bytes);
        assert!(protection.decrypt_private_key_for_restore(&corrupted, "pw").is_none());

        let truncated = PasswordProtectedKeyBlob::from_bytes(vec![1, 2, 3]);
        assert!(protection.decrypt_private_key_for_restore(&truncated, "pw").is_none());
    }

    #[test]
    fn test_non_key_content_returns_none() {
        let protection = PasswordKeyProtection::default();
        let not_a_key = ExportedPrivateKey::from_bytes(b"definitely not pkcs8".to_vec());

        let blob = protection
            .encrypt_private_key_for_backup(&not_a_key, "pw")
            .unwrap();
        assert!(protection.decrypt_private_key_for_restore(&blob, "pw").is_none());
    }

    #[test]
    fn test_backup_file_name() {
        assert_eq!(backup_file_name("alice"), "alice-private-key.enc");
        assert_eq!(backup_file_name("a/b c"), "a_b_c-private-key.enc");
    }
}
