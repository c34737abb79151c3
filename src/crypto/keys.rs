//! # Identity Keys (RSA-OAEP)
//!
//! Asymmetric keypairs used to wrap per-conversation keys.
//!
//! ## Key Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      IDENTITY KEY LIFECYCLE                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  generate_key_pair()                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  AsymmetricKeyPair (both halves exportable)                             │
//! │         │                                                               │
//! │         ├──► public_key  (SPKI DER) ──► server / other users            │
//! │         │                                                               │
//! │         └──► private_key (PKCS#8 DER)                                   │
//! │                   │                                                     │
//! │                   ├──► (optional) password-protected backup file        │
//! │                   │                                                     │
//! │                   └──► import_private_key_non_extractable()             │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                   RsaPrivateKeyHandle ──► KeyStore                      │
//! │                   (decrypt only, bytes never readable again)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Parameters
//!
//! | Parameter | Value |
//! |-----------|-------|
//! | Modulus | 2048 bits minimum |
//! | Padding | OAEP |
//! | Hash | SHA-256 (label empty) |
//! | Public export | SubjectPublicKeyInfo, DER |
//! | Private export | PKCS#8, DER |

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::encoding::base64_bytes;
use crate::error::{Error, Result};

/// Default RSA modulus size in bits
pub const RSA_MODULUS_BITS: usize = 2048;

/// Smallest modulus accepted for generation or import
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// SHA-256 output size, used by the OAEP size bound
const OAEP_HASH_SIZE: usize = 32;

/// Exported public key (SubjectPublicKeyInfo, DER)
///
/// Safe to share, log the fingerprint of, and send to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportedPublicKey(#[serde(with = "base64_bytes")] Vec<u8>);

impl ExportedPublicKey {
    /// Wrap raw SPKI DER bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw DER bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Exported private key (PKCS#8, DER)
///
/// Only exists between generation and import, or during backup/restore.
/// Zeroized on drop; not `Clone`, not `Serialize`, and `Debug` is redacted.
pub struct ExportedPrivateKey(Zeroizing<Vec<u8>>);

impl ExportedPrivateKey {
    /// Wrap raw PKCS#8 DER bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Get the raw DER bytes
    ///
    /// ## Security Warning
    ///
    /// Only use this for backup encryption. Never log or transmit these bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ExportedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportedPrivateKey(<{} bytes redacted>)", self.0.len())
    }
}

impl PartialEq for ExportedPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for ExportedPrivateKey {}

/// An exportable RSA keypair, produced once per user at signup
#[derive(Debug)]
pub struct AsymmetricKeyPair {
    /// Public half, shared with the server and other users
    pub public_key: ExportedPublicKey,
    /// Private half, kept client-side only
    pub private_key: ExportedPrivateKey,
}

impl AsymmetricKeyPair {
    /// Generate a new keypair with the default modulus size
    pub fn generate() -> Result<Self> {
        generate_key_pair(RSA_MODULUS_BITS)
    }
}

/// Generate a new RSA keypair suitable for OAEP/SHA-256 encryption
///
/// Both halves are exported immediately so the caller can publish the public
/// key and optionally back up the private key before importing it into the
/// key store.
pub fn generate_key_pair(modulus_bits: usize) -> Result<AsymmetricKeyPair> {
    if modulus_bits < MIN_RSA_MODULUS_BITS {
        return Err(Error::KeyGenerationFailed(format!(
            "Modulus of {} bits is below the {} bit minimum",
            modulus_bits, MIN_RSA_MODULUS_BITS
        )));
    }

    let secret = RsaPrivateKey::new(&mut OsRng, modulus_bits)
        .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;
    let public = RsaPublicKey::from(&secret);

    let private_der = secret
        .to_pkcs8_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("PKCS#8 export failed: {}", e)))?;
    let public_der = public
        .to_public_key_der()
        .map_err(|e| Error::KeyGenerationFailed(format!("SPKI export failed: {}", e)))?;

    Ok(AsymmetricKeyPair {
        public_key: ExportedPublicKey::from_bytes(public_der.as_bytes().to_vec()),
        private_key: ExportedPrivateKey::from_bytes(private_der.as_bytes().to_vec()),
    })
}

/// A recipient's public key, used for wrapping conversation keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientPublicKey {
    inner: RsaPublicKey,
}

impl RecipientPublicKey {
    /// Import an exported (SPKI DER) public key
    pub fn from_exported(exported: &ExportedPublicKey) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_der(exported.as_bytes())
            .map_err(|e| Error::KeyImportFailed(format!("Invalid public key: {}", e)))?;

        if inner.n().bits() < MIN_RSA_MODULUS_BITS {
            return Err(Error::KeyImportFailed(format!(
                "Public key modulus of {} bits is below the {} bit minimum",
                inner.n().bits(),
                MIN_RSA_MODULUS_BITS
            )));
        }

        Ok(Self { inner })
    }

    /// Export back to SPKI DER
    pub fn to_exported(&self) -> Result<ExportedPublicKey> {
        let der = self
            .inner
            .to_public_key_der()
            .map_err(|e| Error::InvalidKey(format!("SPKI export failed: {}", e)))?;
        Ok(ExportedPublicKey::from_bytes(der.as_bytes().to_vec()))
    }

    /// Modulus size in bits
    pub fn modulus_bits(&self) -> usize {
        self.inner.n().bits()
    }

    /// Largest payload RSA-OAEP-SHA256 can encrypt under this key
    pub fn max_wrap_payload(&self) -> usize {
        self.inner.size().saturating_sub(2 * OAEP_HASH_SIZE + 2)
    }

    /// Hex SHA-256 of the SPKI encoding, for out-of-band verification
    pub fn fingerprint(&self) -> Result<String> {
        let exported = self.to_exported()?;
        Ok(hex::encode(Sha256::digest(exported.as_bytes())))
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

/// A private key usable only as a decryption capability
///
/// Implementations must never expose the underlying key bytes. This is the
/// value type held by the key store.
pub trait PrivateKeyHandle: Send + Sync {
    /// Decrypt an RSA-OAEP ciphertext produced under the matching public key
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// The public counterpart of this key
    fn public_key(&self) -> RecipientPublicKey;
}

/// Non-extractable RSA private key
///
/// Created by [`import_private_key_non_extractable`]. There is no accessor
/// for the key material and no `Clone`; share it as an `Arc`.
pub struct RsaPrivateKeyHandle {
    // rsa::RsaPrivateKey zeroizes itself on drop
    secret: RsaPrivateKey,
}

impl PrivateKeyHandle for RsaPrivateKeyHandle {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.secret
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|e| Error::DecryptionFailed(format!("RSA-OAEP: {}", e)))
    }

    fn public_key(&self) -> RecipientPublicKey {
        RecipientPublicKey {
            inner: self.secret.to_public_key(),
        }
    }
}

impl fmt::Debug for RsaPrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKeyHandle")
            .field("modulus_bits", &self.secret.n().bits())
            .finish_non_exhaustive()
    }
}

/// Import exported private key material into a decrypt-only handle
///
/// The returned handle is the form persisted in the key store. Fails with
/// `KeyImportFailed` on malformed or undersized material.
pub fn import_private_key_non_extractable(
    material: &ExportedPrivateKey,
) -> Result<RsaPrivateKeyHandle> {
    let secret = RsaPrivateKey::from_pkcs8_der(material.as_bytes())
        .map_err(|e| Error::KeyImportFailed(format!("Invalid private key: {}", e)))?;

    if secret.n().bits() < MIN_RSA_MODULUS_BITS {
        return Err(Error::KeyImportFailed(format!(
            "Private key modulus of {} bits is below the {} bit minimum",
            secret.n().bits(),
            MIN_RSA_MODULUS_BITS
        )));
    }

    secret
        .validate()
        .map_err(|e| Error::KeyImportFailed(format!("Inconsistent private key: {}", e)))?;

    Ok(RsaPrivateKeyHandle { secret })
}

// ============================================================================
// TESTS
// ============================================================================
