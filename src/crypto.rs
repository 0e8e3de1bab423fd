//! Credential encryption using AES-256-GCM
//!
//! This module provides encryption and decryption utilities for the OAuth
//! client credentials stored on PSA connections. Secrets are stored as opaque
//! base64 text blobs laid out as `salt || iv || tag || ciphertext`.

use aes_gcm::{
    AesGcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, consts::U16},
    aes::Aes256,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256-GCM with a 16-byte IV, matching the stored blob format.
type CredentialAead = AesGcm<Aes256, U16>;

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const MIN_BLOB_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// Fixed application salt for the passphrase key-derivation path.
const KDF_SALT: &[u8] = b"psa-sync-credential-kdf";
const KDF_ROUNDS: u32 = 100_000;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("authentication failed: blob is tampered or was encrypted with a different key")]
    AuthenticationFailed,
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Secure wrapper for the resolved encryption key with zeroization
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey(Vec<u8>);

impl CipherKey {
    /// Create a key from exactly 32 raw bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::EncryptionFailed(
                "Invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(CipherKey(bytes))
    }

    /// Resolve the process-wide key from the configured secret.
    ///
    /// A 64-hex-character secret is used directly as key bytes; any other
    /// value goes through PBKDF2-HMAC-SHA256 with the fixed application salt.
    pub fn resolve(secret: &str) -> Result<Self, CipherError> {
        if secret.len() == KEY_LEN * 2
            && let Ok(bytes) = hex::decode(secret)
        {
            return CipherKey::new(bytes);
        }

        let mut derived = vec![0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), KDF_SALT, KDF_ROUNDS, &mut derived);
        CipherKey::new(derived)
    }

    /// Get the key as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt a plaintext secret into a base64 `salt || iv || tag || ct` blob.
///
/// The embedded salt is freshly random on every call but exists only for
/// format symmetry; key resolution never re-derives from it on decrypt.
pub fn encrypt(key: &CipherKey, plaintext: &str) -> Result<String, CipherError> {
    let cipher_key = Key::<CredentialAead>::from_slice(key.as_bytes());
    let cipher = CredentialAead::new(cipher_key);

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let iv = CredentialAead::generate_nonce(&mut OsRng);

    // aead produces ciphertext || tag; the blob stores the tag before the
    // ciphertext, so split and reorder.
    let ct_and_tag = cipher
        .encrypt(&iv, plaintext.as_bytes())
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
    let split = ct_and_tag.len() - TAG_LEN;
    let (ciphertext, tag) = ct_and_tag.split_at(split);

    let mut blob = Vec::with_capacity(MIN_BLOB_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(tag);
    blob.extend_from_slice(ciphertext);

    Ok(BASE64.encode(blob))
}

/// Decrypt a base64 blob produced by [`encrypt`], verifying the GCM tag.
///
/// A tampered or truncated blob fails with [`CipherError::AuthenticationFailed`]
/// or [`CipherError::InvalidFormat`]; partial plaintext is never returned.
pub fn decrypt(key: &CipherKey, blob: &str) -> Result<String, CipherError> {
    let bytes = BASE64.decode(blob).map_err(|_| CipherError::InvalidFormat)?;
    if bytes.len() < MIN_BLOB_LEN {
        return Err(CipherError::InvalidFormat);
    }

    let iv = Nonce::<U16>::from_slice(&bytes[SALT_LEN..SALT_LEN + IV_LEN]);
    let tag = &bytes[SALT_LEN + IV_LEN..MIN_BLOB_LEN];
    let ciphertext = &bytes[MIN_BLOB_LEN..];

    // Reassemble ciphertext || tag for the aead layer
    let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    ct_and_tag.extend_from_slice(ciphertext);
    ct_and_tag.extend_from_slice(tag);

    let cipher_key = Key::<CredentialAead>::from_slice(key.as_bytes());
    let cipher = CredentialAead::new(cipher_key);

    let plaintext = cipher
        .decrypt(iv, ct_and_tag.as_ref())
        .map_err(|_| CipherError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
}
