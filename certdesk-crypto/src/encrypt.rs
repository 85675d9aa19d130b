//! AES-256-GCM encryption for private keys at rest.
//!
//! Every call draws a fresh 12-byte nonce which is stored in front of the
//! ciphertext. The persisted text form is the lowercase hex encoding of
//! `nonce || ciphertext || tag`.

use crate::error::{CryptoError, Result};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;

/// Required master key length in bytes.
pub const KEY_LEN: usize = 32;

/// Authenticated encryptor bound to a single master key.
pub struct Encryptor {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}

impl Encryptor {
    /// Create an encryptor from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Create an encryptor from a hex-encoded master key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes =
            hex::decode(hex_key.trim()).map_err(|_| CryptoError::InvalidKeyLength(hex_key.len() / 2))?;
        Self::new(&bytes)
    }

    /// Encrypt into the binary `nonce || ciphertext || tag` layout.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::Random)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Random)?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    /// Decrypt the binary layout produced by [`Encryptor::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::CiphertextTooShort);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::DecryptionFailed)?;

        let mut buf = ciphertext.to_vec();
        let len = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut buf)
            .map_err(|_| CryptoError::DecryptionFailed)?
            .len();
        buf.truncate(len);
        Ok(buf)
    }

    /// Encrypt and hex-encode.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        self.seal(plaintext).map(hex::encode)
    }

    /// Hex-decode and decrypt. Malformed hex fails closed.
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<Vec<u8>> {
        let sealed = hex::decode(ciphertext_hex).map_err(|_| CryptoError::DecryptionFailed)?;
        self.open(&sealed)
    }

    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_string(&self, ciphertext_hex: &str) -> Result<String> {
        let bytes = self.decrypt(ciphertext_hex)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// Generate a random master key, hex-encoded.
pub fn generate_master_key() -> Result<String> {
    let mut key = [0u8; KEY_LEN];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| CryptoError::Random)?;
    Ok(hex::encode(key))
}
