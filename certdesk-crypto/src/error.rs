/// Error types for key handling and at-rest encryption
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),

    #[error("Invalid key size {size} for {key_type}")]
    InvalidKeySize { key_type: String, size: u32 },

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("Invalid PEM: {0}")]
    InvalidPem(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid encryption key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Ciphertext too short")]
    CiphertextTooShort,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Random number generation failed")]
    Random,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
