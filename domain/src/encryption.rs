//! AES-256-CBC payload codec for everything sent to (and received from) the remote device.
//!
//! The key and initialization vector are fixed for the life of the process and
//! provided hex-encoded (ENCRYPTION_KEY: 64 hex characters, ENCRYPTION_IV: 32 hex
//! characters). Payloads are serialized to JSON, PKCS#7 padded, encrypted and the
//! ciphertext is hex-encoded so it can travel as a single opaque token.
//!
//! Encryption is deterministic: the same payload always produces the same
//! ciphertext because the IV never changes. The device side depends on this
//! static IV, so it is kept, but it leaks equality of payloads to anyone watching
//! the link. Moving to a fresh random IV per message (prepended to the
//! ciphertext) requires a coordinated change on the device.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;
/// AES block size, which is also the CBC IV size
pub const IV_SIZE: usize = 16;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// Errors that can occur during encryption/decryption operations
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Invalid encryption key: must be 32 bytes (64 hex characters)")]
    InvalidKey,

    #[error("Invalid initialization vector: must be 16 bytes (32 hex characters)")]
    InvalidIv,

    #[error("Failed to decode hex key material: {0}")]
    HexDecodeError(#[from] hex::FromHexError),

    #[error("Ciphertext is not a whole number of hex-encoded AES blocks")]
    MalformedCiphertext,

    #[error("Decryption failed - data may be corrupted or key is incorrect")]
    DecryptionFailed,

    #[error("Failed to serialize payload: {0}")]
    SerializationFailed(serde_json::Error),

    #[error("Decrypted payload is not the expected JSON: {0}")]
    DeserializationFailed(serde_json::Error),
}

/// Symmetric codec holding the process-wide key material.
///
/// `Codec` is immutable after construction; `encrypt` and `decrypt` take `&self`
/// and build a fresh cipher per call, so one instance can be shared freely
/// between tasks.
#[derive(Clone)]
pub struct Codec {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

// Never print key material.
impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; IV_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Builds a codec from hex-encoded key and IV strings.
    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, EncryptionError> {
        let key = decode_exact::<KEY_SIZE>(key_hex)?.ok_or(EncryptionError::InvalidKey)?;
        let iv = decode_exact::<IV_SIZE>(iv_hex)?.ok_or(EncryptionError::InvalidIv)?;
        Ok(Self::new(key, iv))
    }

    /// Serializes `payload` to JSON and encrypts it.
    ///
    /// # Returns
    /// Lowercase hex string of the ciphertext
    pub fn encrypt<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, EncryptionError> {
        let json = serde_json::to_vec(payload).map_err(EncryptionError::SerializationFailed)?;
        Ok(self.encrypt_bytes(&json))
    }

    /// Decrypts a ciphertext produced by [`Codec::encrypt`] and parses the JSON inside it.
    pub fn decrypt<T: DeserializeOwned>(&self, ciphertext_hex: &str) -> Result<T, EncryptionError> {
        let plaintext = self.decrypt_bytes(ciphertext_hex)?;
        serde_json::from_slice(&plaintext).map_err(EncryptionError::DeserializationFailed)
    }

    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> String {
        let ciphertext = Encryptor::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        hex::encode(ciphertext)
    }

    /// Decrypts hex ciphertext to the raw plaintext bytes. Either the whole
    /// plaintext is returned or an error; nothing partial escapes.
    pub fn decrypt_bytes(&self, ciphertext_hex: &str) -> Result<Vec<u8>, EncryptionError> {
        let ciphertext =
            hex::decode(ciphertext_hex.trim()).map_err(|_| EncryptionError::MalformedCiphertext)?;
        if ciphertext.is_empty() || ciphertext.len() % IV_SIZE != 0 {
            return Err(EncryptionError::MalformedCiphertext);
        }

        Decryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)
    }
}

/// Decodes hex into an N-byte array, `None` if the decoded length differs.
fn decode_exact<const N: usize>(value_hex: &str) -> Result<Option<[u8; N]>, EncryptionError> {
    let bytes = hex::decode(value_hex.trim())?;
    Ok(bytes.as_slice().try_into().ok())
}
