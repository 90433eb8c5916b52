//! Encryption of cached values at rest
//!
//! The engine only depends on the [`Cipher`] capability. [`AesGcmCipher`] is the
//! bundled implementation.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// AES-256-GCM nonce size (96 bits)
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Symmetric encryption of serialized values.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext` with `secret`, returning printable ciphertext.
    fn encrypt(&self, plaintext: &str, secret: &str) -> Result<String>;

    /// Reverses [`Cipher::encrypt`]. Fails on a wrong secret or tampered input.
    fn decrypt(&self, ciphertext: &str, secret: &str) -> Result<String>;
}

/// AES-256-GCM with a SHA-256 derived key.
///
/// Output format is `base64(nonce || ciphertext || tag)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    pub fn new() -> Self {
        Self
    }

    fn cipher_for(secret: &str) -> Aes256Gcm {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let derived: [u8; 32] = hasher.finalize().into();
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived))
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str, secret: &str) -> Result<String> {
        let cipher = Self::cipher_for(secret);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CacheError::Encryption(format!("encryption failed: {}", e)))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + sealed.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&sealed);

        Ok(general_purpose::STANDARD.encode(&output))
    }

    fn decrypt(&self, ciphertext: &str, secret: &str) -> Result<String> {
        let bytes = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| CacheError::Encryption(format!("invalid ciphertext encoding: {}", e)))?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CacheError::Encryption("ciphertext too short".to_string()));
        }

        let cipher = Self::cipher_for(secret);
        let nonce = Nonce::from_slice(&bytes[..NONCE_SIZE]);
        let plaintext = cipher
            .decrypt(nonce, &bytes[NONCE_SIZE..])
            .map_err(|_| CacheError::Encryption("decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CacheError::Encryption(format!("plaintext is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = AesGcmCipher::new();
        let sealed = cipher.encrypt(r#"{"v":1}"#, "secret").unwrap();

        assert_ne!(sealed, r#"{"v":1}"#);
        assert_eq!(cipher.decrypt(&sealed, "secret").unwrap(), r#"{"v":1}"#);
    }

    #[test]
    fn test_nonce_differs_per_call() {
        let cipher = AesGcmCipher::new();
        let a = cipher.encrypt("same", "secret").unwrap();
        let b = cipher.encrypt("same", "secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let cipher = AesGcmCipher::new();
        let sealed = cipher.encrypt("payload", "right").unwrap();

        let result = cipher.decrypt(&sealed, "wrong");
        assert!(matches!(result, Err(CacheError::Encryption(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let cipher = AesGcmCipher::new();
        assert!(cipher.decrypt("not base64 !!", "secret").is_err());
        assert!(cipher.decrypt("AAAA", "secret").is_err());
    }
}
