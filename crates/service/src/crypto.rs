//! Member PII encryption with AES-256-GCM.
//!
//! Format: base64(nonce_12bytes || ciphertext || tag_16bytes)

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use zeroize::Zeroize;

use crate::errors::ServiceError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct PiiCipher {
    key: [u8; KEY_LEN],
}

impl Drop for PiiCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for PiiCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PiiCipher(..)")
    }
}

impl PiiCipher {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ServiceError> {
        if bytes.len() != KEY_LEN {
            return Err(ServiceError::Crypto(format!("key must be {KEY_LEN} bytes, got {}", bytes.len())));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Random key, for tests and throwaway deployments.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
        Self { key }
    }

    /// Encrypt a string → base64 blob
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, ServiceError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| ServiceError::Crypto("invalid key".into()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| ServiceError::Crypto("encryption failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(&out))
    }

    /// Decrypt base64 blob → string
    pub fn decrypt_str(&self, encrypted_b64: &str) -> Result<String, ServiceError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encrypted_b64)
            .map_err(|_| ServiceError::Crypto("invalid base64".into()))?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(ServiceError::Crypto("ciphertext too short".into()));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| ServiceError::Crypto("invalid key".into()))?;
        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
        let plain = cipher
            .decrypt(nonce, &data[NONCE_LEN..])
            .map_err(|_| ServiceError::Crypto("decryption failed (wrong key or tampered data)".into()))?;
        String::from_utf8(plain).map_err(|_| ServiceError::Crypto("plaintext is not utf-8".into()))
    }
}

/// `110101199001011234` → `110***********1234`; 7 chars or fewer are fully masked.
pub fn mask_id_card(id_card: &str) -> String {
    let chars: Vec<char> = id_card.chars().collect();
    let n = chars.len();
    if n <= 7 {
        return "*".repeat(n);
    }
    let mut out: String = chars[..3].iter().collect();
    out.push_str(&"*".repeat(n - 7));
    out.extend(&chars[n - 4..]);
    out
}
