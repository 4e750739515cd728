//! Cryptographic Key Service (spec §4.1) — holds the encryption key for
//! reverse bindings; the key never leaves an implementation of this trait.
//! `pseudon-engine` only depends on the trait; `pseudon-service` supplies a
//! Vault-Transit-backed implementation, this crate supplies an in-memory one
//! for tests and a dependency-free dev mode.

use crate::error::{EngineError, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

/// Input bound from spec §4.1.
pub const MAX_PLAINTEXT_BYTES: usize = 64 * 1024;

#[async_trait]
pub trait KeyService: Send + Sync {
    /// Encrypt `plaintext`, returning a self-describing opaque ciphertext
    /// (carries its own key id/version, per §4.1's contract).
    async fn encrypt(&self, plaintext: &[u8]) -> Result<String>;

    /// Decrypt a ciphertext produced by `encrypt`.
    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>>;
}

/// Reference `KeyService` backed by one process-lifetime AES-256-GCM key.
/// Ciphertexts are `"v1:" + base64(nonce || ciphertext)` — self-describing
/// enough that a future key rotation could add a `"v2:"` prefix without
/// breaking existing bindings.
pub struct InMemoryKeyService {
    cipher: Aes256Gcm,
}

impl InMemoryKeyService {
    pub fn new() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }
}

impl Default for InMemoryKeyService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyService for InMemoryKeyService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        if plaintext.len() > MAX_PLAINTEXT_BYTES {
            return Err(EngineError::KeyUnavailable(
                "plaintext exceeds 64 KiB bound".into(),
            ));
        }

        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| EngineError::KeyUnavailable(e.to_string()))?;

        let mut payload = Vec::with_capacity(12 + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("v1:{}", STANDARD.encode(payload)))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        let body = ciphertext
            .strip_prefix("v1:")
            .ok_or_else(|| EngineError::KeyNotFound(format!("unknown key version in {ciphertext}")))?;

        let payload = STANDARD
            .decode(body)
            .map_err(|_| EngineError::InvalidCiphertext)?;

        if payload.len() < 12 {
            return Err(EngineError::InvalidCiphertext);
        }
        let (nonce_bytes, ct) = payload.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ct)
            .map_err(|_| EngineError::InvalidCiphertext)
    }
}
