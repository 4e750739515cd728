//! Vault-Transit-backed `KeyService` (spec §4.1). Thin `reqwest` client
//! against HashiCorp Vault's Transit secrets engine, the same API the
//! original `vault_client.py` speaks.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pseudon_engine::error::{EngineError, Result};
use pseudon_engine::ks::{KeyService, MAX_PLAINTEXT_BYTES};
use serde::Deserialize;
use serde_json::json;

pub struct VaultTransitKeyService {
    client: reqwest::Client,
    addr: String,
    token: String,
    key_name: String,
}

impl VaultTransitKeyService {
    pub fn new(addr: String, token: String, key_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            addr,
            token,
            key_name,
        }
    }
}

#[derive(Deserialize)]
struct TransitResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Deserialize)]
struct DecryptData {
    plaintext: String,
}

#[async_trait]
impl KeyService for VaultTransitKeyService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        if plaintext.len() > MAX_PLAINTEXT_BYTES {
            return Err(EngineError::KeyUnavailable(
                "plaintext exceeds 64 KiB bound".into(),
            ));
        }

        let url = format!("{}/v1/transit/encrypt/{}", self.addr, self.key_name);
        let body = json!({ "plaintext": STANDARD.encode(plaintext) });

        let resp = self
            .client
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::KeyUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN || resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EngineError::KeyNotFound(self.key_name.clone()));
        }
        if !resp.status().is_success() {
            return Err(EngineError::KeyUnavailable(format!(
                "vault encrypt returned {}",
                resp.status()
            )));
        }

        let parsed: TransitResponse<EncryptData> = resp
            .json()
            .await
            .map_err(|e| EngineError::KeyUnavailable(e.to_string()))?;

        Ok(parsed.data.ciphertext)
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/transit/decrypt/{}", self.addr, self.key_name);
        let body = json!({ "ciphertext": ciphertext });

        let resp = self
            .client
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::KeyUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            return Err(EngineError::InvalidCiphertext);
        }
        if resp.status() == reqwest::StatusCode::FORBIDDEN || resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EngineError::KeyNotFound(self.key_name.clone()));
        }
        if !resp.status().is_success() {
            return Err(EngineError::KeyUnavailable(format!(
                "vault decrypt returned {}",
                resp.status()
            )));
        }

        let parsed: TransitResponse<DecryptData> = resp
            .json()
            .await
            .map_err(|e| EngineError::KeyUnavailable(e.to_string()))?;

        STANDARD
            .decode(parsed.data.plaintext)
            .map_err(|_| EngineError::InvalidCiphertext)
    }
}
