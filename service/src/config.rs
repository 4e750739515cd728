//! Environment configuration for the pseudonymization service.

use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Redis host backing the session cache.
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: u8,

    /// HashiCorp Vault Transit endpoint backing the key service.
    pub vault_addr: String,
    pub vault_token: String,
    pub vault_key_name: String,

    /// Session binding TTL, 1-24 hours.
    pub ttl_hours: u64,

    /// Per-call input cap in bytes.
    pub max_text_length: usize,

    /// Per-session binding cap, to bound cache growth on pathological input.
    pub max_pseudonyms_per_session: usize,

    /// Comma-separated allowed CORS origins.
    pub cors_origins: Vec<String>,

    /// `tracing_subscriber::EnvFilter` directive.
    pub log_level: String,

    /// Verbose logging and in-memory KS/SC backends instead of Vault/Redis.
    pub debug: bool,

    pub host: String,
    pub port: u16,

    /// `heuristic` (default) or `remote`.
    pub ner_backend: String,
    pub remote_ner_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let debug = std::env::var("PSEUDON_DEBUG")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .unwrap_or(false);

        let ner_backend =
            std::env::var("PSEUDON_NER_BACKEND").unwrap_or_else(|_| "heuristic".into());

        Ok(Config {
            redis_host: std::env::var("PSEUDON_REDIS_HOST").unwrap_or_else(|_| "localhost".into()),
            redis_port: std::env::var("PSEUDON_REDIS_PORT")
                .unwrap_or_else(|_| "6379".into())
                .parse()
                .context("Invalid PSEUDON_REDIS_PORT")?,
            redis_password: std::env::var("PSEUDON_REDIS_PASSWORD").ok(),
            redis_db: std::env::var("PSEUDON_REDIS_DB")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .context("Invalid PSEUDON_REDIS_DB")?,

            vault_addr: std::env::var("PSEUDON_VAULT_ADDR")
                .unwrap_or_else(|_| "http://127.0.0.1:8200".into()),
            vault_token: std::env::var("PSEUDON_VAULT_TOKEN").unwrap_or_default(),
            vault_key_name: std::env::var("PSEUDON_VAULT_KEY_NAME")
                .unwrap_or_else(|_| "pseudon".into()),

            ttl_hours: std::env::var("PSEUDON_TTL_HOURS")
                .unwrap_or_else(|_| "4".into())
                .parse()
                .context("Invalid PSEUDON_TTL_HOURS")?,

            max_text_length: std::env::var("PSEUDON_MAX_TEXT_LENGTH")
                .unwrap_or_else(|_| "102400".into())
                .parse()
                .context("Invalid PSEUDON_MAX_TEXT_LENGTH")?,

            max_pseudonyms_per_session: std::env::var("PSEUDON_MAX_PSEUDONYMS_PER_SESSION")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .context("Invalid PSEUDON_MAX_PSEUDONYMS_PER_SESSION")?,

            cors_origins: std::env::var("PSEUDON_CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            log_level: std::env::var("PSEUDON_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            debug,

            host: std::env::var("PSEUDON_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PSEUDON_PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("Invalid PSEUDON_PORT")?,

            remote_ner_url: if ner_backend == "remote" {
                Some(
                    std::env::var("PSEUDON_REMOTE_NER_URL")
                        .context("PSEUDON_REMOTE_NER_URL is required when PSEUDON_NER_BACKEND=remote")?,
                )
            } else {
                std::env::var("PSEUDON_REMOTE_NER_URL").ok()
            },
            ner_backend,
        })
    }

    pub fn binding_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.clamp(1, 24) * 3600)
    }
}
