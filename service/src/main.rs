//! Binary entry point for the pseudonymization service: wires a real
//! Vault-Transit key service and Redis session cache (or their in-memory
//! stand-ins in debug mode) into `pseudon-engine`, and serves the HTTP
//! contract of spec §6.

mod api;
mod config;
mod consent;
mod ks_vault;
#[cfg(feature = "remote-ner")]
mod ner_remote;
mod sc_redis;

use anyhow::{Context, Result};
use config::Config;
use pseudon_engine::detect::ner::{HeuristicNerBackend, NerBackend};
use pseudon_engine::ks::{InMemoryKeyService, KeyService};
use pseudon_engine::sc::{InMemorySessionCache, SessionCache};
use pseudon_engine::{Engine, EngineConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub engine: Engine,
    sc: Arc<dyn SessionCache>,
    ks: Arc<dyn KeyService>,
}

impl AppState {
    /// Best-effort probe, not a substitute for a real Redis `PING` — the
    /// trait only exposes get/set/delete_pattern, so a harmless read stands
    /// in for a health check without widening `SessionCache`'s contract.
    pub async fn sc_health(&self) -> bool {
        tokio::time::timeout(Duration::from_secs(2), self.sc.get("__healthcheck__"))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    pub async fn ks_health(&self) -> bool {
        tokio::time::timeout(Duration::from_secs(2), self.ks.encrypt(b"healthcheck"))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }
}

fn build_ner_backend(config: &Config) -> Arc<dyn NerBackend> {
    match config.ner_backend.as_str() {
        "remote" => {
            #[cfg(feature = "remote-ner")]
            {
                let url = config
                    .remote_ner_url
                    .clone()
                    .expect("Config::from_env validates this is set for ner_backend=remote");
                Arc::new(ner_remote::RemoteNerBackend::new(url))
            }
            #[cfg(not(feature = "remote-ner"))]
            {
                tracing::warn!(
                    "PSEUDON_NER_BACKEND=remote requested but built without the remote-ner feature; falling back to the heuristic backend"
                );
                Arc::new(HeuristicNerBackend::new())
            }
        }
        _ => Arc::new(HeuristicNerBackend::new()),
    }
}

async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let (ks, sc): (Arc<dyn KeyService>, Arc<dyn SessionCache>) = if config.debug {
        tracing::warn!("PSEUDON_DEBUG=true: using in-memory key service and session cache");
        (
            Arc::new(InMemoryKeyService::new()),
            Arc::new(InMemorySessionCache::new()),
        )
    } else {
        let ks: Arc<dyn KeyService> = Arc::new(ks_vault::VaultTransitKeyService::new(
            config.vault_addr.clone(),
            config.vault_token.clone(),
            config.vault_key_name.clone(),
        ));
        let sc: Arc<dyn SessionCache> = Arc::new(
            sc_redis::RedisSessionCache::connect(
                &config.redis_host,
                config.redis_port,
                config.redis_password.as_deref(),
                config.redis_db,
            )
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to redis: {e}"))?,
        );
        (ks, sc)
    };

    let ner_backend = build_ner_backend(config);

    let engine_config = EngineConfig {
        max_text_bytes: config.max_text_length,
        binding_ttl: config.binding_ttl(),
        ks_timeout: Duration::from_secs(10),
        sc_timeout: Duration::from_secs(5),
    };

    let engine = Engine::new(ks.clone(), sc.clone(), ner_backend, engine_config);
    Ok(Arc::new(AppState { engine, sc, ks }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = build_state(&config).await?;

    let router = api::build_router(state.clone(), &config.cors_origins)
        .merge(consent::router().with_state(state.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "pseudon-service listening");
    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn build_app_state_for_tests() -> Arc<AppState> {
    let ks: Arc<dyn KeyService> = Arc::new(InMemoryKeyService::new());
    let sc: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());
    let ner_backend: Arc<dyn NerBackend> = Arc::new(HeuristicNerBackend::new());
    let engine = Engine::new(ks.clone(), sc.clone(), ner_backend, EngineConfig::default());
    Arc::new(AppState { engine, sc, ks })
}
