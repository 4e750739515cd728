//! Internal HTTP API (spec §6) — the contract the backend's orchestrator
//! calls directly, matching the original `app/api/internal.py` and
//! `app/api/health.py` request/response shapes field-for-field.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use pseudon_engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::error;

use crate::AppState;

#[derive(Deserialize)]
pub struct PseudonymizeRequest {
    pub text: String,
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct PseudonymizeResponse {
    pub pseudonymized_text: String,
    pub session_id: String,
    pub mapping: HashMap<String, String>,
    pub pseudonyms_count: usize,
}

#[derive(Deserialize)]
pub struct DepseudonymizeRequest {
    pub text: String,
    pub session_id: String,
}

#[derive(Serialize)]
pub struct DepseudonymizeResponse {
    pub original_text: String,
}

#[derive(Serialize)]
pub struct SessionDeletedResponse {
    pub status: &'static str,
    pub session_id: String,
}

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::InputTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EngineError::SessionMissing | EngineError::ConsentMissing { .. } => {
                StatusCode::FORBIDDEN
            }
            EngineError::KeyNotFound(_) | EngineError::BindingNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(error = %self.0, "request failed");
        (status, Json(serde_json::json!({ "detail": self.0.to_string() }))).into_response()
    }
}

async fn pseudonymize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PseudonymizeRequest>,
) -> Result<Json<PseudonymizeResponse>, ApiError> {
    let out = state.engine.pseudonymize(&req.text, req.session_id).await?;
    Ok(Json(PseudonymizeResponse {
        pseudonymized_text: out.tokenised_text,
        session_id: out.session_id,
        pseudonyms_count: out.mapping.len(),
        mapping: out.mapping,
    }))
}

async fn depseudonymize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepseudonymizeRequest>,
) -> Result<Json<DepseudonymizeResponse>, ApiError> {
    let (original_text, _stats) = state
        .engine
        .depseudonymize(&req.text, &req.session_id)
        .await?;
    Ok(Json(DepseudonymizeResponse { original_text }))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDeletedResponse>, ApiError> {
    state.engine.destroy(&session_id).await?;
    Ok(Json(SessionDeletedResponse {
        status: "deleted",
        session_id,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: HealthServices,
}

#[derive(Serialize)]
struct HealthServices {
    vault: ServiceStatus,
    redis: ServiceStatus,
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let redis_ok = state.sc_health().await;
    let vault_ok = state.ks_health().await;

    let status = if redis_ok && vault_ok { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status,
        services: HealthServices {
            vault: ServiceStatus {
                status: if vault_ok { "healthy" } else { "unreachable" },
            },
            redis: ServiceStatus {
                status: if redis_ok { "healthy" } else { "unreachable" },
            },
        },
    })
}

async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ready": true }))
}

async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "alive": true }))
}

pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    };

    Router::new()
        .route("/internal/pseudonymize", post(pseudonymize))
        .route("/internal/depseudonymize", post(depseudonymize))
        .route("/internal/session/{session_id}", delete(delete_session))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudonymize_response_serializes_expected_fields() {
        let resp = PseudonymizeResponse {
            pseudonymized_text: "RUC_ABCDEF01".into(),
            session_id: "s1".into(),
            mapping: HashMap::from([("RUC_ABCDEF01".to_string(), "1791234567001".to_string())]),
            pseudonyms_count: 1,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"pseudonymized_text\":\"RUC_ABCDEF01\""));
        assert!(json.contains("\"pseudonyms_count\":1"));
    }

    #[test]
    fn session_deleted_response_serializes() {
        let resp = SessionDeletedResponse {
            status: "deleted",
            session_id: "s1".into(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"deleted\""));
    }
}
