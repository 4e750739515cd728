//! `POST /extract` (spec §6, scenario F) — the one piece of the
//! orchestrator-side contract worth modelling concretely, since end-to-end
//! scenario F is stated entirely in terms of the consent gate's observable
//! behaviour: HTTP 403 with guidance unless `confirmed == true` and
//! `session_id` is present, and no downstream call made in that case. There
//! is no real LLM call behind this (out of scope); a successful request
//! returns an acknowledgement body only.

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::post, Json, Router};
use pseudon_engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub session_id: Option<String>,
    pub confirmed: bool,
}

#[derive(Serialize)]
struct ExtractAccepted {
    status: &'static str,
    session_id: String,
}

#[derive(Serialize)]
struct ConsentRejected {
    error: &'static str,
    guidance: Option<String>,
}

async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    match state
        .engine
        .consent_gate()
        .require_confirmation(req.session_id.as_deref(), req.confirmed)
    {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ExtractAccepted {
                status: "would_extract",
                session_id: req.session_id.unwrap_or_default(),
            }),
        )
            .into_response(),
        Err(EngineError::SessionMissing) => (
            StatusCode::FORBIDDEN,
            Json(ConsentRejected {
                error: "session_missing",
                guidance: None,
            }),
        )
            .into_response(),
        Err(EngineError::ConsentMissing { guidance }) => (
            StatusCode::FORBIDDEN,
            Json(ConsentRejected {
                error: "consent_missing",
                guidance: Some(guidance),
            }),
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/extract", post(extract))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_app_state_for_tests;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn rejects_unconfirmed_extraction_with_403_and_guidance() {
        let state = build_app_state_for_tests();
        let app = router().with_state(state);

        let body = serde_json::json!({ "session_id": "s1", "confirmed": false });
        let req = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "consent_missing");
        assert!(json["guidance"].as_str().unwrap().contains("Protección de Datos"));
    }

    #[tokio::test]
    async fn rejects_missing_session_with_403() {
        let state = build_app_state_for_tests();
        let app = router().with_state(state);

        let body = serde_json::json!({ "session_id": null, "confirmed": true });
        let req = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn accepts_confirmed_extraction_with_session() {
        let state = build_app_state_for_tests();
        let app = router().with_state(state);

        let body = serde_json::json!({ "session_id": "s1", "confirmed": true });
        let req = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
}
