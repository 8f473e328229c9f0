//! Health handler.
//!
//! - GET /healthz  -> simple liveness ("ok") plus the active tracking sink

use crate::services::redirect_service::RedirectService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz(State(service): State<RedirectService>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            tracking: service.tracking_sink_name(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    tracking: &'static str,
}
