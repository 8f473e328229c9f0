//! Defines routes for the redirect service.
//!
//! ## Structure
//! - `GET /healthz`  — liveness
//! - `GET /`         — redirect to the latest object (`?bucket=` or default bucket)
//! - `GET /{bucket}` — redirect to the latest object in `bucket`
//!
//! All redirect routes accept `prefix`, `pattern`, `track` and the
//! attribution params (`fbp`, `fbc`, `fbclid`, `email`, `utm_*`).

use crate::{
    handlers::{
        health_handlers::healthz,
        redirect_handlers::{redirect_latest, redirect_latest_in_bucket},
    },
    services::redirect_service::RedirectService,
};
use axum::{Router, routing::get};

/// Build and return the router for the redirect endpoints.
///
/// The router carries shared state (`RedirectService`) to all handlers.
pub fn routes() -> Router<RedirectService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(redirect_latest))
        .route("/{bucket}", get(redirect_latest_in_bucket))
}
