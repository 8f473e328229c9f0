//! HTTP handlers for the redirect endpoints.
//! Parsing and response shaping only; the flow itself lives in
//! `RedirectService`. Query strings are taken as raw pairs so a repeated
//! key never turns into a rejected request.

use crate::{
    errors::AppError,
    models::{object::ResolvedFile, request_context::RedirectParams},
    services::redirect_service::RedirectService,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// `GET /?bucket=…` — redirect to the latest object of the requested bucket.
pub async fn redirect_latest(
    State(service): State<RedirectService>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let params = RedirectParams::from_pairs(pairs);
    let resolved = service.redirect_latest(None, &params, &headers).await?;
    found(&resolved)
}

/// `GET /{bucket}` — same as above with the bucket in the path.
pub async fn redirect_latest_in_bucket(
    State(service): State<RedirectService>,
    Path(bucket): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let params = RedirectParams::from_pairs(pairs);
    let resolved = service
        .redirect_latest(Some(bucket), &params, &headers)
        .await?;
    found(&resolved)
}

fn found(resolved: &ResolvedFile) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(&resolved.url).map_err(|err| {
        AppError::internal(format!(
            "object key `{}` is not a valid redirect target: {}",
            resolved.key(),
            err
        ))
    })?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
