use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    conversion_builder::ConversionEventBuilder, listing::SpacesLister,
    redirect_service::RedirectService, tracking,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cfg.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting latest-installer with config: {:?}", cfg);

    // --- Collaborators, resolved once per process ---
    let lister = SpacesLister::connect(&cfg.region, cfg.spaces_credentials.clone()).await;
    let sink = tracking::sink_from_settings(cfg.meta.clone());

    let service = RedirectService::new(
        Arc::new(lister),
        sink,
        ConversionEventBuilder::new(cfg.event_name.clone()),
        cfg.redirect_defaults(),
        cfg.tracking_timeout,
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
