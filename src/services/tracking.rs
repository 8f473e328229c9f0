//! Tracking sinks for conversion events.
//!
//! A sink is chosen once at startup: the Conversions API sink when a pixel id
//! and access token are configured, otherwise [`NoopSink`]. Dispatch is best
//! effort; [`dispatch`] bounds the send with a timeout and only logs the
//! outcome.

use crate::models::conversion::ConversionEvent;
use async_trait::async_trait;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("conversion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("conversion rejected (status={status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("conversion request timed out after {0:?}")]
    Timeout(Duration),
}

/// Destination for conversion events.
///
/// Implementations must tolerate receiving the same `event_id` more than once.
#[async_trait]
pub trait TrackingSink: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Whether events sent here actually leave the process.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, event: &ConversionEvent) -> Result<(), TrackingError>;
}

/// Sink used when no tracking credentials are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl TrackingSink for NoopSink {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn send(&self, _event: &ConversionEvent) -> Result<(), TrackingError> {
        Ok(())
    }
}

/// Settings for the Meta Conversions API.
#[derive(Clone)]
pub struct MetaSettings {
    pub pixel_id: String,
    pub access_token: String,
    pub api_version: String,
    pub test_event_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventsRequest<'a> {
    data: [&'a ConversionEvent; 1],
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_event_code: Option<&'a str>,
}

/// Sends events to `POST {graph}/{version}/{pixel_id}/events`.
pub struct MetaConversionsSink {
    client: reqwest::Client,
    endpoint: String,
    settings: MetaSettings,
}

impl MetaConversionsSink {
    pub fn new(settings: MetaSettings) -> Result<Self, TrackingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(TrackingError::Client)?;
        Ok(Self::with_client(client, GRAPH_API_BASE, settings))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, settings: MetaSettings) -> Self {
        let endpoint = format!(
            "{}/{}/{}/events",
            base_url.trim_end_matches('/'),
            settings.api_version,
            settings.pixel_id
        );
        Self {
            client,
            endpoint,
            settings,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, event: &'a ConversionEvent) -> EventsRequest<'a> {
        EventsRequest {
            data: [event],
            access_token: &self.settings.access_token,
            test_event_code: self.settings.test_event_code.as_deref(),
        }
    }
}

#[async_trait]
impl TrackingSink for MetaConversionsSink {
    fn name(&self) -> &'static str {
        "meta"
    }

    async fn send(&self, event: &ConversionEvent) -> Result<(), TrackingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(event))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TrackingError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Pick the sink for this process from the optional Conversions API settings.
pub fn sink_from_settings(settings: Option<MetaSettings>) -> Arc<dyn TrackingSink> {
    let Some(settings) = settings else {
        info!("conversion tracking disabled: pixel id or access token not configured");
        return Arc::new(NoopSink);
    };

    match MetaConversionsSink::new(settings) {
        Ok(sink) => {
            info!(endpoint = %sink.endpoint(), "conversion tracking enabled");
            Arc::new(sink)
        }
        Err(err) => {
            warn!(error = %err, "conversion tracking disabled: client setup failed");
            Arc::new(NoopSink)
        }
    }
}

/// Send one event, waiting at most `timeout`. Failures are logged, never returned.
///
/// Returns whether the event was delivered; a disabled sink delivers nothing.
pub async fn dispatch(sink: &dyn TrackingSink, event: &ConversionEvent, timeout: Duration) -> bool {
    if !sink.is_enabled() {
        debug!(
            sink = sink.name(),
            event_id = %event.event_id,
            "tracking disabled, dropping event"
        );
        return false;
    }

    let outcome = match tokio::time::timeout(timeout, sink.send(event)).await {
        Ok(result) => result,
        Err(_) => Err(TrackingError::Timeout(timeout)),
    };

    match outcome {
        Ok(()) => {
            info!(
                sink = sink.name(),
                event_id = %event.event_id,
                event_name = %event.event_name,
                "conversion event sent"
            );
            true
        }
        Err(err) => {
            warn!(
                sink = sink.name(),
                event_id = %event.event_id,
                error = %err,
                "conversion event failed"
            );
            false
        }
    }
}
