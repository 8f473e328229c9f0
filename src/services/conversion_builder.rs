//! Builds the conversion event sent alongside a tracked download.
//!
//! Building is pure apart from reading the clock: it never fails and never
//! performs I/O. Missing request data simply leaves the matching field out
//! of the payload.

use crate::models::{
    conversion::{ConversionEvent, CustomData, UserData},
    request_context::RequestContext,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Length of the window in which repeated downloads share one event id.
pub const DEDUP_WINDOW_SECS: i64 = 60;

const ACTION_SOURCE: &str = "website";
const EVENT_VALUE: f64 = 1.0;
const EVENT_CURRENCY: &str = "USD";

#[derive(Clone, Debug)]
pub struct ConversionEventBuilder {
    event_name: String,
}

impl ConversionEventBuilder {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
        }
    }

    /// Build an event stamped with the current time.
    pub fn build(
        &self,
        ctx: &RequestContext,
        file_name: &str,
        file_url: &str,
        landing_url: Option<&str>,
    ) -> ConversionEvent {
        self.build_at(ctx, file_name, file_url, landing_url, Utc::now())
    }

    pub fn build_at(
        &self,
        ctx: &RequestContext,
        file_name: &str,
        file_url: &str,
        landing_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> ConversionEvent {
        let event_source_url = landing_url
            .filter(|url| !url.is_empty())
            .unwrap_or(file_url)
            .to_string();

        // An explicit _fbc wins; otherwise synthesize one from the raw fbclid.
        let fbc = ctx.click_id.clone().or_else(|| {
            ctx.click_id_from_url
                .as_ref()
                .map(|fbclid| format!("fb.1.{}.{}", now.timestamp_millis(), fbclid))
        });

        let user_data = UserData {
            client_ip_address: Some(ctx.client_ip.clone()).filter(|ip| !ip.is_empty()),
            client_user_agent: Some(ctx.user_agent.clone()).filter(|ua| !ua.is_empty()),
            fbp: ctx.browser_id.clone(),
            fbc,
            hashed_emails: ctx.email.as_deref().map(hash_email).into_iter().collect(),
        };

        let custom_data = CustomData {
            content_name: file_name.to_string(),
            value: EVENT_VALUE,
            currency: EVENT_CURRENCY,
            custom_properties: (!ctx.utm_params.is_empty()).then(|| ctx.utm_params.clone()),
        };

        ConversionEvent {
            event_name: self.event_name.clone(),
            event_time: now.timestamp(),
            event_id: event_id(&ctx.client_ip, file_url, now),
            action_source: ACTION_SOURCE,
            event_source_url,
            user_data,
            custom_data,
        }
    }
}

/// Deterministic id for `(ip, url, minute)`; matches the browser pixel's id
/// for the same download so the platform drops the duplicate.
pub fn event_id(client_ip: &str, file_url: &str, at: DateTime<Utc>) -> String {
    let window = at.timestamp().div_euclid(DEDUP_WINDOW_SECS);
    let digest = md5::compute(format!("{}:{}:{}", client_ip, file_url, window));
    format!("{:x}", digest)
}

/// SHA-256 of the trimmed, lowercased address, hex encoded.
pub fn hash_email(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}
