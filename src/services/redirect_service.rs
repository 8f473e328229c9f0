//! Per-request flow behind the redirect endpoints:
//! list the bucket, resolve the latest object, optionally emit a conversion
//! event, and hand back the file to redirect to.
//!
//! Holds only immutable shared handles, so clones are cheap and requests never
//! share mutable state.

use crate::{
    models::{
        object::{ResolvedFile, SpacesLocation},
        request_context::{RedirectParams, RequestContext},
    },
    services::{
        conversion_builder::ConversionEventBuilder,
        listing::{ObjectLister, StorageError},
        resolver::{self, ResolveError},
        tracking::{self, TrackingSink},
    },
};
use axum::http::HeaderMap;
use regex::Regex;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("bucket parameter or SPACES_BUCKET environment variable required")]
    MissingBucket,
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("No files found in specified location")]
    EmptyListing,
    #[error("No files matching pattern: {0}")]
    NoMatch(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ResolveError> for RedirectError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoMatch(pattern) => RedirectError::NoMatch(pattern),
        }
    }
}

/// Values used when a request does not name them.
#[derive(Clone, Debug)]
pub struct RedirectDefaults {
    pub bucket: Option<String>,
    pub prefix: String,
    pub pattern: String,
    pub region: String,
}

#[derive(Clone)]
pub struct RedirectService {
    lister: Arc<dyn ObjectLister>,
    sink: Arc<dyn TrackingSink>,
    builder: ConversionEventBuilder,
    defaults: Arc<RedirectDefaults>,
    tracking_timeout: Duration,
}

impl RedirectService {
    pub fn new(
        lister: Arc<dyn ObjectLister>,
        sink: Arc<dyn TrackingSink>,
        builder: ConversionEventBuilder,
        defaults: RedirectDefaults,
        tracking_timeout: Duration,
    ) -> Self {
        Self {
            lister,
            sink,
            builder,
            defaults: Arc::new(defaults),
            tracking_timeout,
        }
    }

    pub fn tracking_sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Resolve the latest file for a request and, when asked, track it.
    ///
    /// `path_bucket` takes precedence over `?bucket=`, which takes precedence
    /// over the configured default. Tracking never changes the result.
    pub async fn redirect_latest(
        &self,
        path_bucket: Option<String>,
        params: &RedirectParams,
        headers: &HeaderMap,
    ) -> Result<ResolvedFile, RedirectError> {
        let bucket = path_bucket
            .or_else(|| params.bucket.clone())
            .or_else(|| self.defaults.bucket.clone())
            .filter(|b| !b.trim().is_empty())
            .ok_or(RedirectError::MissingBucket)?;
        let prefix = params.prefix.as_deref().unwrap_or(&self.defaults.prefix);
        let pattern_src = params.pattern.as_deref().unwrap_or(&self.defaults.pattern);

        let pattern = Regex::new(pattern_src).map_err(|source| RedirectError::InvalidPattern {
            pattern: pattern_src.to_string(),
            source,
        })?;

        let objects = self.lister.list(&bucket, prefix).await?;
        if objects.is_empty() {
            return Err(RedirectError::EmptyListing);
        }

        let location = SpacesLocation::new(bucket.as_str(), self.defaults.region.as_str());
        let resolved = resolver::resolve(&objects, &pattern, &location)?;
        info!(
            bucket = %bucket,
            prefix,
            pattern = pattern_src,
            candidates = objects.len(),
            key = %resolved.key(),
            resolution = ?resolved.resolution,
            "resolved latest object"
        );

        if params.tracking_requested() {
            self.track(&resolved, params, headers).await;
        }

        Ok(resolved)
    }

    async fn track(&self, resolved: &ResolvedFile, params: &RedirectParams, headers: &HeaderMap) {
        let ctx = RequestContext::from_request(headers, params);
        let landing_url = Some(ctx.referrer.as_str());
        let event = self
            .builder
            .build(&ctx, resolved.key(), &resolved.url, landing_url);
        tracking::dispatch(self.sink.as_ref(), &event, self.tracking_timeout).await;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::object::{ObjectDescriptor, Resolution};
    use axum::http::HeaderValue;
    use chrono::{TimeZone, Utc};

    fn objects() -> Vec<ObjectDescriptor> {
        let at = |secs: i64| Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        vec![
            ObjectDescriptor::new("installers/app-1.2.0.dmg", at(300)),
            ObjectDescriptor::new("installers/app-1.10.0.dmg", at(100)),
            ObjectDescriptor::new("installers/app-1.10.0.exe", at(200)),
        ]
    }

    #[tokio::test]
    async fn resolves_from_default_bucket() {
        let lister = Arc::new(StaticLister::new(objects()));
        let sink = Arc::new(RecordingSink::default());
        let service = service(lister.clone(), sink.clone(), Some("downloads"));

        let resolved = service
            .redirect_latest(None, &RedirectParams::default(), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(resolved.key(), "installers/app-1.10.0.dmg");
        assert_eq!(
            resolved.url,
            "https://downloads.nyc3.digitaloceanspaces.com/installers/app-1.10.0.dmg"
        );
        assert_eq!(
            resolved.resolution,
            Resolution::Version(crate::models::version::VersionTag::new(1, 10, 0, None))
        );
        assert_eq!(
            lister.calls.lock().unwrap().as_slice(),
            &[("downloads".to_string(), String::new())]
        );
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_bucket_beats_query_and_default() {
        let lister = Arc::new(StaticLister::new(objects()));
        let service = service(lister.clone(), Arc::new(RecordingSink::default()), Some("default"));
        let params = RedirectParams {
            bucket: Some("query".into()),
            prefix: Some("installers/".into()),
            ..Default::default()
        };

        service
            .redirect_latest(Some("path".into()), &params, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(
            lister.calls.lock().unwrap().as_slice(),
            &[("path".to_string(), "installers/".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_bucket_is_rejected_before_listing() {
        let lister = Arc::new(StaticLister::new(objects()));
        let service = service(lister.clone(), Arc::new(RecordingSink::default()), None);

        let err = service
            .redirect_latest(None, &RedirectParams::default(), &HeaderMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RedirectError::MissingBucket));
        assert!(lister.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected() {
        let service = service(
            Arc::new(StaticLister::new(objects())),
            Arc::new(RecordingSink::default()),
            Some("downloads"),
        );
        let params = RedirectParams {
            pattern: Some("(".into()),
            ..Default::default()
        };

        let err = service
            .redirect_latest(None, &params, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RedirectError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn empty_listing_and_no_match_are_distinct() {
        let empty = service(
            Arc::new(StaticLister::new(Vec::new())),
            Arc::new(RecordingSink::default()),
            Some("downloads"),
        );
        let err = empty
            .redirect_latest(None, &RedirectParams::default(), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RedirectError::EmptyListing));

        let unmatched = service(
            Arc::new(StaticLister::new(objects())),
            Arc::new(RecordingSink::default()),
            Some("downloads"),
        );
        let params = RedirectParams {
            pattern: Some(r"\.pkg$".into()),
            ..Default::default()
        };
        let err = unmatched
            .redirect_latest(None, &params, &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), r"No files matching pattern: \.pkg$");
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let service = service(
            Arc::new(StaticLister::failing()),
            Arc::new(RecordingSink::default()),
            Some("downloads"),
        );
        let err = service
            .redirect_latest(None, &RedirectParams::default(), &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RedirectError::Storage(_)));
    }

    #[tokio::test]
    async fn tracked_requests_emit_one_event() {
        let sink = Arc::new(RecordingSink::default());
        let lister = Arc::new(StaticLister::new(objects()));
        let service = service(lister, sink.clone(), Some("downloads"));
        let params = RedirectParams {
            track: Some("all".into()),
            pattern: Some(r"\.exe$".into()),
            email: Some("Buyer@Example.com".into()),
            utm_source: Some("ads".into()),
            ..Default::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.0.2.1, 10.0.0.1"));
        headers.insert("referer", HeaderValue::from_static("https://example.com/get"));

        let resolved = service
            .redirect_latest(None, &params, &headers)
            .await
            .unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.custom_data.content_name, resolved.key());
        assert_eq!(event.event_source_url, "https://example.com/get");
        assert_eq!(event.user_data.client_ip_address.as_deref(), Some("192.0.2.1"));
        assert_eq!(event.user_data.hashed_emails.len(), 1);
        assert!(!serde_json::to_string(event).unwrap().contains("Buyer@Example.com"));
    }

    #[tokio::test]
    async fn tracking_failure_keeps_the_redirect() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let lister = Arc::new(StaticLister::new(objects()));
        let service = service(lister, sink.clone(), Some("downloads"));
        let params = RedirectParams {
            track: Some("1".into()),
            ..Default::default()
        };

        let resolved = service
            .redirect_latest(None, &params, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(resolved.key(), "installers/app-1.10.0.dmg");
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}
