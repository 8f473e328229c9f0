//! Bucket listing against DigitalOcean Spaces through the S3 API.

use crate::models::object::ObjectDescriptor;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("listing bucket `{bucket}` failed: {message}")]
    Listing { bucket: String, message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Source of object listings for a bucket.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// All objects in `bucket` whose key starts with `prefix`, in listing order.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectDescriptor>>;
}

/// Static credentials for a Spaces access key.
#[derive(Clone)]
pub struct SpacesCredentials {
    pub access_key: String,
    pub secret_key: String,
}

/// S3-compatible lister pointed at `https://{region}.digitaloceanspaces.com`.
#[derive(Clone, Debug)]
pub struct SpacesLister {
    client: S3Client,
}

impl SpacesLister {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Build a client for `region`. Without explicit credentials the default
    /// AWS provider chain is used.
    pub async fn connect(region: &str, credentials: Option<SpacesCredentials>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(spaces_endpoint(region));

        if let Some(creds) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key,
                creds.secret_key,
                None,
                None,
                "spaces-static",
            ));
        }

        let shared_config = loader.load().await;
        Self::new(S3Client::new(&shared_config))
    }
}

pub fn spaces_endpoint(region: &str) -> String {
    format!("https://{}.digitaloceanspaces.com", region)
}

#[async_trait]
impl ObjectLister for SpacesLister {
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectDescriptor>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| StorageError::Listing {
                    bucket: bucket.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                })?;

            for obj in page.contents() {
                let Some(key) = obj.key() else {
                    continue;
                };
                // Entries without a timestamp lose every recency comparison.
                let last_modified = obj
                    .last_modified()
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                objects.push(ObjectDescriptor::new(key, last_modified));
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket, prefix, count = objects.len(), "listed bucket");
        Ok(objects)
    }
}
