//! Represents objects returned by a bucket listing and the one we redirect to.

use crate::models::version::VersionTag;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single entry from a bucket listing.
///
/// Descriptors are built by the listing layer and never mutated afterwards.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Timestamp reported by the provider for the last upload of this key.
    pub last_modified: DateTime<Utc>,
}

impl ObjectDescriptor {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_modified,
        }
    }
}

/// How the resolver arrived at its choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Highest dotted version tag among the tagged keys.
    Version(VersionTag),
    /// No key carried a tag; newest upload won.
    LastModified,
}

/// The object selected as "latest", plus the public URL clients are sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFile {
    pub object: ObjectDescriptor,
    pub url: String,
    pub resolution: Resolution,
}

impl ResolvedFile {
    pub fn key(&self) -> &str {
        &self.object.key
    }
}

/// Bucket + region pair that determines where objects are publicly served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpacesLocation {
    pub bucket: String,
    pub region: String,
}

impl SpacesLocation {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    /// Public URL of `key` on the Spaces CDN-less origin.
    ///
    /// Each `/`-separated segment is percent-encoded so keys with spaces or
    /// non-ASCII names still produce a valid `Location` header.
    pub fn public_url(&self, key: &str) -> String {
        let path = key
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "https://{}.{}.digitaloceanspaces.com/{}",
            self.bucket, self.region, path
        )
    }
}
