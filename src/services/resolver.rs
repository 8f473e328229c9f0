//! Picks the "latest" object out of an unordered bucket listing.
//!
//! Keys carrying a dotted version tag are ranked by that tag, because upload
//! time says nothing about release order. Only when no key in the filtered
//! set has a tag does the newest `last_modified` win. Ties keep the entry
//! that appeared first in the listing, so identical input always resolves to
//! the same object.

use crate::models::{
    object::{ObjectDescriptor, Resolution, ResolvedFile, SpacesLocation},
    version::VersionTag,
};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no objects matching pattern `{0}`")]
    NoMatch(String),
}

/// Filter `objects` by `pattern`, select the latest one and build its public URL.
pub fn resolve(
    objects: &[ObjectDescriptor],
    pattern: &Regex,
    location: &SpacesLocation,
) -> Result<ResolvedFile, ResolveError> {
    let (object, resolution) = select_latest(objects, pattern)?;
    Ok(ResolvedFile {
        url: location.public_url(&object.key),
        object: object.clone(),
        resolution,
    })
}

/// Selection step of [`resolve`] without URL construction.
pub fn select_latest<'a>(
    objects: &'a [ObjectDescriptor],
    pattern: &Regex,
) -> Result<(&'a ObjectDescriptor, Resolution), ResolveError> {
    let candidates: Vec<&ObjectDescriptor> = objects
        .iter()
        .filter(|obj| pattern.is_match(&obj.key))
        .collect();

    if candidates.is_empty() {
        return Err(ResolveError::NoMatch(pattern.as_str().to_string()));
    }

    let mut best_tagged: Option<(VersionTag, &ObjectDescriptor)> = None;
    for &obj in &candidates {
        let Some(tag) = VersionTag::parse_from_key(&obj.key) else {
            continue;
        };
        let replace = match &best_tagged {
            Some((best, _)) => tag > *best,
            None => true,
        };
        if replace {
            best_tagged = Some((tag, obj));
        }
    }

    if let Some((tag, obj)) = best_tagged {
        return Ok((obj, Resolution::Version(tag)));
    }

    let mut newest = candidates[0];
    for &obj in &candidates[1..] {
        if obj.last_modified > newest.last_modified {
            newest = obj;
        }
    }
    Ok((newest, Resolution::LastModified))
}
