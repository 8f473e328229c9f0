//! Core data models for the latest-installer redirect service.
//!
//! Listing entries and version tags feed the resolver; the request context
//! and conversion payload types feed the tracking path. All of them are
//! plain values that serialize with `serde` where they cross the wire.

pub mod conversion;
pub mod object;
pub mod request_context;
pub mod version;
