//! Conversion event payload in the shape the Conversions API expects.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single server-side conversion event.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ConversionEvent {
    pub event_name: String,

    /// Unix seconds at build time.
    pub event_time: i64,

    /// Deduplication key shared with the browser pixel.
    pub event_id: String,

    pub action_source: &'static str,

    pub event_source_url: String,

    pub user_data: UserData,

    pub custom_data: CustomData,
}

/// Identity fields used for matching. Empty values are left out entirely.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,

    /// SHA-256 hex digests of normalized email addresses.
    #[serde(rename = "em", skip_serializing_if = "Vec::is_empty")]
    pub hashed_emails: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CustomData {
    pub content_name: String,
    pub value: f64,
    pub currency: &'static str,

    /// UTM parameters, sent as top-level custom properties.
    #[serde(flatten)]
    pub custom_properties: Option<BTreeMap<String, String>>,
}
