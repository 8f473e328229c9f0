//! Attribution data pulled out of an inbound redirect request.

use axum::http::{HeaderMap, header};
use std::{collections::BTreeMap, fmt};

/// UTM parameters forwarded to the tracking platform as custom properties.
pub const UTM_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// Query params accepted by the redirect endpoints.
#[derive(Debug, Default)]
pub struct RedirectParams {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub pattern: Option<String>,
    pub track: Option<String>,
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub fbclid: Option<String>,
    pub email: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl RedirectParams {
    /// Collect params from decoded query pairs.
    ///
    /// Ad platforms and link shorteners sometimes append a tracking key twice;
    /// the last value wins and unknown keys are ignored, so no query string is
    /// ever rejected.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "bucket" => &mut params.bucket,
                "prefix" => &mut params.prefix,
                "pattern" => &mut params.pattern,
                "track" => &mut params.track,
                "fbp" => &mut params.fbp,
                "fbc" => &mut params.fbc,
                "fbclid" => &mut params.fbclid,
                "email" => &mut params.email,
                "utm_source" => &mut params.utm_source,
                "utm_medium" => &mut params.utm_medium,
                "utm_campaign" => &mut params.utm_campaign,
                "utm_term" => &mut params.utm_term,
                "utm_content" => &mut params.utm_content,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    /// Whether the caller asked for a conversion event.
    ///
    /// Any non-empty value enables tracking except the usual negatives.
    pub fn tracking_requested(&self) -> bool {
        match self.track.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            ),
        }
    }

    fn utm_value(&self, key: &str) -> Option<&str> {
        match key {
            "utm_source" => self.utm_source.as_deref(),
            "utm_medium" => self.utm_medium.as_deref(),
            "utm_campaign" => self.utm_campaign.as_deref(),
            "utm_term" => self.utm_term.as_deref(),
            "utm_content" => self.utm_content.as_deref(),
            _ => None,
        }
    }
}

/// Everything the conversion event needs from the request.
///
/// Built once per request and dropped once the event is built.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// First hop of `x-forwarded-for`, or empty.
    pub client_ip: String,
    pub user_agent: String,
    /// `referer` header; the landing page the download link was clicked on.
    pub referrer: String,
    /// `_fbp` browser id.
    pub browser_id: Option<String>,
    /// `_fbc` click id cookie value.
    pub click_id: Option<String>,
    /// Raw `fbclid` from the landing page URL.
    pub click_id_from_url: Option<String>,
    pub utm_params: BTreeMap<String, String>,
    pub email: Option<String>,
}

impl RequestContext {
    pub fn from_request(headers: &HeaderMap, params: &RedirectParams) -> Self {
        let client_ip = header_str(headers, "x-forwarded-for")
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let utm_params = UTM_KEYS
            .iter()
            .filter_map(|key| {
                params
                    .utm_value(key)
                    .filter(|value| !value.is_empty())
                    .map(|value| (key.to_string(), value.to_string()))
            })
            .collect();

        Self {
            client_ip,
            user_agent: header_str(headers, header::USER_AGENT.as_str()).to_string(),
            referrer: header_str(headers, header::REFERER.as_str()).to_string(),
            browser_id: non_empty(&params.fbp),
            click_id: non_empty(&params.fbc),
            click_id_from_url: non_empty(&params.fbclid),
            utm_params,
            email: non_empty(&params.email),
        }
    }
}

// Keeps the email address out of logs.
impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("client_ip", &self.client_ip)
            .field("user_agent", &self.user_agent)
            .field("referrer", &self.referrer)
            .field("browser_id", &self.browser_id)
            .field("click_id", &self.click_id)
            .field("click_id_from_url", &self.click_id_from_url)
            .field("utm_params", &self.utm_params)
            .field("email", &self.email.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
