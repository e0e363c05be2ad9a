//! Per-call send options and outbound request assembly.
//!
//! [`RequestBuilder`] turns a subscription, a payload and the effective
//! authentication settings into a [`RequestSpec`]. It performs no I/O; the
//! client hands the result to the HTTP transport.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::encryption::Encryptor;
use crate::error::{Result, WebPushError};
use crate::subscription::PushSubscription;
use crate::vapid::{build_auth_headers, VapidDetails};

/// Default time-to-live: four weeks.
pub const DEFAULT_TTL: u32 = 2_419_200;

/// Longest `Topic` push services accept.
pub const MAX_TOPIC_LEN: usize = 32;

/// Endpoints under this prefix belong to the legacy GCM service.
pub const GCM_ENDPOINT_PREFIX: &str = "https://android.googleapis.com/gcm/send";

/// Content encoding of encrypted bodies.
pub const AES128GCM: &str = "aes128gcm";

const TTL: &str = "ttl";
const URGENCY: &str = "urgency";
const TOPIC: &str = "topic";
const CRYPTO_KEY: &str = "crypto-key";

/// Delivery urgency hint (RFC 8030 section 5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    /// Deliver only on power and Wi-Fi.
    VeryLow,
    /// Deliver on power or Wi-Fi.
    Low,
    /// Deliver when not on low battery.
    Normal,
    /// Deliver immediately.
    High,
}

impl Urgency {
    /// Header value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = WebPushError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "very-low" => Ok(Self::VeryLow),
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(WebPushError::validation(format!(
                "urgency must be one of very-low, low, normal, high; got {other:?}"
            ))),
        }
    }
}

/// Options recognised by a single send.
///
/// The set of fields is closed: parsing from JSON with
/// [`SendOptions::from_json`] rejects any other key, including recognised
/// names with the wrong letter case.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendOptions {
    /// Legacy GCM API key for this call.
    #[serde(rename = "gcmApiKey")]
    pub gcm_api_key: Option<String>,
    /// VAPID settings for this call, overriding the client's.
    #[serde(rename = "vapidDetails")]
    pub vapid_details: Option<VapidDetails>,
    /// Seconds the push service keeps an undelivered message.
    #[serde(rename = "TTL")]
    pub ttl: Option<u32>,
    /// Delivery urgency.
    pub urgency: Option<Urgency>,
    /// Replacement key: a newer message with the same topic supersedes an
    /// undelivered older one.
    pub topic: Option<String>,
    /// Extra headers sent verbatim (computed headers take precedence).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl SendOptions {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object, rejecting unrecognised keys.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| WebPushError::validation(format!("invalid send options: {e}")))
    }

    /// Set the GCM API key for this call.
    pub fn gcm_api_key(mut self, key: impl Into<String>) -> Self {
        self.gcm_api_key = Some(key.into());
        self
    }

    /// Override VAPID settings for this call.
    pub fn vapid_details(mut self, details: VapidDetails) -> Self {
        self.vapid_details = Some(details);
        self
    }

    /// Set the time-to-live in seconds.
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the urgency.
    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Set the topic.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Add an extra header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A fully formed push request, ready for the transport.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Always `POST`.
    pub method: Method,
    /// The subscription endpoint.
    pub endpoint: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encrypted body; `None` for an empty payload.
    pub body: Option<Vec<u8>>,
}

/// Assembles requests from the effective client settings.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    /// Client-level VAPID settings.
    pub vapid: Option<&'a VapidDetails>,
    /// Client-level GCM API key.
    pub gcm_api_key: Option<&'a str>,
    /// TTL used when the call does not set one.
    pub default_ttl: u32,
    /// Payload encryptor.
    pub encryptor: Encryptor,
}

impl Default for RequestBuilder<'_> {
    fn default() -> Self {
        Self {
            vapid: None,
            gcm_api_key: None,
            default_ttl: DEFAULT_TTL,
            encryptor: Encryptor::default(),
        }
    }
}

impl RequestBuilder<'_> {
    /// Build the request for one message.
    ///
    /// Per-call options override the client-level settings. VAPID, when
    /// present, always wins over a GCM key.
    pub fn build(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
        options: &SendOptions,
    ) -> Result<RequestSpec> {
        let vapid = options.vapid_details.as_ref().or(self.vapid);
        let gcm_api_key = match options.gcm_api_key.as_deref() {
            Some("") => return Err(WebPushError::validation("gcmApiKey must not be empty")),
            Some(key) => Some(key),
            None => self.gcm_api_key,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            insert(&mut headers, header_name(name)?, value)?;
        }

        let ttl = options.ttl.unwrap_or(self.default_ttl);
        headers.insert(TTL, HeaderValue::from(ttl));

        if let Some(urgency) = options.urgency {
            headers.insert(URGENCY, HeaderValue::from_static(urgency.as_str()));
        }

        if let Some(topic) = &options.topic {
            validate_topic(topic)?;
            insert(&mut headers, HeaderName::from_static(TOPIC), topic)?;
        }

        let body = if payload.is_empty() {
            None
        } else {
            let body = self.encryptor.encrypt(subscription, payload)?.to_body();
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(AES128GCM));
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            Some(body)
        };

        if let Some(details) = vapid {
            let auth = build_auth_headers(subscription, details, details.expiration_secs())?;
            insert(&mut headers, AUTHORIZATION, &auth.authorization)?;
            insert(&mut headers, HeaderName::from_static(CRYPTO_KEY), &auth.crypto_key)?;
        } else if let Some(key) = gcm_api_key.filter(|_| is_gcm_endpoint(subscription)) {
            insert(&mut headers, AUTHORIZATION, &format!("key={key}"))?;
        }

        log::debug!(
            "[WebPush] Built request for {} ({} headers, {} byte body)",
            subscription.audience(),
            headers.len(),
            body.as_ref().map_or(0, Vec::len)
        );

        Ok(RequestSpec {
            method: Method::POST,
            endpoint: subscription.endpoint().clone(),
            headers,
            body,
        })
    }
}

/// Whether the subscription points at the legacy GCM service.
pub fn is_gcm_endpoint(subscription: &PushSubscription) -> bool {
    subscription.endpoint().as_str().starts_with(GCM_ENDPOINT_PREFIX)
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() || topic.len() > MAX_TOPIC_LEN {
        return Err(WebPushError::validation(format!(
            "topic must be 1 to {MAX_TOPIC_LEN} characters, got {}",
            topic.len()
        )));
    }
    if !topic
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(WebPushError::validation(
            "topic must use the URL-safe base64 alphabet",
        ));
    }
    Ok(())
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| WebPushError::validation(format!("invalid header name {name:?}: {e}")))
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| WebPushError::validation(format!("invalid value for header {name}: {e}")))?;
    headers.insert(name, value);
    Ok(())
}
