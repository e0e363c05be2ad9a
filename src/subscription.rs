//! Browser push subscriptions.
//!
//! A subscription is produced by the browser (`PushManager.subscribe()`) and
//! handed to us as an endpoint URL plus two base64url strings. Construction
//! decodes and validates everything once so the rest of the pipeline can
//! work with fixed-size byte arrays.

// Rust guideline compliant 2026-02

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, WebPushError};

/// Length of an uncompressed SEC1 P-256 point (`0x04 || X || Y`).
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of the subscription auth secret.
pub const AUTH_SECRET_LEN: usize = 16;

/// URL-safe base64 that accepts input with or without `=` padding.
const BASE64URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64url string, tolerating optional padding.
pub(crate) fn decode_base64url(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    BASE64URL_LENIENT.decode(input.trim())
}

/// A validated browser push subscription.
///
/// Immutable once constructed. The receiver key is guaranteed to be a
/// 65-byte uncompressed point and the auth secret exactly 16 bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubscriptionJson", into = "SubscriptionJson")]
pub struct PushSubscription {
    endpoint: Url,
    p256dh: [u8; PUBLIC_KEY_LEN],
    auth: [u8; AUTH_SECRET_LEN],
    expiration_time: Option<i64>,
}

impl PushSubscription {
    /// Validate and decode a subscription.
    ///
    /// Fails with [`WebPushError::Validation`] when the endpoint is not an
    /// absolute URL, the receiver key is not a 65-byte point starting with
    /// `0x04`, or the auth secret is not 16 bytes.
    pub fn new(endpoint: &str, p256dh: &str, auth: &str) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;

        let key_bytes = decode_base64url(p256dh).map_err(|e| {
            WebPushError::validation(format!("p256dh is not valid base64url: {e}"))
        })?;
        if key_bytes.len() != PUBLIC_KEY_LEN || key_bytes[0] != 0x04 {
            return Err(WebPushError::validation(format!(
                "p256dh must be a 65-byte uncompressed P-256 point, got {} bytes",
                key_bytes.len()
            )));
        }

        let auth_bytes = decode_base64url(auth).map_err(|e| {
            WebPushError::validation(format!("auth secret is not valid base64url: {e}"))
        })?;
        if auth_bytes.len() != AUTH_SECRET_LEN {
            return Err(WebPushError::validation(format!(
                "auth secret must be 16 bytes, got {}",
                auth_bytes.len()
            )));
        }

        let mut p256dh = [0u8; PUBLIC_KEY_LEN];
        p256dh.copy_from_slice(&key_bytes);
        let mut auth = [0u8; AUTH_SECRET_LEN];
        auth.copy_from_slice(&auth_bytes);

        Ok(Self {
            endpoint,
            p256dh,
            auth,
            expiration_time: None,
        })
    }

    /// Parse the JSON produced by the browser's `PushSubscription.toJSON()`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WebPushError::validation(format!("invalid subscription JSON: {e}")))
    }

    /// Push service endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Receiver's uncompressed P-256 public key.
    pub fn p256dh(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.p256dh
    }

    /// Receiver's auth secret.
    pub fn auth(&self) -> &[u8; AUTH_SECRET_LEN] {
        &self.auth
    }

    /// Expiration reported by the browser (milliseconds since epoch), if any.
    pub fn expiration_time(&self) -> Option<i64> {
        self.expiration_time
    }

    /// Origin of the push service, used as the VAPID audience.
    pub fn audience(&self) -> String {
        self.endpoint.origin().ascii_serialization()
    }
}

// The auth secret is a shared secret; keep it out of logs.
impl std::fmt::Debug for PushSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSubscription")
            .field("endpoint", &self.endpoint.as_str())
            .field("expiration_time", &self.expiration_time)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    if endpoint.trim().is_empty() {
        return Err(WebPushError::validation("endpoint must not be empty"));
    }
    let url = Url::parse(endpoint)
        .map_err(|e| WebPushError::validation(format!("endpoint is not an absolute URL: {e}")))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(WebPushError::validation(format!(
            "endpoint scheme must be https or http, got {}",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(WebPushError::validation(
            "endpoint must be an absolute URL with a host",
        ));
    }
    Ok(url)
}

/// Wire shape of `PushSubscription.toJSON()`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionJson {
    endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration_time: Option<i64>,
    keys: SubscriptionKeysJson,
}

#[derive(Serialize, Deserialize)]
struct SubscriptionKeysJson {
    p256dh: String,
    auth: String,
}

impl TryFrom<SubscriptionJson> for PushSubscription {
    type Error = WebPushError;

    fn try_from(json: SubscriptionJson) -> Result<Self> {
        let mut subscription = Self::new(&json.endpoint, &json.keys.p256dh, &json.keys.auth)?;
        subscription.expiration_time = json.expiration_time;
        Ok(subscription)
    }
}

impl From<PushSubscription> for SubscriptionJson {
    fn from(subscription: PushSubscription) -> Self {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;

        Self {
            endpoint: subscription.endpoint.to_string(),
            expiration_time: subscription.expiration_time,
            keys: SubscriptionKeysJson {
                p256dh: BASE64URL.encode(subscription.p256dh),
                auth: BASE64URL.encode(subscription.auth),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD as BASE64URL};

    fn valid_p256dh() -> String {
        let mut bytes = vec![0x04u8];
        bytes.extend_from_slice(&[0xAA; 32]);
        bytes.extend_from_slice(&[0xBB; 32]);
        BASE64URL.encode(&bytes)
    }

    fn valid_auth() -> String {
        BASE64URL.encode([0xCC; 16])
    }

    #[test]
    fn test_valid_subscription() {
        let sub = PushSubscription::new(
            "https://fcm.googleapis.com/fcm/send/abc",
            &valid_p256dh(),
            &valid_auth(),
        )
        .expect("valid subscription");

        assert_eq!(sub.p256dh()[0], 0x04);
        assert_eq!(sub.auth(), &[0xCC; 16]);
        assert_eq!(sub.audience(), "https://fcm.googleapis.com");
    }

    #[test]
    fn test_padded_base64_accepted() {
        let mut key = vec![0x04u8];
        key.extend_from_slice(&[0x11; 64]);
        let padded_key = URL_SAFE.encode(&key);
        let padded_auth = URL_SAFE.encode([0x22; 16]);
        assert!(padded_auth.ends_with("=="));

        let sub = PushSubscription::new("https://push.example.com/x", &padded_key, &padded_auth)
            .expect("padding is optional");
        assert_eq!(sub.auth(), &[0x22; 16]);
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let bad_endpoints = [
            "",
            "   ",
            "not a url",
            "/relative/path",
            "mailto:someone@example.com",
        ];
        for endpoint in bad_endpoints {
            let err = PushSubscription::new(endpoint, &valid_p256dh(), &valid_auth())
                .expect_err("endpoint should be rejected");
            assert!(matches!(err, WebPushError::Validation(_)), "{endpoint:?}");
        }
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        for endpoint in ["custom://push.example.com/x", "ftp://push.example.com/x", "ws://h/x"] {
            let err = PushSubscription::new(endpoint, &valid_p256dh(), &valid_auth())
                .expect_err("scheme should be rejected");
            assert!(matches!(err, WebPushError::Validation(_)), "{endpoint:?}");
        }
    }

    #[test]
    fn test_http_endpoint_audience_keeps_port() {
        let sub =
            PushSubscription::new("http://127.0.0.1:8080/push/1", &valid_p256dh(), &valid_auth())
                .expect("plain http is allowed");
        assert_eq!(sub.audience(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_wrong_key_lengths() {
        let short_key = BASE64URL.encode([0x04; 33]);
        assert!(matches!(
            PushSubscription::new("https://push.example.com", &short_key, &valid_auth()),
            Err(WebPushError::Validation(_))
        ));

        let mut compressed_prefix = vec![0x02u8];
        compressed_prefix.extend_from_slice(&[0x11; 64]);
        let wrong_prefix = BASE64URL.encode(&compressed_prefix);
        assert!(matches!(
            PushSubscription::new("https://push.example.com", &wrong_prefix, &valid_auth()),
            Err(WebPushError::Validation(_))
        ));

        // A 32-byte value is not an auth secret.
        let long_auth = BASE64URL.encode([0x01; 32]);
        assert!(matches!(
            PushSubscription::new("https://push.example.com", &valid_p256dh(), &long_auth),
            Err(WebPushError::Validation(_))
        ));

        assert!(matches!(
            PushSubscription::new("https://push.example.com", "!!!", &valid_auth()),
            Err(WebPushError::Validation(_))
        ));
    }

    #[test]
    fn test_browser_json_roundtrip() {
        let json = format!(
            r#"{{"endpoint":"https://updates.push.services.mozilla.com/wpush/v2/abc","expirationTime":null,"keys":{{"p256dh":"{}","auth":"{}"}}}}"#,
            valid_p256dh(),
            valid_auth()
        );
        let sub = PushSubscription::from_json(&json).expect("parse browser JSON");
        assert_eq!(sub.audience(), "https://updates.push.services.mozilla.com");
        assert_eq!(sub.expiration_time(), None);

        let encoded = serde_json::to_string(&sub).expect("serialize");
        let decoded = PushSubscription::from_json(&encoded).expect("reparse");
        assert_eq!(sub, decoded);
    }

    #[test]
    fn test_browser_json_validates_keys() {
        let json =
            r#"{"endpoint":"https://push.example.com/1","keys":{"p256dh":"AAAA","auth":"AAAA"}}"#;
        assert!(matches!(
            PushSubscription::from_json(json),
            Err(WebPushError::Validation(_))
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let sub =
            PushSubscription::new("https://push.example.com/1", &valid_p256dh(), &valid_auth())
                .expect("valid");
        let debug = format!("{sub:?}");
        assert!(debug.contains("push.example.com"));
        assert!(!debug.contains(&valid_auth()));
    }
}
