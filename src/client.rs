//! Push client: holds sender configuration and drives one send end to end.
//!
//! ```text
//! send(subscription, payload, options)
//!     ↓
//! RequestBuilder: encrypt payload (aes128gcm) + VAPID / GCM auth headers
//!     ↓
//! reqwest POST to the push service
//!     ↓
//! classify status: 201/202 → Ok, otherwise PushError
//! ```
//!
//! Configuration setters take `&mut self` and sends take `&self`, so a
//! client shared between tasks is read-only. Callers that need to change
//! VAPID or GCM settings while sends are in flight must serialise those
//! changes themselves (for example by swapping a new client in).

// Rust guideline compliant 2026-02

use crate::config::Config;
use crate::encryption::Encryptor;
use crate::error::{Result, WebPushError};
use crate::request::{RequestBuilder, RequestSpec, SendOptions, DEFAULT_TTL};
use crate::response::classify;
use crate::subscription::PushSubscription;
use crate::vapid::VapidDetails;

/// Sends encrypted Web Push messages.
///
/// Reuse one client across sends so the underlying `reqwest::Client` can
/// pool connections.
#[derive(Debug, Clone)]
pub struct WebPushClient {
    http: reqwest::Client,
    vapid: Option<VapidDetails>,
    gcm_api_key: Option<String>,
    default_ttl: u32,
    encryptor: Encryptor,
}

impl Default for WebPushClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebPushClient {
    /// Client with no authentication configured.
    ///
    /// The default transport does not follow redirects, so a 3xx from the
    /// push service is classified like any other unexpected status.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_http_client(http)
    }

    /// Client using a caller-supplied transport (timeouts, proxies, TLS).
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            vapid: None,
            gcm_api_key: None,
            default_ttl: DEFAULT_TTL,
            encryptor: Encryptor::default(),
        }
    }

    /// Client configured from [`Config`].
    ///
    /// VAPID is enabled only when subject and both keys are present; a
    /// partial VAPID configuration is rejected.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new();
        client.apply_config(config)?;
        Ok(client)
    }

    /// Apply [`Config`] settings on top of the current ones.
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        match (
            config.vapid_subject.as_deref(),
            config.vapid_public_key.as_deref(),
            config.vapid_private_key.as_deref(),
        ) {
            (Some(subject), Some(public_key), Some(private_key)) => {
                let details = VapidDetails::new(subject, public_key, private_key)?
                    .expiration(config.vapid_expiration);
                self.set_vapid(details);
            }
            (None, None, None) => {}
            _ => {
                return Err(WebPushError::validation(
                    "VAPID configuration needs a subject, public key and private key",
                ))
            }
        }

        if let Some(key) = config.gcm_api_key.as_deref() {
            self.set_gcm_api_key(Some(key))?;
        }
        self.default_ttl = config.default_ttl;
        Ok(())
    }

    /// Configure VAPID for all subsequent sends.
    pub fn set_vapid_details(
        &mut self,
        subject: &str,
        public_key: &str,
        private_key: &str,
    ) -> Result<()> {
        self.set_vapid(VapidDetails::new(subject, public_key, private_key)?);
        Ok(())
    }

    /// Configure VAPID from already validated details.
    pub fn set_vapid(&mut self, details: VapidDetails) {
        log::info!("[WebPush] VAPID configured for {}", details.subject());
        self.vapid = Some(details);
    }

    /// Stop presenting VAPID credentials.
    pub fn clear_vapid_details(&mut self) {
        self.vapid = None;
    }

    /// Set or clear (`None`) the legacy GCM API key.
    ///
    /// An empty key is rejected.
    pub fn set_gcm_api_key(&mut self, key: Option<&str>) -> Result<()> {
        match key {
            Some("") => Err(WebPushError::validation("GCM API key must not be empty")),
            Some(key) => {
                self.gcm_api_key = Some(key.to_string());
                Ok(())
            }
            None => {
                self.gcm_api_key = None;
                Ok(())
            }
        }
    }

    /// Replace the payload encryptor (record size, padding).
    pub fn set_encryptor(&mut self, encryptor: Encryptor) {
        self.encryptor = encryptor;
    }

    /// Set the TTL used when a send does not specify one.
    pub fn set_default_ttl(&mut self, ttl: u32) {
        self.default_ttl = ttl;
    }

    /// Current VAPID settings.
    pub fn vapid_details(&self) -> Option<&VapidDetails> {
        self.vapid.as_ref()
    }

    /// Current GCM API key.
    pub fn gcm_api_key(&self) -> Option<&str> {
        self.gcm_api_key.as_deref()
    }

    /// Build the request a send would issue, without sending it.
    pub fn generate_request_details(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
        options: &SendOptions,
    ) -> Result<RequestSpec> {
        RequestBuilder {
            vapid: self.vapid.as_ref(),
            gcm_api_key: self.gcm_api_key.as_deref(),
            default_ttl: self.default_ttl,
            encryptor: self.encryptor,
        }
        .build(subscription, payload, options)
    }

    /// Encrypt and deliver one message.
    ///
    /// Returns `Ok(())` when the push service accepted the message (201 or
    /// 202). A rejected message yields [`WebPushError::Push`] carrying the
    /// status and the subscription; inspect
    /// [`PushError::is_subscription_gone`](crate::PushError::is_subscription_gone)
    /// to decide whether to discard it.
    pub async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
        options: &SendOptions,
    ) -> Result<()> {
        let details = self.generate_request_details(subscription, payload, options)?;

        let mut request = self
            .http
            .request(details.method, details.endpoint)
            .headers(details.headers);
        if let Some(body) = details.body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        match classify(status, subscription) {
            Ok(()) => {
                log::info!(
                    "[WebPush] Delivered to {} ({status})",
                    subscription.audience()
                );
                Ok(())
            }
            Err(err) => {
                let body = response.text().await.unwrap_or_default();
                log::warn!(
                    "[WebPush] {} rejected message ({status}): {}",
                    subscription.audience(),
                    body.chars().take(200).collect::<String>()
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vapid::VapidKeys;

    const SUBJECT: &str = "mailto:example@example.com";

    #[test]
    fn test_set_gcm_api_key() {
        let mut client = WebPushClient::new();
        client.set_gcm_api_key(Some("teststring")).expect("set key");
        assert_eq!(client.gcm_api_key(), Some("teststring"));

        client.set_gcm_api_key(None).expect("clear key");
        assert_eq!(client.gcm_api_key(), None);
    }

    #[test]
    fn test_set_gcm_api_key_empty_string() {
        let mut client = WebPushClient::new();
        assert!(matches!(
            client.set_gcm_api_key(Some("")),
            Err(WebPushError::Validation(_))
        ));
    }

    #[test]
    fn test_set_and_clear_vapid_details() {
        let keys = VapidKeys::generate();
        let mut client = WebPushClient::new();
        client
            .set_vapid_details(SUBJECT, keys.public_key_base64url(), keys.private_key_base64url())
            .expect("valid VAPID details");
        assert_eq!(client.vapid_details().map(VapidDetails::subject), Some(SUBJECT));

        client.clear_vapid_details();
        assert!(client.vapid_details().is_none());
    }

    #[test]
    fn test_set_vapid_details_rejects_bad_input() {
        let keys = VapidKeys::generate();
        let mut client = WebPushClient::new();
        assert!(matches!(
            client.set_vapid_details("", keys.public_key_base64url(), keys.private_key_base64url()),
            Err(WebPushError::Validation(_))
        ));
        assert!(matches!(
            client.set_vapid_details(SUBJECT, "garbage", keys.private_key_base64url()),
            Err(WebPushError::Validation(_))
        ));
        assert!(client.vapid_details().is_none());
    }

    #[test]
    fn test_from_config() {
        let keys = VapidKeys::generate();
        let config = Config {
            vapid_subject: Some(SUBJECT.to_string()),
            vapid_public_key: Some(keys.public_key_base64url().to_string()),
            vapid_private_key: Some(keys.private_key_base64url().to_string()),
            gcm_api_key: Some("teststring".to_string()),
            default_ttl: 30,
            vapid_expiration: 600,
        };
        let client = WebPushClient::from_config(&config).expect("client");

        let details = client.vapid_details().expect("vapid");
        assert_eq!(details.expiration_secs(), 600);
        assert_eq!(client.gcm_api_key(), Some("teststring"));
        assert_eq!(client.default_ttl, 30);
    }

    #[test]
    fn test_from_config_rejects_partial_vapid() {
        let config = Config {
            vapid_subject: Some(SUBJECT.to_string()),
            ..Config::default()
        };
        assert!(matches!(
            WebPushClient::from_config(&config),
            Err(WebPushError::Validation(_))
        ));
    }
}
