//! VAPID sender identification for Web Push (RFC 8292).
//!
//! The application server holds a long-lived P-256 ECDSA keypair. For every
//! message it signs a short-lived ES256 JWT bound to the push service origin
//! and presents it together with its public key, letting the push service
//! attribute (and rate limit) traffic without a pre-registered API key.

// Rust guideline compliant 2026-02

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::signature::RandomizedSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::PublicKey;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, WebPushError};
use crate::subscription::{decode_base64url, PushSubscription, PUBLIC_KEY_LEN};

/// Longest token lifetime push services accept.
pub const MAX_EXPIRATION_SECS: u64 = 24 * 60 * 60;

/// Token lifetime used when none is configured.
pub const DEFAULT_EXPIRATION_SECS: u64 = 12 * 60 * 60;

/// VAPID keypair for web push authentication.
///
/// The private key is the raw 32-byte P-256 scalar and the public key the
/// uncompressed SEC1 point (65 bytes), both base64url without padding. This
/// is the format browsers expect for `applicationServerKey` and the format
/// every other Web Push library exchanges keys in.
#[derive(Clone, Serialize, Deserialize)]
pub struct VapidKeys {
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key_b64: String,
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key_b64: String,
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);

        Self {
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        }
    }

    /// Reconstruct from base64url-encoded strings.
    ///
    /// The public key must be a 65-byte uncompressed P-256 point that belongs
    /// to the private key. The private key may be the raw 32-byte scalar or,
    /// for keys exported by other tooling, SEC1 DER or PKCS#8 DER; it is
    /// normalised to the raw scalar.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self> {
        let pub_bytes = decode_base64url(public_key_b64).map_err(|e| {
            WebPushError::validation(format!("Invalid base64url for VAPID public key: {e}"))
        })?;
        if pub_bytes.len() != PUBLIC_KEY_LEN || pub_bytes[0] != 0x04 {
            return Err(WebPushError::validation(
                "VAPID public key must be 65-byte uncompressed P-256 point",
            ));
        }
        PublicKey::from_sec1_bytes(&pub_bytes).map_err(|e| {
            WebPushError::validation(format!("VAPID public key is not on the P-256 curve: {e}"))
        })?;

        let signing_key = parse_private_key(private_key_b64)?;
        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err(WebPushError::validation(
                "VAPID public key does not match the private key",
            ));
        }

        Ok(Self {
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_b64: BASE64URL.encode(&pub_bytes),
        })
    }

    /// Base64url-encoded uncompressed public key (65 bytes decoded).
    ///
    /// This is handed to browsers as the `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded raw 32-byte private key scalar.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }

    /// Uncompressed public key bytes (65 bytes).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        decode_base64url(&self.public_key_b64).map_err(|e| {
            WebPushError::validation(format!("Failed to decode VAPID public key: {e}"))
        })
    }

    fn signing_key(&self) -> Result<SigningKey> {
        parse_private_key(&self.private_key_b64)
    }
}

// Never print the private scalar.
impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key_b64", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

fn parse_private_key(private_key_b64: &str) -> Result<SigningKey> {
    let priv_bytes = decode_base64url(private_key_b64).map_err(|e| {
        WebPushError::validation(format!("Invalid base64url for VAPID private key: {e}"))
    })?;

    if priv_bytes.len() == 32 {
        return SigningKey::from_slice(&priv_bytes).map_err(|e| {
            WebPushError::validation(format!("VAPID private key is not a valid P-256 scalar: {e}"))
        });
    }

    // Exported keys: SEC1 DER (~121 bytes) or PKCS#8 DER (~138 bytes).
    if let Ok(secret) = p256::SecretKey::from_sec1_der(&priv_bytes) {
        return Ok(SigningKey::from(secret));
    }
    use p256::pkcs8::DecodePrivateKey;
    SigningKey::from_pkcs8_der(&priv_bytes).map_err(|e| {
        WebPushError::validation(format!(
            "VAPID private key is not a 32-byte scalar, SEC1 DER, or PKCS8 DER ({} bytes): {e}",
            priv_bytes.len()
        ))
    })
}

/// Authorization header flavour presented to the push service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VapidScheme {
    /// `Authorization: WebPush <token>` (draft VAPID, widely accepted).
    #[default]
    WebPush,
    /// `Authorization: vapid t=<token>, k=<public key>` (RFC 8292).
    Vapid,
}

/// Validated VAPID configuration: who is sending and with which keys.
///
/// Deserializes from `{"subject", "publicKey", "privateKey"}`, running the
/// same validation as [`VapidDetails::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "VapidDetailsJson")]
pub struct VapidDetails {
    subject: String,
    keys: VapidKeys,
    scheme: VapidScheme,
    expiration_secs: u64,
}

impl VapidDetails {
    /// Validate a subject and keypair.
    ///
    /// The subject must be a `mailto:` URI or an `https:` URL.
    pub fn new(subject: &str, public_key_b64: &str, private_key_b64: &str) -> Result<Self> {
        validate_subject(subject)?;
        let keys = VapidKeys::from_base64url(public_key_b64, private_key_b64)?;
        Ok(Self::from_keys(subject.to_string(), keys))
    }

    /// Build from an already validated keypair.
    pub fn with_keys(subject: &str, keys: VapidKeys) -> Result<Self> {
        validate_subject(subject)?;
        Ok(Self::from_keys(subject.to_string(), keys))
    }

    fn from_keys(subject: String, keys: VapidKeys) -> Self {
        Self {
            subject,
            keys,
            scheme: VapidScheme::default(),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }

    /// Select the `Authorization` header flavour.
    pub fn scheme(mut self, scheme: VapidScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the token lifetime in seconds (clamped to 24 hours when signing).
    pub fn expiration(mut self, secs: u64) -> Self {
        self.expiration_secs = secs;
        self
    }

    /// Sender contact URI.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The keypair.
    pub fn keys(&self) -> &VapidKeys {
        &self.keys
    }

    /// Configured token lifetime in seconds.
    pub fn expiration_secs(&self) -> u64 {
        self.expiration_secs
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct VapidDetailsJson {
    subject: String,
    public_key: String,
    private_key: String,
}

impl TryFrom<VapidDetailsJson> for VapidDetails {
    type Error = WebPushError;

    fn try_from(json: VapidDetailsJson) -> Result<Self> {
        Self::new(&json.subject, &json.public_key, &json.private_key)
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(WebPushError::validation("VAPID subject must not be empty"));
    }
    if let Some(address) = subject.strip_prefix("mailto:") {
        if address.is_empty() {
            return Err(WebPushError::validation("VAPID mailto: subject has no address"));
        }
        return Ok(());
    }
    match Url::parse(subject) {
        Ok(url) if url.scheme() == "https" => Ok(()),
        _ => Err(WebPushError::validation(
            "VAPID subject must be a mailto: or https: URI",
        )),
    }
}

/// Headers asserting the sender's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidHeaders {
    /// Value of the `Authorization` header.
    pub authorization: String,
    /// Value of the `Crypto-Key` header.
    pub crypto_key: String,
}

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    aud: String,
    exp: i64,
    sub: String,
}

/// Sign a VAPID token for `subscription`'s push service and render the
/// headers that carry it.
///
/// `expiry_secs` is clamped to [`MAX_EXPIRATION_SECS`].
pub fn build_auth_headers(
    subscription: &PushSubscription,
    details: &VapidDetails,
    expiry_secs: u64,
) -> Result<VapidHeaders> {
    let signing_key = details.keys.signing_key()?;
    let token = sign_token(&signing_key, subscription.audience(), &details.subject, expiry_secs)?;
    let public_key = details.keys.public_key_base64url();

    let authorization = match details.scheme {
        VapidScheme::WebPush => format!("WebPush {token}"),
        VapidScheme::Vapid => format!("vapid t={token}, k={public_key}"),
    };

    Ok(VapidHeaders {
        authorization,
        crypto_key: format!("p256ecdsa={public_key}"),
    })
}

fn sign_token(
    signing_key: &SigningKey,
    audience: String,
    subject: &str,
    expiry_secs: u64,
) -> Result<String> {
    let lifetime = i64::try_from(expiry_secs.min(MAX_EXPIRATION_SECS)).unwrap_or(0);
    let claims = JwtClaims {
        aud: audience,
        exp: chrono::Utc::now().timestamp() + lifetime,
        sub: subject.to_string(),
    };
    let header = JwtHeader {
        alg: "ES256",
        typ: "JWT",
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| WebPushError::crypto(format!("JWT header encode failed: {e}")))?;
    let claims_json = serde_json::to_vec(&claims)
        .map_err(|e| WebPushError::crypto(format!("JWT claims encode failed: {e}")))?;
    let signing_input = format!(
        "{}.{}",
        BASE64URL.encode(header_json),
        BASE64URL.encode(claims_json)
    );

    // ES256 wants the fixed-width r || s form, which is what `to_bytes` gives.
    let signature: Signature = signing_key
        .try_sign_with_rng(&mut OsRng, signing_input.as_bytes())
        .map_err(|e| WebPushError::crypto(format!("VAPID signing failed: {e}")))?;

    log::debug!("[WebPush] Signed VAPID token for {}", claims.aud);

    Ok(format!(
        "{signing_input}.{}",
        BASE64URL.encode(signature.to_bytes())
    ))
}
