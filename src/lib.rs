//! Encrypted Web Push delivery.
//!
//! Sends notifications to browser push services (FCM, Mozilla autopush,
//! Apple, WNS) with the payload encrypted end to end (RFC 8291,
//! `aes128gcm`) and the sender identified by a signed VAPID token
//! (RFC 8292).
//!
//! # Architecture
//!
//! - **Subscription** - validated endpoint + receiver key material
//! - **VAPID** - sender keypair and per-message ES256 token
//! - **Encryption** - ECDH + HKDF + AES-128-GCM, single record
//! - **Request** - per-call options and header/body assembly (no I/O)
//! - **Response** - status code classification
//! - **Client** - configuration holder that drives a send end to end
//!
//! # Modules
//!
//! - [`subscription`] - Browser push subscriptions
//! - [`vapid`] - VAPID keys and token signing
//! - [`encryption`] - Payload encryption
//! - [`request`] - Request builder and send options
//! - [`response`] - Response classifier
//! - [`client`] - Push client
//! - [`config`] - Configuration loading/saving
//! - [`error`] - Error types

pub mod client;
pub mod config;
pub mod encryption;
pub mod error;
pub mod request;
pub mod response;
pub mod subscription;
pub mod vapid;

// Re-export commonly used types
pub use client::WebPushClient;
pub use config::Config;
pub use encryption::{EncryptedPayload, Encryptor, Padding};
pub use error::{PushError, Result, WebPushError};
pub use request::{RequestSpec, SendOptions, Urgency};
pub use subscription::PushSubscription;
pub use vapid::{VapidDetails, VapidKeys, VapidScheme};
