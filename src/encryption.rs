//! Web Push message encryption (RFC 8291) using the `aes128gcm` content
//! encoding (RFC 8188), single record only.
//!
//! # Wire Format
//!
//! ```text
//! salt (16) || rs (4, big-endian) || idlen (1) = 65 || keyid (65) || ciphertext+tag
//! ```
//!
//! `keyid` is the sender's ephemeral public key. The receiver recovers the
//! content-encryption key from it, its own private key and the auth secret.

// Rust guideline compliant 2026-02

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use hkdf::Hkdf;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, WebPushError};
use crate::subscription::{PushSubscription, PUBLIC_KEY_LEN};

/// Default record size advertised in the header.
pub const DEFAULT_RECORD_SIZE: u32 = 4096;

/// Salt length.
pub const SALT_LEN: usize = 16;

/// Bytes preceding the ciphertext: salt, record size, key-id length, key-id.
pub const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Delimiter marking the final (and only) record.
const LAST_RECORD_DELIMITER: u8 = 0x02;

const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\x00";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\x00";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\x00";

/// How much zero padding follows the delimiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Padding {
    /// No padding beyond the delimiter byte.
    #[default]
    Minimal,
    /// Pad so the whole body is exactly the record size, hiding the
    /// plaintext length from the push service.
    FullRecord,
}

/// Output of one encryption. Never reused across messages.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    salt: [u8; SALT_LEN],
    local_public_key: [u8; PUBLIC_KEY_LEN],
    record_size: u32,
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Random salt used for key derivation.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Ephemeral sender public key (uncompressed point).
    pub fn local_public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.local_public_key
    }

    /// Record size written into the header.
    pub fn record_size(&self) -> u32 {
        self.record_size
    }

    /// AEAD output including the trailing tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Assemble the `aes128gcm` request body.
    pub fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        body.extend_from_slice(&self.salt);
        body.extend_from_slice(&self.record_size.to_be_bytes());
        body.push(PUBLIC_KEY_LEN as u8);
        body.extend_from_slice(&self.local_public_key);
        body.extend_from_slice(&self.ciphertext);
        body
    }
}

/// Single-record `aes128gcm` encryptor.
#[derive(Debug, Clone, Copy)]
pub struct Encryptor {
    record_size: u32,
    padding: Padding,
}

impl Default for Encryptor {
    fn default() -> Self {
        Self {
            record_size: DEFAULT_RECORD_SIZE,
            padding: Padding::default(),
        }
    }
}

impl Encryptor {
    /// Encryptor with the default 4096-byte record and minimal padding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record size (the maximum body length on the wire).
    ///
    /// A record must hold the header, the tag and the padding delimiter;
    /// [`encrypt`](Self::encrypt) rejects anything smaller than 103 bytes.
    pub fn record_size(mut self, record_size: u32) -> Self {
        self.record_size = record_size;
        self
    }

    /// Set the padding policy.
    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Largest plaintext that fits in one record.
    pub fn max_plaintext_len(&self) -> usize {
        (self.record_size as usize).saturating_sub(HEADER_LEN + TAG_LEN + 1)
    }

    /// Encrypt `plaintext` for `subscription` with a fresh ephemeral key and
    /// salt.
    pub fn encrypt(
        &self,
        subscription: &PushSubscription,
        plaintext: &[u8],
    ) -> Result<EncryptedPayload> {
        let local_secret = SecretKey::random(&mut OsRng);
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);

        self.encrypt_with(subscription, plaintext, &local_secret, salt)
    }

    fn encrypt_with(
        &self,
        subscription: &PushSubscription,
        plaintext: &[u8],
        local_secret: &SecretKey,
        salt: [u8; SALT_LEN],
    ) -> Result<EncryptedPayload> {
        let min_record_size = HEADER_LEN + TAG_LEN + 1;
        if (self.record_size as usize) < min_record_size {
            return Err(WebPushError::crypto(format!(
                "record size {} is below the minimum of {min_record_size} bytes",
                self.record_size
            )));
        }

        let capacity = self.max_plaintext_len();
        if plaintext.len() > capacity {
            return Err(WebPushError::crypto(format!(
                "payload of {} bytes exceeds single-record capacity of {capacity} bytes",
                plaintext.len()
            )));
        }

        let receiver = PublicKey::from_sec1_bytes(subscription.p256dh())
            .map_err(|e| WebPushError::crypto(format!("invalid p256dh public key: {e}")))?;

        let local_point = local_secret.public_key().to_encoded_point(false);
        let mut local_public_key = [0u8; PUBLIC_KEY_LEN];
        local_public_key.copy_from_slice(local_point.as_bytes());

        let shared_secret =
            p256::ecdh::diffie_hellman(local_secret.to_nonzero_scalar(), receiver.as_affine());

        // IKM from auth secret + ECDH shared secret, bound to both public keys.
        let mut key_info = Vec::with_capacity(KEY_INFO_PREFIX.len() + 2 * PUBLIC_KEY_LEN);
        key_info.extend_from_slice(KEY_INFO_PREFIX);
        key_info.extend_from_slice(subscription.p256dh());
        key_info.extend_from_slice(&local_public_key);

        let mut ikm = Zeroizing::new([0u8; 32]);
        Hkdf::<Sha256>::new(
            Some(subscription.auth().as_slice()),
            shared_secret.raw_secret_bytes().as_slice(),
        )
        .expand(&key_info, &mut ikm[..])
        .map_err(|e| WebPushError::crypto(format!("HKDF auth expand failed: {e}")))?;

        let hkdf_content = Hkdf::<Sha256>::new(Some(&salt[..]), &ikm[..]);

        let mut cek = Zeroizing::new([0u8; 16]);
        hkdf_content
            .expand(CEK_INFO, &mut cek[..])
            .map_err(|e| WebPushError::crypto(format!("HKDF CEK derivation failed: {e}")))?;

        let mut nonce = [0u8; 12];
        hkdf_content
            .expand(NONCE_INFO, &mut nonce)
            .map_err(|e| WebPushError::crypto(format!("HKDF nonce derivation failed: {e}")))?;

        let padded_len = match self.padding {
            Padding::Minimal => plaintext.len() + 1,
            Padding::FullRecord => self.record_size as usize - HEADER_LEN - TAG_LEN,
        };
        let mut padded = Zeroizing::new(Vec::with_capacity(padded_len));
        padded.extend_from_slice(plaintext);
        padded.push(LAST_RECORD_DELIMITER);
        padded.resize(padded_len, 0);

        let cipher = Aes128Gcm::new_from_slice(&cek[..])
            .map_err(|e| WebPushError::crypto(format!("invalid content-encryption key: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), padded.as_slice())
            .map_err(|e| WebPushError::crypto(format!("AES-GCM encryption failed: {e}")))?;

        Ok(EncryptedPayload {
            salt,
            local_public_key,
            record_size: self.record_size,
            ciphertext,
        })
    }
}

/// Encrypt with the default [`Encryptor`].
pub fn encrypt(subscription: &PushSubscription, plaintext: &[u8]) -> Result<EncryptedPayload> {
    Encryptor::default().encrypt(subscription, plaintext)
}
