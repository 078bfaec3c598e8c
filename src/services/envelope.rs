//! Envelope codec for upstream payloads.
//!
//! Every sensitive request body is sent as `{ "data": <string> }` where the
//! string is produced by an [`EnvelopeCodec`]. Responses carry the same kind
//! of string in their `data` field.

use aes_gcm::aead::{rand_core::RngCore, Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::config::EnvelopeMode;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("payload too short ({0} bytes)")]
    Truncated(usize),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("decrypted payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Converts plaintext JSON to a transport string and back.
pub trait EnvelopeCodec: Send + Sync {
    fn encode(&self, plaintext: &Value) -> Result<String, CodecError>;

    fn decode(&self, ciphertext: &str) -> Result<Value, CodecError>;
}

pub type SharedCodec = Arc<dyn EnvelopeCodec>;

/// Build the codec selected in settings.
pub fn codec_from_mode(mode: &EnvelopeMode) -> SharedCodec {
    match mode {
        EnvelopeMode::Aes { secret } => Arc::new(AesGcmEnvelope::from_secret(secret)),
        EnvelopeMode::Plain => Arc::new(PlainEnvelope),
    }
}

/// Decode a response `data` field that may or may not be encrypted.
///
/// Upstream endpoints are inconsistent: most return a ciphertext string, a
/// few return an already-parsed object, and some decrypt to a JSON string
/// that holds JSON a second time.
pub fn decode_payload(codec: &dyn EnvelopeCodec, value: Value) -> Result<Value, CodecError> {
    match value {
        Value::String(ciphertext) => match codec.decode(&ciphertext)? {
            Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => Ok(parsed),
                _ => Ok(Value::String(inner)),
            },
            decoded => Ok(decoded),
        },
        other => Ok(other),
    }
}

/// AES-256-GCM with a fresh random nonce per message.
///
/// Wire format: `base64(nonce || ciphertext || tag)`.
pub struct AesGcmEnvelope {
    cipher: Aes256Gcm,
}

impl AesGcmEnvelope {
    pub fn from_secret(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }
}

impl EnvelopeCodec for AesGcmEnvelope {
    fn encode(&self, plaintext: &Value) -> Result<String, CodecError> {
        let text = serde_json::to_string(plaintext)?;

        let mut iv = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut iv);
        let encrypted = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), text.as_bytes())
            .map_err(|_| CodecError::Encrypt)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + encrypted.len());
        combined.extend_from_slice(&iv);
        combined.extend_from_slice(&encrypted);
        Ok(B64.encode(combined))
    }

    fn decode(&self, ciphertext: &str) -> Result<Value, CodecError> {
        let raw = B64.decode(ciphertext.trim())?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Truncated(raw.len()));
        }

        let (iv, sealed) = raw.split_at(NONCE_LEN);
        let decrypted = self
            .cipher
            .decrypt(Nonce::from_slice(iv), sealed)
            .map_err(|_| CodecError::Decrypt)?;

        let text = String::from_utf8(decrypted)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pass-through codec: the transport string is the JSON text itself.
pub struct PlainEnvelope;

impl EnvelopeCodec for PlainEnvelope {
    fn encode(&self, plaintext: &Value) -> Result<String, CodecError> {
        Ok(serde_json::to_string(plaintext)?)
    }

    fn decode(&self, ciphertext: &str) -> Result<Value, CodecError> {
        Ok(serde_json::from_str(ciphertext)?)
    }
}
