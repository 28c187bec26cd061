//! Signed token envelopes.
//!
//! A credential travels as `base64url(payload) + "." + base64url(signature)`
//! where the signature is HMAC-SHA256 over the exact payload bytes. The
//! payload is serialized once, deterministically, and signed as-is, so two
//! independently computed signatures over the same payload compare
//! byte-for-byte.

use std::fmt::Display;

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Serialize, de::DeserializeOwned};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Shared symmetric key signing every issued credential.
///
/// A single process-wide key, no rotation and no per-token key id.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SigningKey(bytes.into())
    }
}

impl From<&str> for SigningKey {
    fn from(value: &str) -> Self {
        SigningKey(value.as_bytes().to_vec())
    }
}

impl From<String> for SigningKey {
    fn from(value: String) -> Self {
        SigningKey(value.into_bytes())
    }
}

impl From<Vec<u8>> for SigningKey {
    fn from(value: Vec<u8>) -> Self {
        SigningKey(value)
    }
}

impl std::fmt::Debug for SigningKey {
    // key material stays out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Transport unit: payload bytes plus their signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedEnvelope {
    /// Serializes `payload` and signs the bytes that go on the wire.
    pub fn seal<T: Serialize>(payload: &T, key: &SigningKey) -> Result<Self> {
        let payload = serde_json::to_vec(payload)?;
        let signature = sign(&payload, key);
        Ok(SignedEnvelope { payload, signature })
    }

    /// Splits the dot-joined transport form back into its two segments.
    pub fn parse(token: &str) -> Result<Self> {
        let (payload, signature) = token.split_once('.').ok_or(Error::MalformedEnvelope)?;
        let payload = BASE64_URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Error::MalformedEnvelope)?;
        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::MalformedEnvelope)?;
        Ok(SignedEnvelope { payload, signature })
    }

    /// Verifies the signature in constant time, then deserializes the payload.
    pub fn open<T: DeserializeOwned>(&self, key: &SigningKey) -> Result<T> {
        let expected = sign(&self.payload, key);
        if !bool::from(expected.ct_eq(&self.signature)) {
            return Err(Error::SignatureMismatch);
        }
        serde_json::from_slice(&self.payload).map_err(|_| Error::MalformedEnvelope)
    }
}

impl Display for SignedEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(&self.payload),
            BASE64_URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }
}

/// Encodes `payload` into its signed transport form.
pub fn encode<T: Serialize>(payload: &T, key: &SigningKey) -> Result<String> {
    Ok(SignedEnvelope::seal(payload, key)?.to_string())
}

/// Decodes and verifies a transport token.
///
/// Every failure mode collapses to `None`: a malformed or tampered token is
/// indistinguishable from one that was never sent, so callers get no
/// verification oracle to probe.
pub fn decode<T: DeserializeOwned>(token: &str, key: &SigningKey) -> Option<T> {
    SignedEnvelope::parse(token).ok()?.open(key).ok()
}

fn sign(data: &[u8], key: &SigningKey) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(&key.0).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Claim {
        email: String,
        exp: i64,
    }

    fn key() -> SigningKey {
        SigningKey::from("test_secret_key")
    }

    fn claim() -> Claim {
        Claim {
            email: "a@x.com".to_string(),
            exp: 1_700_000_000_000,
        }
    }

    #[test]
    fn round_trips_valid_payloads() {
        let token = encode(&claim(), &key()).unwrap();
        let decoded: Claim = decode(&token, &key()).unwrap();
        assert_eq!(decoded, claim());
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(
            encode(&claim(), &key()).unwrap(),
            encode(&claim(), &key()).unwrap()
        );
    }

    #[test]
    fn transport_form_is_dot_joined_base64url() {
        let token = encode(&claim(), &key()).unwrap();
        assert_eq!(token.matches('.').count(), 1);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn rejects_wrong_key() {
        let token = encode(&claim(), &key()).unwrap();
        assert_eq!(
            decode::<Claim>(&token, &SigningKey::from("other_secret")),
            None
        );
    }

    #[test]
    fn any_single_bit_flip_in_signature_rejects() {
        let token = encode(&claim(), &key()).unwrap();
        let dot = token.find('.').unwrap();
        let envelope = SignedEnvelope::parse(&token).unwrap();
        assert!(dot > 0);

        for byte in 0..envelope.signature.len() {
            for bit in 0..8 {
                let mut corrupted = envelope.clone();
                corrupted.signature[byte] ^= 1 << bit;
                assert_eq!(
                    decode::<Claim>(&corrupted.to_string(), &key()),
                    None,
                    "flip of bit {bit} in signature byte {byte} must be rejected"
                );
            }
        }
    }

    #[test]
    fn tampered_payload_rejects() {
        let token = encode(&claim(), &key()).unwrap();
        let mut envelope = SignedEnvelope::parse(&token).unwrap();
        let json = String::from_utf8(envelope.payload.clone()).unwrap();
        envelope.payload = json.replace("a@x.com", "b@x.com").into_bytes();
        assert_eq!(decode::<Claim>(&envelope.to_string(), &key()), None);
    }

    #[test]
    fn malformed_tokens_are_absent_not_errors() {
        for token in [
            "",
            "no-separator",
            ".",
            "only-payload.",
            ".only-signature",
            "not!base64.not!base64",
            "eyJ9.eyJ9.eyJ9",
        ] {
            assert_eq!(decode::<Claim>(token, &key()), None, "token {token:?}");
        }
    }

    #[test]
    fn truncated_signature_rejects() {
        let token = encode(&claim(), &key()).unwrap();
        let mut envelope = SignedEnvelope::parse(&token).unwrap();
        envelope.signature.pop();
        assert_eq!(decode::<Claim>(&envelope.to_string(), &key()), None);
    }
}
