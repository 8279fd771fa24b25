use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use once_cell::sync::OnceCell;
use rand::RngCore;
use thiserror::Error;

use super::claims::AttendanceClaims;

const SECRET_LEN: usize = 64;

static PROCESS_CODEC: OnceCell<Arc<TokenCodec>> = OnceCell::new();

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Any malformed, tampered or foreign token. Carries no partial claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("token signature or encoding is invalid")]
pub struct SignatureError;

/// Signs and verifies attendance claim sets with a symmetric HS512 key.
///
/// The codec knows nothing about sessions or students. Expiry is not checked
/// here; that belongs to the validator, which compares against the caller's
/// clock at millisecond resolution.
pub struct TokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            header: Header::new(Algorithm::HS512),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// A codec with a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut secret = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self::from_secret(&secret)
    }

    /// Returns the process-wide codec, generating its key on first use.
    ///
    /// The key lives only in memory, so restarting the process invalidates
    /// every outstanding token.
    pub fn init_process() -> Arc<TokenCodec> {
        PROCESS_CODEC
            .get_or_init(|| {
                tracing::info!("generated ephemeral attendance token key");
                Arc::new(TokenCodec::generate())
            })
            .clone()
    }

    /// The process-wide codec, if [`TokenCodec::init_process`] has run.
    pub fn process() -> Option<Arc<TokenCodec>> {
        PROCESS_CODEC.get().cloned()
    }

    pub fn sign(&self, claims: &AttendanceClaims) -> Result<String, CodecError> {
        Ok(encode(&self.header, claims, &self.encoding_key)?)
    }

    pub fn verify(&self, token: &str) -> Result<AttendanceClaims, SignatureError> {
        decode::<AttendanceClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "attendance token failed verification");
                SignatureError
            })
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{TimeZone, Utc};

    fn claims() -> AttendanceClaims {
        let now = Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap();
        AttendanceClaims::for_session(101, now, 5)
    }

    #[test]
    fn test_sign_then_verify() {
        let codec = TokenCodec::from_secret(b"unit-test-secret");
        let token = codec.sign(&claims()).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token).unwrap(), claims());
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let ours = TokenCodec::from_secret(b"ours");
        let theirs = TokenCodec::generate();
        let token = theirs.sign(&claims()).unwrap();

        assert_eq!(ours.verify(&token), Err(SignatureError));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = TokenCodec::from_secret(b"unit-test-secret");
        let token = codec.sign(&claims()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut forged = claims();
        forged.session_id = 999;
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert_eq!(codec.verify(&tampered), Err(SignatureError));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = TokenCodec::generate();
        assert!(codec.verify("").is_err());
        assert!(codec.verify("not-a-token").is_err());
        assert!(codec.verify("a.b.c").is_err());
    }

    #[test]
    fn test_missing_claims_fail_closed() {
        #[derive(serde::Serialize)]
        struct Partial {
            #[serde(rename = "sessionId")]
            session_id: i64,
        }

        let secret = b"unit-test-secret";
        let token = encode(
            &Header::new(Algorithm::HS512),
            &Partial { session_id: 101 },
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let codec = TokenCodec::from_secret(secret);
        assert_eq!(codec.verify(&token), Err(SignatureError));
    }

    #[test]
    fn test_process_codec_is_initialised_once() {
        let first = TokenCodec::init_process();
        let second = TokenCodec::init_process();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(TokenCodec::process().is_some());
    }
}
