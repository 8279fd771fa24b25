use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::claims::AttendanceClaims;
use super::codec::TokenCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token was not issued for attendance")]
    WrongPurpose,
    #[error("token has expired")]
    Expired,
}

/// Checks a presented token against the current time.
///
/// Pure: it never looks up sessions or students.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Signature, then purpose, then expiry; the first failure wins.
    pub fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceClaims, TokenRejection> {
        let claims = self
            .codec
            .verify(token)
            .map_err(|_| TokenRejection::BadSignature)?;

        if !claims.is_attendance() {
            return Err(TokenRejection::WrongPurpose);
        }

        if !claims.is_live_at(now) {
            return Err(TokenRejection::Expired);
        }

        Ok(claims)
    }
}
