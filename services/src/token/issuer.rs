use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::claims::AttendanceClaims;
use super::codec::{CodecError, TokenCodec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AttendanceClaims,
}

/// Mints attendance tokens bound to one session.
///
/// The issuer is permissive: it never rejects a validity value and never
/// substitutes a default. A zero-minute token expires at its issue instant.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn issue_attendance_token(
        &self,
        session_id: i64,
        validity_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, CodecError> {
        let claims = AttendanceClaims::for_session(session_id, now, validity_minutes);
        let token = self.codec.sign(&claims)?;

        tracing::info!(
            session_id,
            validity_minutes,
            expires_at = claims.expires_at,
            "issued attendance token"
        );

        Ok(IssuedToken { token, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_issue_binds_session_and_window() {
        let codec = Arc::new(TokenCodec::from_secret(b"issuer"));
        let issuer = TokenIssuer::new(codec.clone());
        let now = Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap();

        let issued = issuer.issue_attendance_token(101, 5, now).unwrap();

        let decoded = codec.verify(&issued.token).unwrap();
        assert_eq!(decoded, issued.claims);
        assert_eq!(decoded.session_id, 101);
        assert_eq!(decoded.issued_at, now.timestamp_millis());
        assert_eq!(decoded.expires_at, now.timestamp_millis() + 300_000);
    }

    #[test]
    fn test_unusual_validity_is_accepted() {
        let issuer = TokenIssuer::new(Arc::new(TokenCodec::generate()));
        let now = Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap();

        let zero = issuer.issue_attendance_token(1, 0, now).unwrap();
        assert_eq!(zero.claims.expires_at, zero.claims.issued_at);

        let week = issuer.issue_attendance_token(1, 7 * 24 * 60, now).unwrap();
        assert_eq!(
            week.claims.expires_at - week.claims.issued_at,
            7 * 24 * 60 * 60 * 1000
        );
    }
}
