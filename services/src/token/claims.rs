use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Purpose tag every attendance token must carry.
pub const ATTENDANCE_PURPOSE: &str = "attendance";

/// Claim set embedded in an attendance token.
///
/// Timestamps are epoch milliseconds. The student is never part of the
/// claims; whoever presents the token supplies the student id separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceClaims {
    pub session_id: i64,
    pub purpose: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl AttendanceClaims {
    /// Claims for `session_id`, valid from `issued_at` for `validity_minutes`.
    pub fn for_session(session_id: i64, issued_at: DateTime<Utc>, validity_minutes: u32) -> Self {
        let issued_ms = issued_at.timestamp_millis();
        let validity_ms = Duration::minutes(i64::from(validity_minutes)).num_milliseconds();

        Self {
            session_id,
            purpose: ATTENDANCE_PURPOSE.to_owned(),
            issued_at: issued_ms,
            expires_at: issued_ms.saturating_add(validity_ms),
        }
    }

    pub fn is_attendance(&self) -> bool {
        self.purpose == ATTENDANCE_PURPOSE
    }

    /// Expiry is inclusive: a check at exactly `expires_at` still passes.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() <= self.expires_at
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.issued_at)
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }
}
