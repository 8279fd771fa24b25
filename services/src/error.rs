use thiserror::Error;

use crate::store::StoreError;
use crate::token::TokenRejection;

/// Every failure the attendance core reports to its callers.
///
/// `AlreadyRecorded` and `Unchanged` are not here: they are successful
/// outcomes, see [`crate::ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenRejection),

    #[error("session {0} not found")]
    SessionNotFound(i64),

    #[error("token was issued for session {token_session}, not session {expected}")]
    SessionMismatch { expected: i64, token_session: i64 },

    #[error("student {student_id} is not registered for this session")]
    StudentNotEnrolled { session_id: i64, student_id: String },

    #[error("no attendance record for student {student_id} in session {session_id}")]
    RecordNotFound { session_id: i64, student_id: String },

    #[error("invalid attendance status '{0}'")]
    InvalidStatusValue(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("conflicting attendance write: {0}")]
    PersistenceConflict(String),

    #[error("failed to sign attendance token: {0}")]
    TokenSigning(String),

    #[error("failed to render attendance token: {0}")]
    Rendering(String),

    #[error("attendance storage unavailable: {0}")]
    Unavailable(String),
}

impl AttendanceError {
    /// Only storage faults are worth retrying; the core never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttendanceError::Unavailable(_))
    }

    /// Stable machine-readable tag for the boundary envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AttendanceError::InvalidToken(TokenRejection::BadSignature) => "bad_signature",
            AttendanceError::InvalidToken(TokenRejection::WrongPurpose) => "wrong_purpose",
            AttendanceError::InvalidToken(TokenRejection::Expired) => "expired",
            AttendanceError::SessionNotFound(_) => "session_not_found",
            AttendanceError::SessionMismatch { .. } => "session_mismatch",
            AttendanceError::StudentNotEnrolled { .. } => "student_not_enrolled",
            AttendanceError::RecordNotFound { .. } => "record_not_found",
            AttendanceError::InvalidStatusValue(_) => "invalid_status_value",
            AttendanceError::InvalidRequest(_) => "invalid_request",
            AttendanceError::PersistenceConflict(_) => "persistence_conflict",
            AttendanceError::TokenSigning(_) => "token_signing",
            AttendanceError::Rendering(_) => "rendering",
            AttendanceError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueConstraintViolation => {
                AttendanceError::PersistenceConflict("unique constraint violated".into())
            }
            StoreError::Unavailable(message) => AttendanceError::Unavailable(message),
        }
    }
}
