use common::config::Config;
use common::format_validation_errors;
use serde::Deserialize;
use validator::Validate;

use crate::error::AttendanceError;
use crate::reconcile::BatchEntry;

/// Caller-side token request. Omitted values fall back to configured defaults
/// before the issuer ever sees them.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueTokenRequest {
    pub session_id: i64,
    #[validate(range(min = 1, message = "validity_minutes must be positive"))]
    pub validity_minutes: Option<u32>,
    #[validate(range(min = 64, max = 2048, message = "size must be between 64 and 2048 pixels"))]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIssueRequest {
    pub session_id: i64,
    pub validity_minutes: u32,
    pub size: u32,
}

impl IssueTokenRequest {
    pub fn resolve(&self, config: &Config) -> Result<ResolvedIssueRequest, AttendanceError> {
        self.validate()
            .map_err(|e| AttendanceError::InvalidRequest(format_validation_errors(&e)))?;

        Ok(ResolvedIssueRequest {
            session_id: self.session_id,
            validity_minutes: self.validity_minutes.unwrap_or(config.token_validity_minutes),
            size: self.size.unwrap_or(config.qr_size),
        })
    }
}

/// Teacher-submitted batch of marks for one session.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub session_id: i64,
    pub entries: Vec<BatchEntry>,
}
