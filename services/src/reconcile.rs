//! Batch application of teacher-submitted marks with per-row failure isolation.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::format_validation_errors;
use db::models::attendance_record::{AttendanceMethod, AttendanceStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AttendanceError;
use crate::ledger::{AttendanceLedger, RecordOutcome, StatusOutcome};
use crate::store::{AttendanceRecord, SessionDirectory};

/// One submitted row. `status` stays a raw string so that a bad value fails
/// only its own row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BatchEntry {
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub student_id: String,
    pub status: String,
}

impl BatchEntry {
    pub fn new(student_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            status: status.into(),
        }
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T)> for BatchEntry {
    fn from((student_id, status): (S, T)) -> Self {
        BatchEntry::new(student_id, status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Success {
        student_id: String,
        change: RowChange,
        record: AttendanceRecord,
    },
    Failure {
        student_id: String,
        error: AttendanceError,
    },
}

impl RowOutcome {
    pub fn student_id(&self) -> &str {
        match self {
            RowOutcome::Success { student_id, .. } | RowOutcome::Failure { student_id, .. } => {
                student_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Success { .. })
    }

    pub fn change(&self) -> Option<RowChange> {
        match self {
            RowOutcome::Success { change, .. } => Some(*change),
            RowOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RowOutcome::Success { change, .. } => match change {
                RowChange::Created => "Attendance recorded".to_owned(),
                RowChange::Updated => "Attendance status updated".to_owned(),
                RowChange::Unchanged => "Attendance already recorded".to_owned(),
            },
            RowOutcome::Failure { error, .. } => error.to_string(),
        }
    }
}

impl Serialize for RowOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut row = serializer.serialize_struct("RowOutcome", 5)?;
        row.serialize_field("student_id", self.student_id())?;
        row.serialize_field("success", &self.is_success())?;
        row.serialize_field("message", &self.message())?;
        match self {
            RowOutcome::Success { change, record, .. } => {
                row.serialize_field("change", change)?;
                row.serialize_field("record", record)?;
            }
            RowOutcome::Failure { error, .. } => {
                row.serialize_field("change", &Option::<RowChange>::None)?;
                row.serialize_field("error", error.kind())?;
            }
        }
        row.end()
    }
}

/// Applies a teacher's list of marks against the ledger.
///
/// Rows are processed in order and independently; the result always has one
/// outcome per input row, in input order.
#[derive(Clone)]
pub struct ReconciliationEngine {
    directory: Arc<dyn SessionDirectory>,
    ledger: AttendanceLedger,
}

impl ReconciliationEngine {
    pub fn new(directory: Arc<dyn SessionDirectory>, ledger: AttendanceLedger) -> Self {
        Self { directory, ledger }
    }

    pub async fn reconcile(
        &self,
        session_id: i64,
        entries: &[BatchEntry],
        now: DateTime<Utc>,
    ) -> Vec<RowOutcome> {
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let outcome = match self.reconcile_row(session_id, entry, now).await {
                Ok((change, record)) => RowOutcome::Success {
                    student_id: entry.student_id.clone(),
                    change,
                    record,
                },
                Err(error) => {
                    tracing::warn!(
                        session_id,
                        student_id = %entry.student_id,
                        error = %error,
                        "batch row rejected"
                    );
                    RowOutcome::Failure {
                        student_id: entry.student_id.clone(),
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(
            session_id,
            rows = outcomes.len(),
            failed,
            "batch reconciliation finished"
        );
        outcomes
    }

    async fn reconcile_row(
        &self,
        session_id: i64,
        entry: &BatchEntry,
        now: DateTime<Utc>,
    ) -> Result<(RowChange, AttendanceRecord), AttendanceError> {
        entry
            .validate()
            .map_err(|e| AttendanceError::InvalidRequest(format_validation_errors(&e)))?;

        let status = parse_status(&entry.status)?;

        if !self
            .directory
            .is_enrolled(session_id, &entry.student_id)
            .await?
        {
            return Err(AttendanceError::StudentNotEnrolled {
                session_id,
                student_id: entry.student_id.clone(),
            });
        }

        let outcome = self
            .ledger
            .record_with_status(
                session_id,
                &entry.student_id,
                AttendanceMethod::Manual,
                status,
                now,
            )
            .await?;

        match outcome {
            RecordOutcome::Created(record) => Ok((RowChange::Created, record)),
            RecordOutcome::AlreadyRecorded(_) => {
                match self
                    .ledger
                    .update_status(session_id, &entry.student_id, status, now)
                    .await?
                {
                    StatusOutcome::Updated(record) => Ok((RowChange::Updated, record)),
                    StatusOutcome::Unchanged(record) => Ok((RowChange::Unchanged, record)),
                }
            }
        }
    }
}

/// Parses a status name case-insensitively, e.g. `"Late"`.
pub fn parse_status(raw: &str) -> Result<AttendanceStatus, AttendanceError> {
    AttendanceStatus::from_str(raw.trim())
        .map_err(|_| AttendanceError::InvalidStatusValue(raw.to_owned()))
}
