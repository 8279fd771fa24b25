//! The authoritative attendance store: one record per (session, student).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::attendance_record::{AttendanceMethod, AttendanceStatus};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::store::{AttendanceRecord, AttendanceStore, StoreError};

/// Result of a first-recording attempt. Both variants are successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum RecordOutcome {
    Created(AttendanceRecord),
    AlreadyRecorded(AttendanceRecord),
}

impl RecordOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            RecordOutcome::Created(r) | RecordOutcome::AlreadyRecorded(r) => r,
        }
    }

    pub fn into_record(self) -> AttendanceRecord {
        match self {
            RecordOutcome::Created(r) | RecordOutcome::AlreadyRecorded(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            RecordOutcome::Created(_) => "Attendance recorded",
            RecordOutcome::AlreadyRecorded(_) => "Attendance already recorded for this student",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum StatusOutcome {
    Updated(AttendanceRecord),
    Unchanged(AttendanceRecord),
}

impl StatusOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            StatusOutcome::Updated(r) | StatusOutcome::Unchanged(r) => r,
        }
    }

    pub fn into_record(self) -> AttendanceRecord {
        match self {
            StatusOutcome::Updated(r) | StatusOutcome::Unchanged(r) => r,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            StatusOutcome::Updated(_) => "Attendance status updated",
            StatusOutcome::Unchanged(_) => "Attendance status already set",
        }
    }
}

/// Enforces at-most-one record per (session, student).
///
/// Session existence and enrollment are the caller's preconditions.
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Records the student as present, or returns the record that already exists.
    pub async fn record_attendance(
        &self,
        session_id: i64,
        student_id: &str,
        method: AttendanceMethod,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        self.record_with_status(session_id, student_id, method, AttendanceStatus::Present, now)
            .await
    }

    /// As [`record_attendance`](Self::record_attendance) with an explicit
    /// initial status.
    ///
    /// The existence check is only a fast path. Two callers can both miss it;
    /// the store's unique key then rejects the slower insert and that caller
    /// re-reads the winner's row and reports `AlreadyRecorded`.
    pub async fn record_with_status(
        &self,
        session_id: i64,
        student_id: &str,
        method: AttendanceMethod,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        if let Some(existing) = self.store.find_record(session_id, student_id).await? {
            tracing::debug!(session_id, student_id, "attendance already recorded");
            return Ok(RecordOutcome::AlreadyRecorded(existing));
        }

        let record = AttendanceRecord::new(session_id, student_id, method, status, now);
        match self.store.insert_record(record).await {
            Ok(created) => {
                tracing::info!(
                    session_id,
                    student_id,
                    method = %created.method,
                    status = %created.status,
                    "attendance recorded"
                );
                Ok(RecordOutcome::Created(created))
            }
            Err(StoreError::UniqueConstraintViolation) => {
                tracing::debug!(session_id, student_id, "lost insert race, re-reading record");
                match self.store.find_record(session_id, student_id).await? {
                    Some(existing) => Ok(RecordOutcome::AlreadyRecorded(existing)),
                    None => Err(AttendanceError::PersistenceConflict(format!(
                        "record for student {student_id} in session {session_id} was rejected as a duplicate but could not be read back"
                    ))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrites the status of an existing record. Any status may replace any other.
    pub async fn update_status(
        &self,
        session_id: i64,
        student_id: &str,
        new_status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusOutcome, AttendanceError> {
        let Some(existing) = self.store.find_record(session_id, student_id).await? else {
            return Err(AttendanceError::RecordNotFound {
                session_id,
                student_id: student_id.to_owned(),
            });
        };

        if existing.status == new_status {
            return Ok(StatusOutcome::Unchanged(existing));
        }

        let previous = existing.status;
        let changed = AttendanceRecord {
            status: new_status,
            recorded_at: now,
            ..existing
        };
        let saved = self.store.update_record(changed).await?;

        tracing::info!(
            session_id,
            student_id,
            from = %previous,
            to = %saved.status,
            "attendance status updated"
        );
        Ok(StatusOutcome::Updated(saved))
    }

    pub async fn find(
        &self,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        Ok(self.store.find_record(session_id, student_id).await?)
    }

    pub async fn records_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self.store.records_for_session(session_id).await?)
    }

    pub async fn records_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self.store.records_for_student(student_id).await?)
    }
}
