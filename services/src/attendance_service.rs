//! Request-level operations over the attendance core.
//!
//! Each operation takes the wall-clock instant explicitly so that callers
//! (and tests) decide what "now" is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::config::Config;
use db::models::attendance_record::AttendanceMethod;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::error::AttendanceError;
use crate::ledger::{AttendanceLedger, RecordOutcome, StatusOutcome};
use crate::notify::{self, AttendanceNotifier, LogNotifier};
use crate::qr::{SvgQrRenderer, TokenRenderer};
use crate::reconcile::{self, BatchEntry, ReconciliationEngine, RowChange, RowOutcome};
use crate::report::{SessionSummary, StudentReport};
use crate::request::IssueTokenRequest;
use crate::store::{AttendanceRecord, AttendanceStore, SeaOrmStore, SessionDirectory};
use crate::token::{IssuedToken, TokenCodec, TokenIssuer, TokenValidator};

/// A freshly issued token together with its rendered image.
#[derive(Debug, Clone, Serialize)]
pub struct QrImage {
    #[serde(flatten)]
    pub issued: IssuedToken,
    pub content_type: &'static str,
    #[serde(skip)]
    pub image: Vec<u8>,
}

#[derive(Clone)]
pub struct AttendanceService {
    issuer: TokenIssuer,
    validator: TokenValidator,
    directory: Arc<dyn SessionDirectory>,
    ledger: AttendanceLedger,
    reconciler: ReconciliationEngine,
    notifier: Arc<dyn AttendanceNotifier>,
    renderer: Arc<dyn TokenRenderer>,
}

impl AttendanceService {
    pub fn new(
        codec: Arc<TokenCodec>,
        directory: Arc<dyn SessionDirectory>,
        store: Arc<dyn AttendanceStore>,
    ) -> Self {
        let ledger = AttendanceLedger::new(store);
        Self {
            issuer: TokenIssuer::new(codec.clone()),
            validator: TokenValidator::new(codec),
            reconciler: ReconciliationEngine::new(directory.clone(), ledger.clone()),
            directory,
            ledger,
            notifier: Arc::new(LogNotifier),
            renderer: Arc::new(SvgQrRenderer),
        }
    }

    /// Wires both persistence seams to one sea-orm connection.
    pub fn with_database(codec: Arc<TokenCodec>, db: DatabaseConnection) -> Self {
        let store = Arc::new(SeaOrmStore::new(db));
        Self::new(codec, store.clone(), store)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AttendanceNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TokenRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn issue_token(
        &self,
        session_id: i64,
        validity_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AttendanceError> {
        self.require_session(session_id).await?;
        self.issuer
            .issue_attendance_token(session_id, validity_minutes, now)
            .map_err(|e| AttendanceError::TokenSigning(e.to_string()))
    }

    pub async fn issue_qr(
        &self,
        session_id: i64,
        validity_minutes: u32,
        pixel_size: u32,
        now: DateTime<Utc>,
    ) -> Result<QrImage, AttendanceError> {
        let issued = self.issue_token(session_id, validity_minutes, now).await?;
        let image = self
            .renderer
            .render(&issued.token, pixel_size)
            .map_err(|e| AttendanceError::Rendering(e.to_string()))?;

        Ok(QrImage {
            issued,
            content_type: self.renderer.content_type(),
            image,
        })
    }

    /// Validates the caller's request, fills omitted values from `config` and
    /// issues a QR token.
    pub async fn issue_qr_for(
        &self,
        request: &IssueTokenRequest,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Result<QrImage, AttendanceError> {
        let resolved = request.resolve(config)?;
        self.issue_qr(
            resolved.session_id,
            resolved.validity_minutes,
            resolved.size,
            now,
        )
        .await
    }

    /// Student self-recording from a scanned token.
    pub async fn verify_and_record(
        &self,
        token: &str,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        let claims = self.validate(token, now)?;
        self.record_checked(claims.session_id, student_id, AttendanceMethod::Qr, now)
            .await
    }

    /// As [`verify_and_record`](Self::verify_and_record), for a caller that
    /// already knows which session the student is presenting to.
    pub async fn verify_and_record_in(
        &self,
        session_id: i64,
        token: &str,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        let claims = self.validate(token, now)?;
        if claims.session_id != session_id {
            tracing::warn!(
                expected = session_id,
                token_session = claims.session_id,
                "attendance token presented to the wrong session"
            );
            return Err(AttendanceError::SessionMismatch {
                expected: session_id,
                token_session: claims.session_id,
            });
        }
        self.record_checked(session_id, student_id, AttendanceMethod::Qr, now)
            .await
    }

    /// Teacher marks a single student present.
    pub async fn manual_record(
        &self,
        session_id: i64,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        self.record_checked(session_id, student_id, AttendanceMethod::Manual, now)
            .await
    }

    pub async fn batch_reconcile(
        &self,
        session_id: i64,
        entries: &[BatchEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<RowOutcome>, AttendanceError> {
        self.require_session(session_id).await?;

        let rows = self.reconciler.reconcile(session_id, entries, now).await;
        for row in &rows {
            if let RowOutcome::Success {
                change: RowChange::Created | RowChange::Updated,
                record,
                ..
            } = row
            {
                notify::dispatch(&self.notifier, record);
            }
        }
        Ok(rows)
    }

    pub async fn update_status(
        &self,
        session_id: i64,
        student_id: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusOutcome, AttendanceError> {
        let status = reconcile::parse_status(status)?;
        let outcome = self
            .ledger
            .update_status(session_id, student_id, status, now)
            .await?;

        if let StatusOutcome::Updated(record) = &outcome {
            notify::dispatch(&self.notifier, record);
        }
        Ok(outcome)
    }

    pub async fn session_summary(&self, session_id: i64) -> Result<SessionSummary, AttendanceError> {
        self.require_session(session_id).await?;
        let records = self.ledger.records_for_session(session_id).await?;
        Ok(SessionSummary::from_records(session_id, &records))
    }

    pub async fn student_report(&self, student_id: &str) -> Result<StudentReport, AttendanceError> {
        let records = self.ledger.records_for_student(student_id).await?;
        Ok(StudentReport::from_records(student_id, records))
    }

    pub async fn records_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.ledger.records_for_session(session_id).await
    }

    pub async fn records_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.ledger.records_for_student(student_id).await
    }

    fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<crate::token::AttendanceClaims, AttendanceError> {
        self.validator.validate(token, now).map_err(|reason| {
            tracing::warn!(reason = %reason, "attendance token rejected");
            AttendanceError::InvalidToken(reason)
        })
    }

    async fn require_session(&self, session_id: i64) -> Result<(), AttendanceError> {
        if self.directory.session_exists(session_id).await? {
            Ok(())
        } else {
            Err(AttendanceError::SessionNotFound(session_id))
        }
    }

    async fn record_checked(
        &self,
        session_id: i64,
        student_id: &str,
        method: AttendanceMethod,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, AttendanceError> {
        self.require_session(session_id).await?;
        if !self.directory.is_enrolled(session_id, student_id).await? {
            return Err(AttendanceError::StudentNotEnrolled {
                session_id,
                student_id: student_id.to_owned(),
            });
        }

        let outcome = self
            .ledger
            .record_attendance(session_id, student_id, method, now)
            .await?;

        if let RecordOutcome::Created(record) = &outcome {
            notify::dispatch(&self.notifier, record);
        }
        Ok(outcome)
    }
}
