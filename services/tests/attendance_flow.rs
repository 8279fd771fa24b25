use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use db::models::attendance_record::{AttendanceMethod, AttendanceStatus};
use db::models::{class_session, session_student};
use db::test_utils::setup_test_db;
use futures::future::join_all;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use services::store::{AttendanceStore, StoreError};
use services::token::{AttendanceClaims, TokenCodec, TokenRejection};
use services::{
    AttendanceError, AttendanceRecord, AttendanceService, BatchEntry, RecordOutcome, RowChange,
    SeaOrmStore, ServiceResponse, StatusOutcome,
};
use tokio::sync::Barrier;

const SESSION: i64 = 101;

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 8, h, m, s).unwrap()
}

async fn seed(enrolled: &[&str]) -> DatabaseConnection {
    let db = setup_test_db().await;
    class_session::ActiveModel {
        id: Set(SESSION),
        subject_id: Set("COS301".into()),
        room_id: Set("IT-4-1".into()),
        session_date: Set(NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()),
        start_period: Set(1),
        end_period: Set(3),
        join_code: Set(Some("ROLLCALL".into())),
        teacher_id: Set(Some("T1".into())),
        created_at: Set(at(8, 0, 0)),
    }
    .insert(&db)
    .await
    .unwrap();

    for student in enrolled {
        session_student::Model::enroll(&db, SESSION, student)
            .await
            .unwrap();
    }
    db
}

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::from_secret(b"attendance-flow"))
}

#[tokio::test]
async fn test_scan_window_scenario() {
    let service = AttendanceService::with_database(codec(), seed(&["S1", "S2"]).await);

    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();

    let first = service
        .verify_and_record(&issued.token, "S1", at(10, 4, 30))
        .await
        .unwrap();
    let RecordOutcome::Created(record) = &first else {
        panic!("expected Created, got {first:?}");
    };
    assert_eq!(record.status, AttendanceStatus::Present);
    assert_eq!(record.method, AttendanceMethod::Qr);
    assert_eq!(record.recorded_at, at(10, 4, 30));

    let second = service
        .verify_and_record(&issued.token, "S1", at(10, 4, 45))
        .await
        .unwrap();
    assert_eq!(second, RecordOutcome::AlreadyRecorded(record.clone()));

    let late = service
        .verify_and_record(&issued.token, "S2", at(10, 5, 1))
        .await
        .unwrap_err();
    assert_eq!(late, AttendanceError::InvalidToken(TokenRejection::Expired));

    let stored = service.records_for_session(SESSION).await.unwrap();
    assert_eq!(stored, vec![record.clone()]);
}

#[tokio::test]
async fn test_token_boundary_around_five_minutes() {
    let service = AttendanceService::with_database(codec(), seed(&["S1", "S2"]).await);
    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();

    assert!(
        service
            .verify_and_record(&issued.token, "S1", at(10, 4, 59))
            .await
            .is_ok()
    );
    assert_eq!(
        service
            .verify_and_record(&issued.token, "S2", at(10, 5, 1))
            .await
            .unwrap_err()
            .kind(),
        "expired"
    );
}

#[tokio::test]
async fn test_token_with_other_purpose_is_rejected() {
    let codec = codec();
    let service = AttendanceService::with_database(codec.clone(), seed(&["S1"]).await);

    let mut claims = AttendanceClaims::for_session(SESSION, at(10, 0, 0), 5);
    claims.purpose = "password_reset".into();
    let forged = codec.sign(&claims).unwrap();

    let err = service
        .verify_and_record(&forged, "S1", at(10, 1, 0))
        .await
        .unwrap_err();
    assert_eq!(err, AttendanceError::InvalidToken(TokenRejection::WrongPurpose));
}

#[tokio::test]
async fn test_token_from_another_process_is_rejected() {
    let db = seed(&["S1"]).await;
    let other = AttendanceService::with_database(
        Arc::new(TokenCodec::from_secret(b"some-other-process")),
        db.clone(),
    );
    let service = AttendanceService::with_database(codec(), db);

    let issued = other.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();
    let err = service
        .verify_and_record(&issued.token, "S1", at(10, 1, 0))
        .await
        .unwrap_err();

    assert_eq!(err, AttendanceError::InvalidToken(TokenRejection::BadSignature));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_scan_records_once() {
    const SCANS: usize = 8;

    let service = AttendanceService::with_database(codec(), seed(&["S1"]).await);
    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();

    let scans = (0..SCANS).map(|i| {
        let service = service.clone();
        let token = issued.token.clone();
        tokio::spawn(async move {
            service
                .verify_and_record(&token, "S1", at(10, 1, 0) + Duration::milliseconds(i as i64))
                .await
        })
    });
    let outcomes: Vec<RecordOutcome> = join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let created = outcomes.iter().filter(|o| o.is_created()).count();
    assert_eq!(created, 1);
    assert_eq!(outcomes.len() - created, SCANS - 1);
    assert_eq!(service.records_for_session(SESSION).await.unwrap().len(), 1);
}

/// Holds every first read at a barrier so all callers miss the existence
/// check and collide on insert.
struct RacingStore {
    inner: SeaOrmStore,
    gate: Barrier,
    gated_reads: AtomicUsize,
}

#[async_trait]
impl AttendanceStore for RacingStore {
    async fn find_record(
        &self,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let found = self.inner.find_record(session_id, student_id).await?;
        let gated = self
            .gated_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.gate.wait().await;
        }
        Ok(found)
    }

    async fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        self.inner.insert_record(record).await
    }

    async fn update_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        self.inner.update_record(record).await
    }

    async fn records_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.inner.records_for_session(session_id).await
    }

    async fn records_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.inner.records_for_student(student_id).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forced_insert_race_reports_already_recorded() {
    const SCANS: usize = 3;

    let inner = SeaOrmStore::new(seed(&["S1"]).await);
    let racing = Arc::new(RacingStore {
        inner: inner.clone(),
        gate: Barrier::new(SCANS),
        gated_reads: AtomicUsize::new(SCANS),
    });
    let service = AttendanceService::new(codec(), Arc::new(inner.clone()), racing);
    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();

    let scans = (0..SCANS).map(|_| {
        let service = service.clone();
        let token = issued.token.clone();
        tokio::spawn(async move { service.verify_and_record(&token, "S1", at(10, 2, 0)).await })
    });
    let outcomes: Vec<RecordOutcome> = join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let winner = outcomes.iter().find(|o| o.is_created()).unwrap().clone();
    for outcome in outcomes.iter().filter(|o| !o.is_created()) {
        assert_eq!(outcome, &RecordOutcome::AlreadyRecorded(winner.record().clone()));
    }
    assert_eq!(outcomes.iter().filter(|o| o.is_created()).count(), 1);
    assert_eq!(inner.records_for_session(SESSION).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_partial_failure() {
    let service = AttendanceService::with_database(codec(), seed(&["S1", "S3"]).await);
    let entries: Vec<BatchEntry> = vec![
        ("S1", "present").into(),
        ("S2", "late").into(),
        ("S3", "present").into(),
    ];

    let rows = service
        .batch_reconcile(SESSION, &entries, at(10, 30, 0))
        .await
        .unwrap();

    let summary: Vec<(&str, Option<RowChange>)> =
        rows.iter().map(|r| (r.student_id(), r.change())).collect();
    assert_eq!(
        summary,
        vec![
            ("S1", Some(RowChange::Created)),
            ("S2", None),
            ("S3", Some(RowChange::Created)),
        ]
    );
    assert!(rows[1].message().contains("not registered"));

    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(json[1]["success"], false);
    assert_eq!(json[1]["error"], "student_not_enrolled");
    assert_eq!(json[2]["record"]["method"], "manual");
}

#[tokio::test]
async fn test_batch_bad_status_fails_only_its_row() {
    let service = AttendanceService::with_database(codec(), seed(&["S1", "S2"]).await);
    let entries: Vec<BatchEntry> = vec![("S1", "tardy").into(), ("S2", "Late").into()];

    let rows = service
        .batch_reconcile(SESSION, &entries, at(10, 30, 0))
        .await
        .unwrap();

    assert_eq!(rows[0].message(), "invalid attendance status 'tardy'");
    assert_eq!(rows[1].change(), Some(RowChange::Created));
    let stored = service.records_for_session(SESSION).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, AttendanceStatus::Late);
}

#[tokio::test]
async fn test_status_transition_freedom() {
    let service = AttendanceService::with_database(codec(), seed(&["S1"]).await);
    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();
    service
        .verify_and_record(&issued.token, "S1", at(10, 1, 0))
        .await
        .unwrap();

    let updated = service
        .update_status(SESSION, "S1", "absent", at(11, 0, 0))
        .await
        .unwrap();
    let StatusOutcome::Updated(record) = &updated else {
        panic!("expected Updated, got {updated:?}");
    };
    assert_eq!(record.status, AttendanceStatus::Absent);
    assert_eq!(record.recorded_at, at(11, 0, 0));
    assert_eq!(record.method, AttendanceMethod::Qr);

    let again = service
        .update_status(SESSION, "S1", "absent", at(11, 5, 0))
        .await
        .unwrap();
    assert_eq!(again, StatusOutcome::Unchanged(record.clone()));
}

#[tokio::test]
async fn test_update_of_missing_record_is_not_found() {
    let service = AttendanceService::with_database(codec(), seed(&["S1"]).await);

    let err = service
        .update_status(SESSION, "S1", "late", at(11, 0, 0))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AttendanceError::RecordNotFound {
            session_id: SESSION,
            student_id: "S1".into()
        }
    );
}

#[tokio::test]
async fn test_join_code_enrollment_then_scan() {
    let db = seed(&[]).await;
    let service = AttendanceService::with_database(codec(), db.clone());

    assert!(
        session_student::Model::enroll_by_join_code(&db, "NOSUCHCD", "S7")
            .await
            .unwrap()
            .is_none()
    );
    session_student::Model::enroll_by_join_code(&db, "ROLLCALL", "S7")
        .await
        .unwrap()
        .unwrap();

    let issued = service.issue_token(SESSION, 5, at(10, 0, 0)).await.unwrap();
    let outcome = service
        .verify_and_record(&issued.token, "S7", at(10, 0, 5))
        .await
        .unwrap();
    assert!(outcome.is_created());

    let report = service.student_report("S7").await.unwrap();
    assert_eq!(report.total_sessions, 1);
    assert_eq!(report.present_percentage, 100.0);
}

#[tokio::test]
async fn test_outcomes_wrap_into_envelope() {
    let service = AttendanceService::with_database(codec(), seed(&["S1"]).await);

    let created = service.manual_record(SESSION, "S1", at(10, 0, 0)).await;
    let envelope = ServiceResponse::from_result(created, |o| o.message().to_owned());
    assert!(envelope.success);
    assert_eq!(envelope.message, "Attendance recorded");

    let duplicate = service.manual_record(SESSION, "S1", at(10, 0, 1)).await;
    let envelope = ServiceResponse::from_result(duplicate, |o| o.message().to_owned());
    assert!(envelope.success);
    assert_eq!(envelope.message, "Attendance already recorded for this student");

    let missing = service.manual_record(SESSION + 1, "S1", at(10, 0, 2)).await;
    let envelope = ServiceResponse::from_result(missing, |o| o.message().to_owned());
    assert!(!envelope.success);
    assert_eq!(envelope.error, Some("session_not_found"));
    assert!(!envelope.retryable);
}
