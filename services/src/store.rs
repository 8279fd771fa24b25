//! Persistence seams consumed by the attendance core, and their sea-orm
//! implementation.

use async_trait::async_trait;
use db::models::{attendance_record, class_session, session_student};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use thiserror::Error;

pub use db::models::attendance_record::Model as AttendanceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("a record with this key already exists")]
    UniqueConstraintViolation,
    #[error("{0}")]
    Unavailable(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::UniqueConstraintViolation,
            _ => {
                tracing::error!(error = %err, "attendance storage fault");
                StoreError::Unavailable(err.to_string())
            }
        }
    }
}

/// Session and roster lookups owned by scheduling.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn session_exists(&self, session_id: i64) -> Result<bool, StoreError>;

    async fn is_enrolled(&self, session_id: i64, student_id: &str) -> Result<bool, StoreError>;
}

/// Flat record store keyed by (session, student).
///
/// `insert_record` must reject a duplicate key with
/// [`StoreError::UniqueConstraintViolation`]; the ledger relies on that to
/// settle concurrent first recordings.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_record(
        &self,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError>;

    async fn update_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError>;

    async fn records_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn records_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}

/// Both seams over one sea-orm connection pool.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SessionDirectory for SeaOrmStore {
    async fn session_exists(&self, session_id: i64) -> Result<bool, StoreError> {
        Ok(class_session::Model::exists(&self.db, session_id).await?)
    }

    async fn is_enrolled(&self, session_id: i64, student_id: &str) -> Result<bool, StoreError> {
        Ok(session_student::Model::is_enrolled(&self.db, session_id, student_id).await?)
    }
}

#[async_trait]
impl AttendanceStore for SeaOrmStore {
    async fn find_record(
        &self,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(attendance_record::Model::find(&self.db, session_id, student_id).await?)
    }

    async fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        Ok(attendance_record::Model::insert(&self.db, record).await?)
    }

    async fn update_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        Ok(attendance_record::Model::overwrite(&self.db, record).await?)
    }

    async fn records_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(attendance_record::Model::for_session(&self.db, session_id).await?)
    }

    async fn records_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(attendance_record::Model::for_student(&self.db, student_id).await?)
    }
}
