use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One attendance entry per (session, student).
///
/// The composite primary key is the uniqueness constraint that makes
/// recording idempotent; a second insert for the same pair is rejected by
/// the database.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: String,
    pub method: AttendanceMethod,
    pub status: AttendanceStatus,
    pub recorded_at: DateTime<Utc>,
}

/// How a record was first captured.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_method")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceMethod {
    #[sea_orm(string_value = "qr")]
    Qr,

    #[sea_orm(string_value = "manual")]
    Manual,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "late")]
    Late,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_session::Entity",
        from = "Column::SessionId",
        to = "super::class_session::Column::Id"
    )]
    Session,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn new(
        session_id: i64,
        student_id: &str,
        method: AttendanceMethod,
        status: AttendanceStatus,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            student_id: student_id.to_owned(),
            method,
            status,
            recorded_at,
        }
    }

    pub async fn find(
        db: &DbConn,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id((session_id, student_id.to_owned()))
            .one(db)
            .await
    }

    /// Plain insert. Duplicate keys surface as a unique-constraint `DbErr`.
    pub async fn insert(db: &DbConn, record: Model) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            session_id: Set(record.session_id),
            student_id: Set(record.student_id),
            method: Set(record.method),
            status: Set(record.status),
            recorded_at: Set(record.recorded_at),
        };
        active_model.insert(db).await
    }

    /// Overwrites the mutable columns of the row keyed by `record`.
    pub async fn overwrite(db: &DbConn, record: Model) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            session_id: Unchanged(record.session_id),
            student_id: Unchanged(record.student_id),
            method: Set(record.method),
            status: Set(record.status),
            recorded_at: Set(record.recorded_at),
        };
        active_model.update(db).await
    }

    pub async fn for_session(db: &DbConn, session_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    pub async fn for_student(db: &DbConn, student_id: &str) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_asc(Column::SessionId)
            .all(db)
            .await
    }
}
