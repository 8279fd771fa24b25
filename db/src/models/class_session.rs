use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

const JOIN_CODE_LENGTH: usize = 8;

/// A scheduled class meeting that attendance is recorded against.
///
/// Sessions are owned by scheduling; the attendance core only ever reads them
/// by id or looks them up by join code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub subject_id: String,
    pub room_id: String,
    pub session_date: NaiveDate,
    pub start_period: i32,
    pub end_period: i32,
    /// Roster self-enrollment key.
    #[sea_orm(unique)]
    pub join_code: Option<String>,
    pub teacher_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session_student::Entity")]
    Students,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::session_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Inserts a session. A random join code is generated when none is given.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DbConn,
        subject_id: &str,
        room_id: &str,
        session_date: NaiveDate,
        start_period: i32,
        end_period: i32,
        join_code: Option<&str>,
        teacher_id: Option<&str>,
    ) -> Result<Model, DbErr> {
        let join_code = match join_code {
            Some(code) => code.to_owned(),
            None => generate_join_code(),
        };

        let active_model = ActiveModel {
            subject_id: Set(subject_id.to_owned()),
            room_id: Set(room_id.to_owned()),
            session_date: Set(session_date),
            start_period: Set(start_period),
            end_period: Set(end_period),
            join_code: Set(Some(join_code)),
            teacher_id: Set(teacher_id.map(|t| t.to_owned())),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn exists(db: &DbConn, id: i64) -> Result<bool, DbErr> {
        let count = Entity::find()
            .filter(Column::Id.eq(id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_by_join_code(db: &DbConn, join_code: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::JoinCode.eq(join_code.trim()))
            .one(db)
            .await
    }
}

fn generate_join_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOIN_CODE_LENGTH)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}
