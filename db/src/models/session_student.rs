use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, SqlErr};
use serde::{Deserialize, Serialize};

/// Roster membership: a student registered for a single session.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: String,
    pub joined_at: DateTime<Utc>,
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
    /// Adds `student_id` to the roster. Enrolling twice returns the existing row.
    pub async fn enroll(db: &DbConn, session_id: i64, student_id: &str) -> Result<Model, DbErr> {
        if let Some(existing) = Self::find(db, session_id, student_id).await? {
            return Ok(existing);
        }

        let active_model = ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id.to_owned()),
            joined_at: Set(Utc::now()),
        };

        match active_model.insert(db).await {
            Ok(model) => Ok(model),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Self::find(db, session_id, student_id)
                    .await?
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Enrolls through a session's join code. Unknown codes yield `None`.
    pub async fn enroll_by_join_code(
        db: &DbConn,
        join_code: &str,
        student_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        let Some(session) = super::class_session::Model::find_by_join_code(db, join_code).await?
        else {
            tracing::warn!(join_code, "enrollment with unknown join code ignored");
            return Ok(None);
        };

        Self::enroll(db, session.id, student_id).await.map(Some)
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

    pub async fn is_enrolled(db: &DbConn, session_id: i64, student_id: &str) -> Result<bool, DbErr> {
        Ok(Self::find(db, session_id, student_id).await?.is_some())
    }

    pub async fn roster(db: &DbConn, session_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }
}
