use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::SurveyAnswers;

#[derive(Debug, Clone, FromRow)]
pub struct Survey {
    pub user_id: String,
    pub answers: Json<SurveyAnswers>,
    pub completed_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn find(db: &PgPool, user_id: &str) -> anyhow::Result<Option<Survey>> {
    let row = sqlx::query_as::<_, Survey>(
        r#"
        SELECT user_id, answers, completed_at, updated_at
          FROM surveys
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn find_answers(db: &PgPool, user_id: &str) -> anyhow::Result<Option<SurveyAnswers>> {
    Ok(find(db, user_id).await?.map(|s| s.answers.0))
}

pub async fn exists(db: &PgPool, user_id: &str) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM surveys WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(found)
}

/// Inserts or replaces the survey; returns the answers it replaced, if any.
pub async fn upsert(
    db: &PgPool,
    user_id: &str,
    answers: &SurveyAnswers,
) -> anyhow::Result<Option<SurveyAnswers>> {
    let mut tx = db.begin().await?;
    let previous: Option<Json<SurveyAnswers>> =
        sqlx::query_scalar("SELECT answers FROM surveys WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    sqlx::query(
        r#"
        INSERT INTO surveys (user_id, answers)
        VALUES ($1, $2)
        ON CONFLICT (user_id)
        DO UPDATE SET answers = EXCLUDED.answers, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(Json(answers))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(previous.map(|j| j.0))
}

pub async fn update_answers(
    db: &PgPool,
    user_id: &str,
    answers: &SurveyAnswers,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE surveys SET answers = $2, updated_at = now() WHERE user_id = $1")
        .bind(user_id)
        .bind(Json(answers))
        .execute(db)
        .await?;
    Ok(())
}
