use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;

use crate::error::AppError;

pub const MAX_FAVORITES: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteNutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct FavoriteRow {
    name: String,
    nutrition: Option<Json<FavoriteNutrition>>,
    current_locations: Vec<String>,
    historical_locations: Vec<String>,
    added_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<FavoriteNutrition>,
    pub current_locations: Vec<String>,
    pub historical_locations: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl From<FavoriteRow> for Favorite {
    fn from(r: FavoriteRow) -> Self {
        Self {
            name: r.name,
            nutrition: r.nutrition.map(|j| j.0),
            current_locations: r.current_locations,
            historical_locations: r.historical_locations,
            added_at: r.added_at,
        }
    }
}

/// A favorite after enrichment, ready to store.
#[derive(Debug, Clone)]
pub struct NewFavorite {
    pub name: String,
    pub nutrition: Option<FavoriteNutrition>,
    pub current_locations: Vec<String>,
    pub historical_locations: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddRejection {
    #[error("Maximum favorites limit reached (20)")]
    LimitReached,
    #[error("Item already in favorites")]
    Duplicate,
}

impl From<AddRejection> for AppError {
    fn from(r: AddRejection) -> Self {
        AppError::validation(r.to_string())
    }
}

pub enum AddOutcome {
    Added(Vec<Favorite>),
    Rejected(AddRejection),
}

pub fn check_can_add(existing: &[String], name: &str) -> Result<(), AddRejection> {
    if existing.len() >= MAX_FAVORITES {
        return Err(AddRejection::LimitReached);
    }
    if existing.iter().any(|n| n == name) {
        return Err(AddRejection::Duplicate);
    }
    Ok(())
}

pub async fn list(db: &PgPool, user_id: &str) -> anyhow::Result<Vec<Favorite>> {
    let rows = sqlx::query_as::<_, FavoriteRow>(
        r#"
        SELECT name, nutrition, current_locations, historical_locations, added_at
          FROM favorites
         WHERE user_id = $1
         ORDER BY added_at, name
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(Favorite::from).collect())
}

/// Favorite names of several users, concatenated in the given user order.
pub async fn names_for_users(db: &PgPool, user_ids: &[String]) -> anyhow::Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT f.name
          FROM favorites f
          JOIN unnest($1::text[]) WITH ORDINALITY AS u(email, ord) ON f.user_id = u.email
         ORDER BY u.ord, f.added_at, f.name
        "#,
    )
    .bind(user_ids)
    .fetch_all(db)
    .await?;
    Ok(names)
}

pub async fn add(db: &PgPool, user_id: &str, fav: &NewFavorite) -> anyhow::Result<AddOutcome> {
    let mut tx = db.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("favorites:{user_id}"))
        .execute(&mut *tx)
        .await?;

    let existing: Vec<String> = sqlx::query_scalar("SELECT name FROM favorites WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
    if let Err(rejection) = check_can_add(&existing, &fav.name) {
        return Ok(AddOutcome::Rejected(rejection));
    }

    sqlx::query(
        r#"
        INSERT INTO favorites (user_id, name, nutrition, current_locations, historical_locations)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&fav.name)
    .bind(fav.nutrition.as_ref().map(Json))
    .bind(&fav.current_locations)
    .bind(&fav.historical_locations)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(AddOutcome::Added(list(db, user_id).await?))
}

pub async fn remove(db: &PgPool, user_id: &str, name: &str) -> anyhow::Result<Vec<Favorite>> {
    sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND name = $2")
        .bind(user_id)
        .bind(name)
        .execute(db)
        .await?;
    list(db, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Food {i}")).collect()
    }

    #[test]
    fn twentieth_favorite_is_accepted_and_twenty_first_is_not() {
        assert_eq!(check_can_add(&names(19), "Quiche"), Ok(()));
        assert_eq!(
            check_can_add(&names(20), "Quiche"),
            Err(AddRejection::LimitReached)
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert_eq!(
            check_can_add(&names(3), "Food 1"),
            Err(AddRejection::Duplicate)
        );
    }

    #[test]
    fn rejection_is_a_validation_error() {
        let err: AppError = AddRejection::LimitReached.into();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Maximum favorites limit reached (20)");
    }

    #[test]
    fn nested_nutrition_fills_missing_fields() {
        let n: FavoriteNutrition = serde_json::from_str(r#"{"calories": 310}"#).unwrap();
        assert_eq!(n.calories, 310.0);
        assert_eq!(n.protein, 0.0);
        assert!(n.serving_size.is_none());
    }
}
