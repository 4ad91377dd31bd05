use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::engine::{recommend, Recommendation};
use crate::{
    auth::AuthUser,
    clock::{format_date, local_now, parse_date},
    error::{AppError, AppResult},
    favorites::repo as favorites_repo,
    menu::{
        period::{next_meal_slot, MealPeriod},
        repo as menu_repo,
    },
    social::repo as social_repo,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/recommendations/dining", post(recommend_dining))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningRequest {
    pub user_id: String,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub meal_period: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Favorites of the caller, or of every member of the caller's group.
async fn resolve_favorites(
    state: &AppState,
    caller: &str,
    group_id: Option<Uuid>,
) -> AppResult<Vec<String>> {
    let Some(group_id) = group_id else {
        return Ok(favorites_repo::names_for_users(&state.db, &[caller.to_string()]).await?);
    };
    let group = social_repo::find_group(&state.db, group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    if !group.has_member(caller) {
        return Err(AppError::forbidden("Not a member of this group"));
    }
    Ok(favorites_repo::names_for_users(&state.db, &group.members).await?)
}

#[instrument(skip(state, user, payload))]
pub async fn recommend_dining(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DiningRequest>,
) -> AppResult<Json<Recommendation>> {
    user.ensure_owner(&payload.user_id)?;

    let (default_period, default_date) = next_meal_slot(local_now(state.config.utc_offset_hours));
    let period = match payload.meal_period.as_deref() {
        Some(raw) => MealPeriod::parse(raw)
            .ok_or_else(|| AppError::validation("mealPeriod must be Breakfast, Lunch or Dinner"))?,
        None => default_period,
    };
    let date = match payload.date.as_deref() {
        Some(raw) => parse_date(raw).ok_or_else(|| AppError::validation("date must be YYYY-MM-DD"))?,
        None => default_date,
    };

    let favorites = resolve_favorites(&state, user.email(), payload.group_id).await?;
    let items = menu_repo::items_for_slot(&state.db, date, period).await?;

    let rec = recommend(
        &favorites,
        &items,
        period,
        format_date(date),
        &mut rand::thread_rng(),
    );
    info!(
        user_id = %user.email(),
        group_id = ?payload.group_id,
        %period,
        court = %rec.dining_court,
        confidence = rec.confidence,
        random = rec.random_selection,
        "dining recommendation"
    );
    Ok(Json(rec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn post(body: &'static str) -> StatusCode {
        let state = AppState::fake();
        let keys = crate::auth::jwt::JwtKeys::from_ref(&state);
        let token = keys.sign_access(Uuid::new_v4(), "me@x.edu").unwrap();
        routes()
            .with_state(state)
            .oneshot(
                Request::post("/recommendations/dining")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn unknown_meal_period_is_rejected() {
        let status = post(r#"{"userId":"me@x.edu","mealPeriod":"Brunch"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommending_for_another_user_is_forbidden() {
        let status = post(r#"{"userId":"you@x.edu"}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
