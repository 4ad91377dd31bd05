use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AddFoodRequest, MealLog},
    repo::{self, DayBounds},
    services::{scale, validate_food},
};
use crate::{
    auth::AuthUser,
    clock::{day_bounds, local_now},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dietary/meals/:user_id/today", get(get_today))
        .route("/dietary/add-food", post(add_food))
        .route("/dietary/remove-food/:user_id/:food_id", delete(remove_food))
}

pub(crate) fn today_bounds(state: &AppState) -> (DayBounds, time::OffsetDateTime) {
    let now = local_now(state.config.utc_offset_hours);
    (day_bounds(now), now)
}

pub(crate) async fn todays_log(state: &AppState, user_id: &str) -> AppResult<MealLog> {
    let (bounds, now) = today_bounds(state);
    Ok(repo::today(&state.db, user_id, bounds, now).await?)
}

#[instrument(skip(state, user))]
pub async fn get_today(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<MealLog>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(todays_log(&state, user.email()).await?))
}

#[instrument(skip(state, user, payload))]
pub async fn add_food(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFoodRequest>,
) -> AppResult<Json<MealLog>> {
    user.ensure_owner(&payload.user_id)?;
    validate_food(&payload.food, payload.servings)?;

    let entry = scale(&payload.food, payload.servings);
    let (bounds, now) = today_bounds(&state);
    let log = repo::add_food(&state.db, user.email(), bounds, now, &entry).await?;

    info!(user_id = %user.email(), food = %entry.name, servings = entry.servings, "food logged");
    Ok(Json(log))
}

#[instrument(skip(state, user))]
pub async fn remove_food(
    State(state): State<AppState>,
    user: AuthUser,
    Path((user_id, food_id)): Path<(String, Uuid)>,
) -> AppResult<Json<MealLog>> {
    user.ensure_owner(&user_id)?;
    let (bounds, _) = today_bounds(&state);
    match repo::remove_food(&state.db, user.email(), bounds, food_id).await? {
        Some(log) => {
            info!(user_id = %user.email(), %food_id, "food removed");
            Ok(Json(log))
        }
        None => {
            warn!(user_id = %user.email(), %food_id, "food entry not in today's log");
            Err(AppError::not_found("Food entry not found in today's log"))
        }
    }
}
