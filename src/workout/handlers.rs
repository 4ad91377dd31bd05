use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::{plan::{PlanStyle, WorkoutPlan}, services};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    survey,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workout-plan/:user_id", get(get_plan))
        .route("/workout-plan/:user_id/regenerate", post(regenerate_plan))
}

#[derive(Debug, Deserialize, Default)]
pub struct PlanQuery {
    #[serde(default)]
    pub format: PlanStyle,
}

async fn load_answers(
    state: &AppState,
    user_id: &str,
) -> AppResult<survey::dto::SurveyAnswers> {
    survey::repo::find_answers(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Survey not found. Please complete the survey first."))
}

#[instrument(skip(state, user))]
pub async fn get_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    Query(q): Query<PlanQuery>,
) -> AppResult<Json<WorkoutPlan>> {
    user.ensure_owner(&user_id)?;
    let user_id = user.email().to_string();

    let answers = load_answers(&state, &user_id).await?;
    let plan = services::fetch_or_generate(
        state.plans.as_ref(),
        state.ai.as_ref(),
        &user_id,
        &answers,
        q.format,
    )
    .await?;
    Ok(Json(plan))
}

#[instrument(skip(state, user))]
pub async fn regenerate_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    Query(q): Query<PlanQuery>,
) -> AppResult<Json<WorkoutPlan>> {
    user.ensure_owner(&user_id)?;
    let user_id = user.email().to_string();

    let answers = load_answers(&state, &user_id).await?;
    let plan = services::regenerate(
        state.plans.as_ref(),
        state.ai.as_ref(),
        &user_id,
        &answers,
        q.format,
    )
    .await?;
    info!(%user_id, "workout plan regenerated");
    Ok(Json(plan))
}
