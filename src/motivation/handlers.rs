use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::services::{build_prompt, Remaining};
use crate::{
    auth::AuthUser,
    clock::local_now,
    dietary::handlers::macros_for,
    error::{AppError, AppResult},
    meals::handlers::todays_log,
    state::AppState,
    survey,
    workout::{plan::WorkoutPlan, services as plans},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/motivation/generate", post(generate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotivationRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotivationResponse {
    pub message: String,
    #[serde(flatten)]
    pub remaining: Remaining,
    pub workout: Option<String>,
}

/// The cached plan, if it still matches the user's survey.
async fn todays_plan(state: &AppState, email: &str) -> AppResult<Option<WorkoutPlan>> {
    let Some(answers) = survey::repo::find_answers(&state.db, email).await? else {
        return Ok(None);
    };
    plans::current_plan(state.plans.as_ref(), email, &answers).await
}

#[instrument(skip(state, user, payload))]
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MotivationRequest>,
) -> AppResult<Json<MotivationResponse>> {
    user.ensure_owner(&payload.user_id)?;
    let email = user.email();

    let (targets, log, plan) = tokio::try_join!(
        macros_for(&state, email),
        todays_log(&state, email),
        todays_plan(&state, email),
    )?;

    let remaining = Remaining::between(&targets, &log.daily_totals);
    let weekday = local_now(state.config.utc_offset_hours).weekday();
    let workout = plan.and_then(|p| p.for_weekday(weekday));

    let message = state
        .ai
        .generate_text(&build_prompt(remaining, workout.as_deref()))
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %email, "motivation generation failed");
            AppError::Upstream("failed to generate motivation message".into())
        })?;

    info!(user_id = %email, calories_left = remaining.calories_left, "motivation generated");
    Ok(Json(MotivationResponse {
        message: message.trim().to_string(),
        remaining,
        workout,
    }))
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
    use uuid::Uuid;

    #[tokio::test]
    async fn generating_for_another_user_is_forbidden() {
        let state = AppState::fake();
        let keys = crate::auth::jwt::JwtKeys::from_ref(&state);
        let token = keys.sign_access(Uuid::new_v4(), "me@x.edu").unwrap();
        let res = routes()
            .with_state(state)
            .oneshot(
                Request::post("/motivation/generate")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"userId":"you@x.edu"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn response_flattens_remaining() {
        let body = MotivationResponse {
            message: "Go!".into(),
            remaining: Remaining {
                calories_left: 300,
                protein_left: 20,
            },
            workout: None,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["caloriesLeft"], 300);
        assert_eq!(v["proteinLeft"], 20);
        assert!(v["workout"].is_null());
    }
}
