use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        apply_field, PatchSurveyRequest, SubmitSurveyRequest, SubmitSurveyResponse, SurveyAnswers,
        SurveyField, SurveyResponse, SurveyStatus,
    },
    repo,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    workout::services as plans,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/survey", post(submit_survey))
        .route("/survey/status/:user_id", get(survey_status))
        .route("/survey/:user_id", get(get_survey).patch(patch_survey))
}

/// Whether the stored plan no longer matches the submitted answers.
pub(crate) fn plan_is_stale(previous: Option<&SurveyAnswers>, next: &SurveyAnswers) -> bool {
    match previous {
        Some(prev) => prev.workout_profile() != next.workout_profile(),
        None => false,
    }
}

#[instrument(skip(state, user, payload))]
pub async fn submit_survey(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitSurveyRequest>,
) -> AppResult<Json<SubmitSurveyResponse>> {
    let (Some(user_id), Some(raw)) = (payload.user_id, payload.answers) else {
        return Err(AppError::validation("userId and answers are required"));
    };
    let answers = SurveyAnswers::from_value(raw)?;
    user.ensure_owner(&user_id)?;
    let user_id = user.email().to_string();

    let previous = repo::upsert(&state.db, &user_id, &answers).await?;
    if plan_is_stale(previous.as_ref(), &answers) {
        plans::invalidate(state.plans.as_ref(), &user_id).await?;
    }

    if answers.wants_plan()
        && plans::current_plan(state.plans.as_ref(), &user_id, &answers)
            .await?
            .is_none()
    {
        info!(%user_id, "starting background workout plan generation");
        plans::spawn_generation(state.plans.clone(), state.ai.clone(), user_id.clone(), answers);
    }

    info!(%user_id, updated = previous.is_some(), "survey saved");
    Ok(Json(SubmitSurveyResponse {
        success: true,
        message: "Survey saved successfully".into(),
    }))
}

#[instrument(skip(state, user))]
pub async fn survey_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<SurveyStatus>> {
    user.ensure_owner(&user_id)?;
    let has_taken_survey = repo::exists(&state.db, user.email()).await?;
    Ok(Json(SurveyStatus { has_taken_survey }))
}

#[instrument(skip(state, user))]
pub async fn get_survey(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<SurveyResponse>> {
    user.ensure_owner(&user_id)?;
    let survey = repo::find(&state.db, user.email())
        .await?
        .ok_or_else(|| AppError::not_found("Survey not found"))?;
    Ok(Json(SurveyResponse {
        user_id: survey.user_id,
        answers: survey.answers.0,
        completed_at: survey.completed_at,
        updated_at: survey.updated_at,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn patch_survey(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    Json(payload): Json<PatchSurveyRequest>,
) -> AppResult<Json<SubmitSurveyResponse>> {
    user.ensure_owner(&user_id)?;
    let user_id = user.email().to_string();

    let field = SurveyField::parse(&payload.field).ok_or_else(|| {
        warn!(field = %payload.field, "unknown survey field");
        AppError::validation(format!("Unknown survey field: {}", payload.field))
    })?;
    let current = repo::find_answers(&state.db, &user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Survey not found"))?;

    let updated = apply_field(&current, field, payload.value)?;
    repo::update_answers(&state.db, &user_id, &updated).await?;

    if field.affects_workout_plan() {
        plans::invalidate(state.plans.as_ref(), &user_id).await?;
    }

    info!(%user_id, field = field.key(), "survey field updated");
    Ok(Json(SubmitSurveyResponse {
        success: true,
        message: format!("{} updated", field.key()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::dto::{sample_answers, YesNo};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[test]
    fn first_submission_never_invalidates() {
        assert!(!plan_is_stale(None, &sample_answers()));
    }

    #[test]
    fn workout_changes_make_plan_stale() {
        let prev = sample_answers();
        let mut next = prev.clone();
        next.weight = 180.0;
        assert!(!plan_is_stale(Some(&prev), &next));
        next.workout = YesNo::No;
        assert!(plan_is_stale(Some(&prev), &next));
    }

    #[tokio::test]
    async fn submit_without_answers_is_rejected() {
        use axum::extract::FromRef;
        let state = AppState::fake();
        let keys = crate::auth::jwt::JwtKeys::from_ref(&state);
        let token = keys.sign_access(uuid::Uuid::new_v4(), "me@x.edu").unwrap();

        let res = routes()
            .with_state(state)
            .oneshot(
                Request::post("/survey")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"userId":"me@x.edu"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn survey_routes_require_auth() {
        let res = routes()
            .with_state(AppState::fake())
            .oneshot(
                Request::get("/survey/status/me@x.edu")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
