use std::sync::Arc;

use tracing::{error, info, warn};

use super::{
    plan::{build_prompt, fallback_plan, parse_schedule, parse_weekly, PlanInputs, PlanStyle, WorkoutPlan},
    store::PlanStore,
};
use crate::{
    ai::TextModel,
    error::{AppError, AppResult},
    survey::dto::SurveyAnswers,
};

/// Asks the model for a plan. Weekly requests degrade to the fallback week;
/// schedule requests surface the failure.
pub async fn generate(
    ai: &dyn TextModel,
    answers: &SurveyAnswers,
    style: PlanStyle,
) -> AppResult<WorkoutPlan> {
    let prompt = build_prompt(&PlanInputs::from_answers(answers), style);
    let raw = ai.generate_json(&prompt).await;

    match style {
        PlanStyle::Schedule => {
            let raw = raw.map_err(|e| {
                error!(error = %e, "plan generation failed");
                AppError::Upstream(format!("Failed to generate workout plan: {e}"))
            })?;
            let plan = parse_schedule(&raw).map_err(|e| {
                warn!(error = %e, "model returned an unusable schedule");
                AppError::Upstream(e.to_string())
            })?;
            Ok(WorkoutPlan::Schedule(plan))
        }
        PlanStyle::Weekly => {
            let parsed = raw.and_then(|r| parse_weekly(&r));
            match parsed {
                Ok(plan) => Ok(WorkoutPlan::Weekly(plan)),
                Err(e) => {
                    warn!(error = %e, "using fallback workout plan");
                    Ok(WorkoutPlan::Weekly(fallback_plan()))
                }
            }
        }
    }
}

/// The cached plan, if it was generated from the workout answers in `answers`.
/// A plan built from other answers (e.g. by a generation that finished after
/// a survey edit) counts as a miss.
pub async fn current_plan(
    plans: &dyn PlanStore,
    user_id: &str,
    answers: &SurveyAnswers,
) -> AppResult<Option<WorkoutPlan>> {
    let Some(cached) = plans.get(user_id).await? else {
        return Ok(None);
    };
    if cached.profile != answers.workout_profile() {
        info!(%user_id, "cached workout plan predates survey changes");
        return Ok(None);
    }
    Ok(Some(cached.plan))
}

/// Returns the cached plan, generating and caching one on a miss.
pub async fn fetch_or_generate(
    plans: &dyn PlanStore,
    ai: &dyn TextModel,
    user_id: &str,
    answers: &SurveyAnswers,
    style: PlanStyle,
) -> AppResult<WorkoutPlan> {
    if let Some(plan) = current_plan(plans, user_id, answers).await? {
        return Ok(plan);
    }
    let plan = generate(ai, answers, style).await?;
    plans.put(user_id, &answers.workout_profile(), &plan).await?;
    info!(%user_id, ?style, "workout plan cached");
    Ok(plan)
}

pub async fn regenerate(
    plans: &dyn PlanStore,
    ai: &dyn TextModel,
    user_id: &str,
    answers: &SurveyAnswers,
    style: PlanStyle,
) -> AppResult<WorkoutPlan> {
    plans.delete(user_id).await?;
    fetch_or_generate(plans, ai, user_id, answers, style).await
}

pub async fn invalidate(plans: &dyn PlanStore, user_id: &str) -> AppResult<()> {
    if plans.delete(user_id).await? {
        info!(%user_id, "cached workout plan invalidated");
    }
    Ok(())
}

/// Generates and caches a plan off the request path.
pub fn spawn_generation(
    plans: Arc<dyn PlanStore>,
    ai: Arc<dyn TextModel>,
    user_id: String,
    answers: SurveyAnswers,
) {
    tokio::spawn(async move {
        if let Err(e) =
            fetch_or_generate(plans.as_ref(), ai.as_ref(), &user_id, &answers, PlanStyle::Weekly)
                .await
        {
            error!(error = %e, %user_id, "background plan generation failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ai::fake::ScriptedModel, survey::dto::sample_answers, workout::store::MemoryPlanStore,
    };

    const WEEK: &str = r#"{"Monday":"Squats","Tuesday":"Run","Wednesday":"Rest",
        "Thursday":"Bench","Friday":"Rest","Saturday":"Bike","Sunday":"Rest"}"#;

    #[tokio::test]
    async fn cached_plan_is_served_without_calling_model() {
        let store = MemoryPlanStore::default();
        let ai = ScriptedModel::new(vec![Ok(WEEK.into())]);
        let answers = sample_answers();

        let first = fetch_or_generate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();
        let second = fetch_or_generate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(ai.calls(), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_regeneration() {
        let store = MemoryPlanStore::default();
        let ai = ScriptedModel::new(vec![Ok(WEEK.into()), Ok(WEEK.into())]);
        let answers = sample_answers();

        fetch_or_generate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();
        invalidate(&store, "a@x.edu").await.unwrap();
        fetch_or_generate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();
        assert_eq!(ai.calls(), 2);
    }

    #[tokio::test]
    async fn weekly_falls_back_and_persists() {
        let store = MemoryPlanStore::default();
        let ai = ScriptedModel::new(vec![Ok("I cannot help with that".into())]);
        let plan = fetch_or_generate(&store, &ai, "a@x.edu", &sample_answers(), PlanStyle::Weekly)
            .await
            .unwrap();
        assert_eq!(plan, WorkoutPlan::Weekly(fallback_plan()));
        let cached = store.get("a@x.edu").await.unwrap().unwrap();
        assert_eq!(cached.plan, plan);
        assert_eq!(cached.profile, sample_answers().workout_profile());
    }

    #[tokio::test]
    async fn schedule_failure_is_upstream_and_not_cached() {
        let store = MemoryPlanStore::default();
        let ai = ScriptedModel::new(vec![Ok(r#"{"plan": []}"#.into())]);
        let err = fetch_or_generate(&store, &ai, "a@x.edu", &sample_answers(), PlanStyle::Schedule)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(store.get("a@x.edu").await.unwrap(), None);
    }

    #[tokio::test]
    async fn regenerate_replaces_cached_plan() {
        let store = MemoryPlanStore::default();
        let answers = sample_answers();
        store
            .put("a@x.edu", &answers.workout_profile(), &WorkoutPlan::Weekly(fallback_plan()))
            .await
            .unwrap();
        let ai = ScriptedModel::new(vec![Ok(WEEK.into())]);
        let plan = regenerate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();
        assert_ne!(plan, WorkoutPlan::Weekly(fallback_plan()));
        assert_eq!(ai.calls(), 1);
    }

    const OLD_WEEK: &str = r#"{"Monday":"OLD 3x lifting","Tuesday":"Rest","Wednesday":"Rest",
        "Thursday":"Rest","Friday":"Rest","Saturday":"Rest","Sunday":"Rest"}"#;

    fn edited(mut answers: SurveyAnswers) -> SurveyAnswers {
        answers.lifting_frequency = Some("5".into());
        answers
    }

    #[tokio::test]
    async fn plan_finished_after_survey_edit_is_not_served() {
        let store: Arc<dyn PlanStore> = Arc::new(MemoryPlanStore::default());
        let before = sample_answers();
        let old_ai: Arc<dyn TextModel> = Arc::new(ScriptedModel::new(vec![Ok(OLD_WEEK.into())]));

        // background generation from the submitted answers, then a PATCH
        spawn_generation(store.clone(), old_ai, "a@x.edu".into(), before.clone());
        invalidate(store.as_ref(), "a@x.edu").await.unwrap();
        for _ in 0..10 {
            if store.get("a@x.edu").await.unwrap().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let stale = store.get("a@x.edu").await.unwrap().unwrap();
        assert_eq!(stale.profile, before.workout_profile());

        let after = edited(before);
        assert_eq!(current_plan(store.as_ref(), "a@x.edu", &after).await.unwrap(), None);

        let ai = ScriptedModel::new(vec![Ok(WEEK.into())]);
        let plan = fetch_or_generate(store.as_ref(), &ai, "a@x.edu", &after, PlanStyle::Weekly)
            .await
            .unwrap();
        assert_eq!(ai.calls(), 1);
        assert_ne!(plan, stale.plan);
        assert_eq!(
            store.get("a@x.edu").await.unwrap().unwrap().profile,
            after.workout_profile()
        );
    }

    #[tokio::test]
    async fn non_workout_edits_keep_the_cached_plan() {
        let store = MemoryPlanStore::default();
        let ai = ScriptedModel::new(vec![Ok(WEEK.into())]);
        let answers = sample_answers();
        let plan = fetch_or_generate(&store, &ai, "a@x.edu", &answers, PlanStyle::Weekly)
            .await
            .unwrap();

        let mut heavier = answers;
        heavier.weight = 170.0;
        assert_eq!(current_plan(&store, "a@x.edu", &heavier).await.unwrap(), Some(plan));
    }
}
