use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use super::plan::WorkoutPlan;
use crate::survey::dto::WorkoutProfile;

/// A stored plan with the workout answers it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPlan {
    pub profile: WorkoutProfile,
    pub plan: WorkoutPlan,
}

/// Per-user workout plan cache.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<CachedPlan>>;
    async fn put(
        &self,
        user_id: &str,
        profile: &WorkoutProfile,
        plan: &WorkoutPlan,
    ) -> anyhow::Result<()>;
    /// Returns whether a plan was removed.
    async fn delete(&self, user_id: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<CachedPlan>> {
        let row: Option<(Json<WorkoutProfile>, Json<WorkoutPlan>)> = sqlx::query_as(
            "SELECT profile, plan FROM workout_plans WHERE user_id = $1 AND profile IS NOT NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(profile, plan)| CachedPlan {
            profile: profile.0,
            plan: plan.0,
        }))
    }

    async fn put(
        &self,
        user_id: &str,
        profile: &WorkoutProfile,
        plan: &WorkoutPlan,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workout_plans (user_id, profile, plan)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET profile = EXCLUDED.profile, plan = EXCLUDED.plan, created_at = now()
            "#,
        )
        .bind(user_id)
        .bind(Json(profile))
        .bind(Json(plan))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM workout_plans WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: std::sync::Mutex<std::collections::HashMap<String, CachedPlan>>,
}

#[cfg(test)]
#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<CachedPlan>> {
        Ok(self.plans.lock().unwrap().get(user_id).cloned())
    }

    async fn put(
        &self,
        user_id: &str,
        profile: &WorkoutProfile,
        plan: &WorkoutPlan,
    ) -> anyhow::Result<()> {
        self.plans.lock().unwrap().insert(
            user_id.to_string(),
            CachedPlan {
                profile: profile.clone(),
                plan: plan.clone(),
            },
        );
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> anyhow::Result<bool> {
        Ok(self.plans.lock().unwrap().remove(user_id).is_some())
    }
}
