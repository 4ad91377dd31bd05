use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::repo::{self, AddOutcome, Favorite, FavoriteNutrition, NewFavorite};
use crate::{
    auth::AuthUser,
    clock::local_now,
    error::{AppError, AppResult},
    menu::{nutrition::NutritionFact, repo as menu_repo},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/favorites/add", post(add_favorite))
        // GET takes a user id, DELETE a food name
        .route("/favorites/:key", get(list_favorites).delete(remove_favorite))
}

#[derive(Debug, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default)]
    pub nutrition: Option<FavoriteNutrition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub food_item: FoodItem,
}

impl From<NutritionFact> for FavoriteNutrition {
    fn from(f: NutritionFact) -> Self {
        Self {
            calories: f.calories,
            protein: f.protein,
            carbs: f.carbs,
            fat: f.fat,
            serving_size: Some(f.serving_size),
        }
    }
}

#[instrument(skip(state, user))]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Favorite>>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(repo::list(&state.db, user.email()).await?))
}

/// Stored nutrition wins over what the client sent.
async fn enrich(state: &AppState, item: FoodItem) -> AppResult<NewFavorite> {
    let today = local_now(state.config.utc_offset_hours).date();
    let (stored, current, historical) = tokio::try_join!(
        menu_repo::find_nutrition(&state.db, &item.name),
        menu_repo::locations_serving(&state.db, &item.name, Some(today)),
        menu_repo::locations_serving(&state.db, &item.name, None),
    )?;
    Ok(NewFavorite {
        nutrition: stored.map(FavoriteNutrition::from).or(item.nutrition),
        name: item.name,
        current_locations: current,
        historical_locations: historical,
    })
}

#[instrument(skip(state, user, payload))]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFavoriteRequest>,
) -> AppResult<Json<Vec<Favorite>>> {
    let mut item = payload.food_item;
    item.name = item.name.trim().to_string();
    if item.name.is_empty() {
        return Err(AppError::validation("Food item name is required"));
    }

    let favorite = enrich(&state, item).await?;
    match repo::add(&state.db, user.email(), &favorite).await? {
        AddOutcome::Added(list) => {
            info!(user_id = %user.email(), name = %favorite.name, "favorite added");
            Ok(Json(list))
        }
        AddOutcome::Rejected(reason) => {
            warn!(user_id = %user.email(), name = %favorite.name, %reason, "favorite rejected");
            Err(reason.into())
        }
    }
}

#[instrument(skip(state, user))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(food_name): Path<String>,
) -> AppResult<Json<Vec<Favorite>>> {
    Ok(Json(repo::remove(&state.db, user.email(), &food_name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::nutrition::label;

    #[test]
    fn stored_label_becomes_nested_nutrition() {
        let fact = NutritionFact::from(&label("Western Quiche", "310", "14g"));
        let n = FavoriteNutrition::from(fact);
        assert_eq!(n.calories, 310.0);
        assert_eq!(n.protein, 14.0);
        assert_eq!(n.serving_size.as_deref(), Some("1 cup"));
    }

    #[test]
    fn request_accepts_nested_nutrition() {
        let req: AddFavoriteRequest = serde_json::from_str(
            r#"{"foodItem":{"name":"Quiche","nutrition":{"calories":300,"servingSize":"1 slice"}}}"#,
        )
        .unwrap();
        assert_eq!(req.food_item.name, "Quiche");
        assert_eq!(
            req.food_item.nutrition.and_then(|n| n.serving_size).as_deref(),
            Some("1 slice")
        );
    }
}
