use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::calculator::{targets_for, MacroTargets};
use crate::{
    auth::AuthUser,
    error::AppResult,
    menu::{nutrition::FoodSearchResult, repo as menu_repo},
    state::AppState,
    survey,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dietary/macros/:user_id", get(get_macros))
        .route("/dietary/foods", get(search_foods))
}

pub(crate) async fn macros_for(state: &AppState, user_id: &str) -> AppResult<MacroTargets> {
    let answers = survey::repo::find_answers(&state.db, user_id).await?;
    if answers.is_none() {
        debug!(%user_id, "no survey; default macro targets");
    }
    Ok(targets_for(answers.as_ref()))
}

#[instrument(skip(state, user))]
pub async fn get_macros(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<MacroTargets>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(macros_for(&state, user.email()).await?))
}

#[derive(Debug, Deserialize)]
pub struct FoodSearchQuery {
    #[serde(default)]
    pub search: String,
}

#[instrument(skip(state, _user))]
pub async fn search_foods(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<FoodSearchQuery>,
) -> AppResult<Json<Vec<FoodSearchResult>>> {
    let term = q.search.trim();
    if term.chars().count() < 2 {
        return Ok(Json(Vec::new()));
    }
    let foods = menu_repo::search_foods(&state.db, term).await?;
    Ok(Json(foods.into_iter().map(FoodSearchResult::from).collect()))
}
