use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{
    nutrition::NutritionLabel,
    period::MealPeriod,
    repo::{self, MenuItem},
};
use crate::{
    auth::AuthUser,
    clock::{format_date, parse_date},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/menu", get(get_menu))
}

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub dining_court: Option<String>,
    pub date: Option<String>,
    pub meal: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub name: String,
    pub dietary_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionLabel>,
}

#[derive(Debug, Serialize)]
pub struct StationMenu {
    pub station: String,
    pub items: Vec<MenuEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuResponse {
    pub dining_court: String,
    pub date: String,
    pub meal: MealPeriod,
    pub stations: Vec<StationMenu>,
}

/// Groups items by station in first-seen order, attaching labels by item name.
pub fn group_by_station(
    items: Vec<MenuItem>,
    labels: HashMap<String, NutritionLabel>,
) -> Vec<StationMenu> {
    let mut stations: Vec<StationMenu> = Vec::new();
    for item in items {
        let nutrition = labels.get(&item.item_name).cloned();
        let entry = MenuEntry {
            name: item.item_name,
            dietary_tags: item.dietary_tags,
            nutrition_link: item.nutrition_link,
            nutrition,
        };
        match stations.iter_mut().find(|s| s.station == item.station) {
            Some(s) => s.items.push(entry),
            None => stations.push(StationMenu {
                station: item.station,
                items: vec![entry],
            }),
        }
    }
    stations
}

#[instrument(skip(state, _user))]
pub async fn get_menu(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<MenuQuery>,
) -> AppResult<Json<MenuResponse>> {
    let (Some(court), Some(date), Some(meal)) = (q.dining_court, q.date, q.meal) else {
        return Err(AppError::validation("dining_court, date and meal are required"));
    };
    let date = parse_date(&date).ok_or_else(|| AppError::validation("date must be YYYY-MM-DD"))?;
    let meal = MealPeriod::parse(&meal)
        .ok_or_else(|| AppError::validation("meal must be Breakfast, Lunch or Dinner"))?;

    let items = repo::items_for_court(&state.db, &court, date, meal).await?;
    let mut names: Vec<String> = items.iter().map(|i| i.item_name.clone()).collect();
    names.sort();
    names.dedup();
    let labels = repo::labels_for(&state.db, &names)
        .await?
        .into_iter()
        .map(|l| (l.item_name.clone(), l))
        .collect();

    Ok(Json(MenuResponse {
        dining_court: court,
        date: format_date(date),
        meal,
        stations: group_by_station(items, labels),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::nutrition::label;

    fn item(station: &str, name: &str) -> MenuItem {
        MenuItem {
            dining_court: "Wiley".into(),
            station: station.into(),
            item_name: name.into(),
            dietary_tags: vec!["Vegetarian".into()],
            nutrition_link: None,
        }
    }

    #[test]
    fn items_grouped_under_their_station() {
        let items = vec![
            item("Grill", "Bacon"),
            item("Bakery", "Muffin"),
            item("Grill", "Western Quiche"),
        ];
        let labels = HashMap::from([(
            "Western Quiche".to_string(),
            label("Western Quiche", "310", "14g"),
        )]);
        let stations = group_by_station(items, labels);
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].station, "Grill");
        assert_eq!(stations[0].items.len(), 2);
        assert!(stations[0].items[0].nutrition.is_none());
        assert_eq!(
            stations[0].items[1].nutrition.as_ref().map(|n| n.calories.as_str()),
            Some("310")
        );
        assert_eq!(stations[1].items[0].name, "Muffin");
    }
}
