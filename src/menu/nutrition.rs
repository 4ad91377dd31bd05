use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;

/// Nutrition label exactly as the ingestion job stored it ("12g", "N/A").
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLabel {
    #[serde(skip)]
    pub item_name: String,
    pub serving_size: String,
    pub calories: String,
    pub protein: String,
    pub total_carbohydrate: String,
    pub total_fat: String,
    pub saturated_fat: String,
    pub cholesterol: String,
    pub sodium: String,
    pub dietary_fiber: String,
    pub sugar: String,
    pub added_sugar: String,
    pub calcium: String,
    pub iron: String,
    pub ingredients: String,
}

/// Numeric view of a label; every amount defaults to 0 when unreadable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionFact {
    pub name: String,
    pub serving_size: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub cholesterol: f64,
    pub sodium: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub added_sugar: f64,
}

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.]").unwrap();
}

/// Leading number of a display amount such as `"12.5g"`.
pub fn parse_amount(raw: &str) -> f64 {
    NON_NUMERIC
        .replace_all(raw, "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

impl From<&NutritionLabel> for NutritionFact {
    fn from(l: &NutritionLabel) -> Self {
        Self {
            name: l.item_name.clone(),
            serving_size: l.serving_size.clone(),
            calories: parse_amount(&l.calories),
            protein: parse_amount(&l.protein),
            carbs: parse_amount(&l.total_carbohydrate),
            fat: parse_amount(&l.total_fat),
            saturated_fat: parse_amount(&l.saturated_fat),
            cholesterol: parse_amount(&l.cholesterol),
            sodium: parse_amount(&l.sodium),
            fiber: parse_amount(&l.dietary_fiber),
            sugar: parse_amount(&l.sugar),
            added_sugar: parse_amount(&l.added_sugar),
        }
    }
}

/// Row shape of the food search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSearchResult {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving_size: String,
}

impl From<NutritionFact> for FoodSearchResult {
    fn from(f: NutritionFact) -> Self {
        Self {
            name: f.name,
            calories: f.calories,
            protein: f.protein,
            carbs: f.carbs,
            fat: f.fat,
            serving_size: f.serving_size,
        }
    }
}

#[cfg(test)]
pub(crate) fn label(name: &str, calories: &str, protein: &str) -> NutritionLabel {
    NutritionLabel {
        item_name: name.into(),
        serving_size: "1 cup".into(),
        calories: calories.into(),
        protein: protein.into(),
        total_carbohydrate: "30g".into(),
        total_fat: "N/A".into(),
        saturated_fat: "1.5g".into(),
        cholesterol: "10mg".into(),
        sodium: "480mg".into(),
        dietary_fiber: "3g".into(),
        sugar: "<1g".into(),
        added_sugar: "0g".into(),
        calcium: "4%".into(),
        iron: "8%".into(),
        ingredients: "Eggs, cheese".into(),
    }
}
