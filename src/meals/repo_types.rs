use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::FoodEntry;

#[derive(Debug, Clone, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: String,
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodRow {
    pub id: Uuid,
    pub name: String,
    pub servings: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub serving_size: Option<String>,
    pub added_at: OffsetDateTime,
}

impl From<FoodRow> for FoodEntry {
    fn from(r: FoodRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            servings: r.servings,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
            total_calories: r.total_calories,
            total_protein: r.total_protein,
            total_carbs: r.total_carbs,
            total_fat: r.total_fat,
            serving_size: r.serving_size,
            added_at: r.added_at,
        }
    }
}

/// Entry about to be inserted; totals already scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodEntry {
    pub name: String,
    pub servings: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub serving_size: Option<String>,
}
