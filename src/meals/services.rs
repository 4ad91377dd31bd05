use super::{
    dto::{DailyTotals, FoodEntry, FoodInput},
    repo_types::NewFoodEntry,
};
use crate::error::AppError;

impl DailyTotals {
    /// Sum of entry totals in log order.
    pub fn from_entries(entries: &[FoodEntry]) -> Self {
        entries.iter().fold(Self::default(), |acc, e| Self {
            calories: acc.calories + e.total_calories,
            protein: acc.protein + e.total_protein,
            carbs: acc.carbs + e.total_carbs,
            fat: acc.fat + e.total_fat,
        })
    }
}

pub fn validate_food(food: &FoodInput, servings: f64) -> Result<(), AppError> {
    if food.name.trim().is_empty() {
        return Err(AppError::validation("Food name is required"));
    }
    if !servings.is_finite() || servings <= 0.0 {
        return Err(AppError::validation("Servings must be a positive number"));
    }
    for (field, v) in [
        ("calories", food.calories),
        ("protein", food.protein),
        ("carbs", food.carbs),
        ("fat", food.fat),
    ] {
        if !v.is_finite() || v < 0.0 {
            return Err(AppError::validation(format!(
                "{field} must be a non-negative number"
            )));
        }
    }
    Ok(())
}

/// Scales per-serving values by the serving count.
pub fn scale(food: &FoodInput, servings: f64) -> NewFoodEntry {
    NewFoodEntry {
        name: food.name.trim().to_string(),
        servings,
        calories: food.calories,
        protein: food.protein,
        carbs: food.carbs,
        fat: food.fat,
        total_calories: food.calories * servings,
        total_protein: food.protein * servings,
        total_carbs: food.carbs * servings,
        total_fat: food.fat * servings,
        serving_size: food.serving_size.clone(),
    }
}
