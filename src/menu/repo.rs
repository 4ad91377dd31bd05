use sqlx::{FromRow, PgPool};
use time::Date;

use super::{
    nutrition::{NutritionFact, NutritionLabel},
    period::MealPeriod,
};

#[derive(Debug, Clone, FromRow)]
pub struct MenuItem {
    pub dining_court: String,
    pub station: String,
    pub item_name: String,
    pub dietary_tags: Vec<String>,
    pub nutrition_link: Option<String>,
}

const SEARCH_LIMIT: i64 = 20;

const LABEL_COLUMNS: &str = "item_name, serving_size, calories, protein, total_carbohydrate, \
     total_fat, saturated_fat, cholesterol, sodium, dietary_fiber, sugar, added_sugar, \
     calcium, iron, ingredients";

pub async fn items_for_slot(
    db: &PgPool,
    date: Date,
    period: MealPeriod,
) -> anyhow::Result<Vec<MenuItem>> {
    let rows = sqlx::query_as::<_, MenuItem>(
        r#"
        SELECT dining_court, station, item_name, dietary_tags, nutrition_link
          FROM menu_items
         WHERE date = $1 AND lower(meal_period) = lower($2)
         ORDER BY dining_court, station, item_name
        "#,
    )
    .bind(date)
    .bind(period.as_str())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn items_for_court(
    db: &PgPool,
    dining_court: &str,
    date: Date,
    period: MealPeriod,
) -> anyhow::Result<Vec<MenuItem>> {
    let rows = sqlx::query_as::<_, MenuItem>(
        r#"
        SELECT dining_court, station, item_name, dietary_tags, nutrition_link
          FROM menu_items
         WHERE lower(dining_court) = lower($1)
           AND date = $2
           AND lower(meal_period) = lower($3)
         ORDER BY station, item_name
        "#,
    )
    .bind(dining_court)
    .bind(date)
    .bind(period.as_str())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Dining courts serving an item, optionally restricted to one day.
pub async fn locations_serving(
    db: &PgPool,
    item_name: &str,
    date: Option<Date>,
) -> anyhow::Result<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT dining_court
          FROM menu_items
         WHERE lower(item_name) = lower($1)
           AND ($2::date IS NULL OR date = $2)
         ORDER BY dining_court
        "#,
    )
    .bind(item_name)
    .bind(date)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn labels_for(db: &PgPool, names: &[String]) -> anyhow::Result<Vec<NutritionLabel>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT {LABEL_COLUMNS} FROM nutrition_facts WHERE item_name = ANY($1)");
    let rows = sqlx::query_as::<_, NutritionLabel>(&sql)
        .bind(names)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_nutrition(db: &PgPool, item_name: &str) -> anyhow::Result<Option<NutritionFact>> {
    let sql = format!(
        "SELECT {LABEL_COLUMNS} FROM nutrition_facts WHERE lower(item_name) = lower($1) LIMIT 1"
    );
    let row = sqlx::query_as::<_, NutritionLabel>(&sql)
        .bind(item_name)
        .fetch_optional(db)
        .await?;
    Ok(row.as_ref().map(NutritionFact::from))
}

/// `ILIKE` patterns for a search: the whole term first, then every word.
pub fn search_patterns(term: &str) -> (String, Vec<String>) {
    let escaped = crate::auth::repo::escape_like(term.trim());
    let words = term
        .split_whitespace()
        .map(|w| format!("%{}%", crate::auth::repo::escape_like(w)))
        .collect();
    (format!("%{escaped}%"), words)
}

pub async fn search_foods(db: &PgPool, term: &str) -> anyhow::Result<Vec<NutritionFact>> {
    let (whole, words) = search_patterns(term);

    let sql = format!(
        "SELECT {LABEL_COLUMNS} FROM nutrition_facts WHERE item_name ILIKE $1 \
         ORDER BY item_name LIMIT $2"
    );
    let mut rows = sqlx::query_as::<_, NutritionLabel>(&sql)
        .bind(&whole)
        .bind(SEARCH_LIMIT)
        .fetch_all(db)
        .await?;

    if rows.is_empty() && words.len() > 1 {
        let sql = format!(
            "SELECT {LABEL_COLUMNS} FROM nutrition_facts WHERE item_name ILIKE ALL($1) \
             ORDER BY item_name LIMIT $2"
        );
        rows = sqlx::query_as::<_, NutritionLabel>(&sql)
            .bind(&words)
            .bind(SEARCH_LIMIT)
            .fetch_all(db)
            .await?;
    }

    Ok(rows.iter().map(NutritionFact::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_cover_term_and_words() {
        let (whole, words) = search_patterns(" grilled  chicken ");
        assert_eq!(whole, "%grilled  chicken%");
        assert_eq!(words, vec!["%grilled%", "%chicken%"]);
    }

    #[test]
    fn wildcards_in_term_are_literal() {
        let (whole, _) = search_patterns("100%");
        assert_eq!(whole, "%100\\%%");
    }
}
