use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    dto::{DailyTotals, FoodEntry, MealLog},
    repo_types::{FoodRow, MealRow, NewFoodEntry},
};

/// Local day as `[midnight, 23:59:59.999]`.
pub type DayBounds = (OffsetDateTime, OffsetDateTime);

const FOOD_COLUMNS: &str = "id, name, servings, calories, protein, carbs, fat, total_calories, \
     total_protein, total_carbs, total_fat, serving_size, added_at";

async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: &str) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("meals:{user_id}"))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn find_today(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    (start, end): DayBounds,
) -> anyhow::Result<Option<MealRow>> {
    let row = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, user_id, date
          FROM meals
         WHERE user_id = $1 AND date BETWEEN $2 AND $3
         ORDER BY date
         LIMIT 1
         FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn find_or_create_today(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    bounds: DayBounds,
    now: OffsetDateTime,
) -> anyhow::Result<MealRow> {
    lock_user(tx, user_id).await?;
    if let Some(meal) = find_today(tx, user_id, bounds).await? {
        return Ok(meal);
    }
    let meal = sqlx::query_as::<_, MealRow>(
        "INSERT INTO meals (user_id, date) VALUES ($1, $2) RETURNING id, user_id, date",
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(meal)
}

async fn entries(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<Vec<FoodEntry>> {
    let sql = format!("SELECT {FOOD_COLUMNS} FROM meal_foods WHERE meal_id = $1 ORDER BY position");
    let rows = sqlx::query_as::<_, FoodRow>(&sql)
        .bind(meal_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows.into_iter().map(FoodEntry::from).collect())
}

/// Recomputes totals from the stored entries and writes them back.
async fn refresh_totals(
    tx: &mut Transaction<'_, Postgres>,
    meal: MealRow,
) -> anyhow::Result<MealLog> {
    let foods = entries(tx, meal.id).await?;
    let totals = DailyTotals::from_entries(&foods);
    sqlx::query(
        r#"
        UPDATE meals
           SET total_calories = $2, total_protein = $3, total_carbs = $4, total_fat = $5
         WHERE id = $1
        "#,
    )
    .bind(meal.id)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.carbs)
    .bind(totals.fat)
    .execute(&mut **tx)
    .await?;
    Ok(MealLog {
        id: meal.id,
        user_id: meal.user_id,
        date: meal.date,
        foods,
        daily_totals: totals,
    })
}

pub async fn today(
    db: &PgPool,
    user_id: &str,
    bounds: DayBounds,
    now: OffsetDateTime,
) -> anyhow::Result<MealLog> {
    let mut tx = db.begin().await?;
    let meal = find_or_create_today(&mut tx, user_id, bounds, now).await?;
    let foods = entries(&mut tx, meal.id).await?;
    tx.commit().await?;
    let daily_totals = DailyTotals::from_entries(&foods);
    Ok(MealLog {
        id: meal.id,
        user_id: meal.user_id,
        date: meal.date,
        foods,
        daily_totals,
    })
}

pub async fn add_food(
    db: &PgPool,
    user_id: &str,
    bounds: DayBounds,
    now: OffsetDateTime,
    entry: &NewFoodEntry,
) -> anyhow::Result<MealLog> {
    let mut tx = db.begin().await?;
    let meal = find_or_create_today(&mut tx, user_id, bounds, now).await?;
    sqlx::query(
        r#"
        INSERT INTO meal_foods (meal_id, name, servings, calories, protein, carbs, fat,
                                total_calories, total_protein, total_carbs, total_fat,
                                serving_size, added_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(meal.id)
    .bind(&entry.name)
    .bind(entry.servings)
    .bind(entry.calories)
    .bind(entry.protein)
    .bind(entry.carbs)
    .bind(entry.fat)
    .bind(entry.total_calories)
    .bind(entry.total_protein)
    .bind(entry.total_carbs)
    .bind(entry.total_fat)
    .bind(&entry.serving_size)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let log = refresh_totals(&mut tx, meal).await?;
    tx.commit().await?;
    Ok(log)
}

/// Removes an entry from today's log; `None` when it is not there.
pub async fn remove_food(
    db: &PgPool,
    user_id: &str,
    bounds: DayBounds,
    food_id: Uuid,
) -> anyhow::Result<Option<MealLog>> {
    let mut tx = db.begin().await?;
    lock_user(&mut tx, user_id).await?;
    let Some(meal) = find_today(&mut tx, user_id, bounds).await? else {
        return Ok(None);
    };
    let deleted = sqlx::query("DELETE FROM meal_foods WHERE id = $1 AND meal_id = $2")
        .bind(food_id)
        .bind(meal.id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Ok(None);
    }
    let log = refresh_totals(&mut tx, meal).await?;
    tx.commit().await?;
    Ok(Some(log))
}
