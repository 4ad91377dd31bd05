use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealGroup {
    pub id: Uuid,
    pub name: String,
    pub creator: String,
    pub members: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MealGroup {
    pub fn has_member(&self, email: &str) -> bool {
        self.members.iter().any(|m| m.eq_ignore_ascii_case(email))
    }
}

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.creator, g.created_at,
           COALESCE(array_agg(m.member_email ORDER BY m.member_email)
                    FILTER (WHERE m.member_email IS NOT NULL), '{}') AS members
      FROM meal_groups g
      LEFT JOIN meal_group_members m ON m.group_id = g.id
"#;

pub async fn friends_of(db: &PgPool, email: &str) -> anyhow::Result<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT friend_email FROM friendships WHERE user_email = $1 ORDER BY friend_email",
    )
    .bind(email)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn are_friends(db: &PgPool, a: &str, b: &str) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM friendships WHERE user_email = $1 AND friend_email = $2)",
    )
    .bind(a)
    .bind(b)
    .fetch_one(db)
    .await?;
    Ok(found)
}

/// Records a pending request; `false` when one from `from` to `to` already exists.
pub async fn insert_request(db: &PgPool, from: &str, to: &str) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "INSERT INTO friend_requests (from_email, to_email) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(from)
    .bind(to)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Consumes the request from `requester` to `user` and links both ways.
/// `false` when there was no such request.
pub async fn accept_request(db: &PgPool, user: &str, requester: &str) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query("DELETE FROM friend_requests WHERE from_email = $1 AND to_email = $2")
        .bind(requester)
        .bind(user)
        .execute(&mut *tx)
        .await?;
    if removed.rows_affected() == 0 {
        return Ok(false);
    }
    sqlx::query("DELETE FROM friend_requests WHERE from_email = $1 AND to_email = $2")
        .bind(user)
        .bind(requester)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO friendships (user_email, friend_email)
        VALUES ($1, $2), ($2, $1)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user)
    .bind(requester)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(true)
}

/// Pending requests as `(received from, sent to)`.
pub async fn pending_requests(db: &PgPool, email: &str) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let received: Vec<String> = sqlx::query_scalar(
        "SELECT from_email FROM friend_requests WHERE to_email = $1 ORDER BY created_at",
    )
    .bind(email)
    .fetch_all(db)
    .await?;
    let sent: Vec<String> = sqlx::query_scalar(
        "SELECT to_email FROM friend_requests WHERE from_email = $1 ORDER BY created_at",
    )
    .bind(email)
    .fetch_all(db)
    .await?;
    Ok((received, sent))
}

pub async fn find_group(db: &PgPool, id: Uuid) -> anyhow::Result<Option<MealGroup>> {
    let sql = format!("{GROUP_SELECT} WHERE g.id = $1 GROUP BY g.id");
    let group = sqlx::query_as::<_, MealGroup>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(group)
}

pub async fn groups_for(db: &PgPool, email: &str) -> anyhow::Result<Vec<MealGroup>> {
    let sql = format!(
        "{GROUP_SELECT} WHERE g.id IN (SELECT group_id FROM meal_group_members WHERE member_email = $1) \
         GROUP BY g.id ORDER BY g.created_at"
    );
    let groups = sqlx::query_as::<_, MealGroup>(&sql)
        .bind(email)
        .fetch_all(db)
        .await?;
    Ok(groups)
}

async fn insert_members(
    conn: &mut sqlx::PgConnection,
    group_id: Uuid,
    members: &[String],
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meal_group_members (group_id, member_email)
        SELECT $1, unnest($2::text[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(members)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn create_group(
    db: &PgPool,
    name: &str,
    creator: &str,
    members: &[String],
) -> anyhow::Result<MealGroup> {
    let mut tx = db.begin().await?;
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO meal_groups (name, creator) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(creator)
    .fetch_one(&mut *tx)
    .await?;
    insert_members(&mut tx, id, members).await?;
    tx.commit().await?;

    find_group(db, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("group {id} vanished after insert"))
}

pub async fn add_members(
    db: &PgPool,
    group_id: Uuid,
    members: &[String],
) -> anyhow::Result<Option<MealGroup>> {
    let mut conn = db.acquire().await?;
    insert_members(&mut conn, group_id, members).await?;
    drop(conn);
    find_group(db, group_id).await
}
