use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserSummary};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, google_id, name, picture, created_at, last_login";

impl User {
    /// Find a user by (lowercase) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn username_taken(db: &PgPool, username: &str) -> anyhow::Result<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(db)
                .await?;
        Ok(taken)
    }

    /// Create a user. `password_hash` is None for accounts created through Google.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, google_id, name, picture)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.google_id)
        .bind(new.name)
        .bind(new.picture)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Records the Google subject on an existing account and fills in a
    /// missing name or picture.
    pub async fn link_google(
        db: &PgPool,
        id: Uuid,
        google_id: &str,
        name: Option<&str>,
        picture: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET google_id = $2,
                   name = COALESCE(name, $3),
                   picture = COALESCE(picture, $4),
                   last_login = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(google_id)
        .bind(name)
        .bind(picture)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn touch_login(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: Option<&str>,
        name: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   name = COALESCE($3, name)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Users whose email or username contains `term`, excluding `exclude_email`.
    pub async fn search(
        db: &PgPool,
        term: &str,
        exclude_email: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<UserSummary>> {
        let pattern = format!("%{}%", escape_like(term));
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT email, username, name, picture
              FROM users
             WHERE (email ILIKE $1 OR username ILIKE $1)
               AND email <> $2
             ORDER BY username
             LIMIT $3
            "#,
        )
        .bind(pattern)
        .bind(exclude_email)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn summaries(db: &PgPool, emails: &[String]) -> anyhow::Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT email, username, name, picture
              FROM users
             WHERE email = ANY($1)
             ORDER BY username
            "#,
        )
        .bind(emails)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
