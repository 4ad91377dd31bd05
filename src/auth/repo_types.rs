use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String, // lowercase; the user identifier across the API
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // None for Google-only accounts
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_login: OffsetDateTime,
}

/// Columns of an account being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub google_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub picture: Option<&'a str>,
}

impl User {
    /// Whether a Google sign-in should record `sub` on this account.
    pub fn needs_google_link(&self, sub: &str) -> bool {
        self.google_id.is_none() && !sub.is_empty()
    }
}

/// Public part of a user shown to other users.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct UserSummary {
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            username: u.username,
            name: u.name,
            picture: u.picture,
        }
    }
}
