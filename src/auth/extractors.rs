use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, provider};
use crate::{error::AppError, state::AppState};

/// Authenticated caller, identified by verified email.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.0
    }

    /// Rejects requests acting on another user's data.
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), AppError> {
        if self.0.eq_ignore_ascii_case(user_id.trim()) {
            Ok(())
        } else {
            warn!(caller = %self.0, target = %user_id, "identity mismatch");
            Err(AppError::forbidden("Not allowed to act for this user"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let keys = JwtKeys::from_ref(state);
        match keys.verify_access(token) {
            Ok(claims) => return Ok(AuthUser(claims.email.to_lowercase())),
            Err(e) if state.config.auth0_domain.is_none() => {
                warn!(error = %e, "invalid or expired token");
                return Err(AppError::Unauthorized("Invalid or expired token".into()));
            }
            Err(_) => {}
        }

        // not one of ours; ask the hosted identity provider who it belongs to
        let domain = state.config.auth0_domain.as_deref().unwrap_or_default();
        match provider::userinfo_email(&state.http, domain, token).await {
            Ok(email) => Ok(AuthUser(email)),
            Err(e) => {
                warn!(error = %e, "identity provider rejected token");
                Err(AppError::Unauthorized(
                    "Authentication failed - no email found".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use uuid::Uuid;

    async fn extract(state: &AppState, header: Option<&str>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let err = extract(&AppState::fake(), None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let err = extract(&AppState::fake(), Some("Bearer nope")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_refresh(Uuid::new_v4(), "a@b.edu").unwrap();
        let err = extract(&state, Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn access_token_yields_email_identity() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(Uuid::new_v4(), "Pete@Purdue.edu").unwrap();
        let user = extract(&state, Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.email(), "pete@purdue.edu");
    }

    #[test]
    fn ownership_is_case_insensitive() {
        let user = AuthUser("pete@purdue.edu".into());
        assert!(user.ensure_owner("Pete@Purdue.edu").is_ok());
        let err = user.ensure_owner("other@purdue.edu").unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
