use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, GoogleCheckRequest, GoogleCheckResponse, GoogleSignInRequest,
            LoginRequest, PublicUser, RefreshRequest, RegisterRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        provider::{self, GoogleIdentity},
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/google/check", post(google_check))
        .route("/auth/google/signin", post(google_signin))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile).put(update_profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if username.chars().count() < 3 {
        return Err(AppError::validation(
            "Username must be at least 3 characters long",
        ));
    }
    Ok(())
}

fn google_account<'a>(username: &'a str, identity: &'a GoogleIdentity) -> NewUser<'a> {
    NewUser {
        username,
        email: &identity.email,
        password_hash: None,
        google_id: Some(identity.sub.as_str()).filter(|s| !s.is_empty()),
        name: identity.name.as_deref(),
        picture: identity.picture.as_deref(),
    }
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Internal(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public(user),
    })
}

fn public(user: User) -> PublicUser {
    PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
        name: user.name,
        picture: user.picture,
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    validate_username(&payload.username)?;
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Please enter a valid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if User::username_taken(&state.db, &payload.username).await? {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            username: &payload.username,
            email: &payload.email,
            password_hash: Some(&hash),
            google_id: None,
            name: None,
            picture: None,
        },
    )
    .await
    .map_err(|e| {
        error!(error = %e, "create user failed");
        AppError::Internal(e)
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Please enter a valid email"));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid());
    };
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password login on google-only account");
        return Err(invalid());
    };
    if !verify_password(&payload.password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    User::touch_login(&state.db, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn google_check(
    State(state): State<AppState>,
    Json(payload): Json<GoogleCheckRequest>,
) -> AppResult<Json<GoogleCheckResponse>> {
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("Email is required"))?;
    let exists = User::find_by_email(&state.db, &email).await?.is_some();
    Ok(Json(GoogleCheckResponse { exists }))
}

#[instrument(skip(state, payload))]
pub async fn google_signin(
    State(state): State<AppState>,
    Json(payload): Json<GoogleSignInRequest>,
) -> AppResult<Response> {
    let credential = payload
        .credential
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("Google credential is required"))?;
    let client_id = state
        .config
        .google_client_id
        .as_deref()
        .ok_or_else(|| AppError::Upstream("Google sign-in is not configured".into()))?;

    let identity = provider::verify_google_credential(&state.http, client_id, &credential)
        .await
        .map_err(|e| {
            warn!(error = %e, "google credential rejected");
            AppError::validation("Invalid Google credential")
        })?;

    if let Some(user) = User::find_by_email(&state.db, &identity.email).await? {
        let user = if user.needs_google_link(&identity.sub) {
            info!(user_id = %user.id, "linking google account");
            User::link_google(
                &state.db,
                user.id,
                &identity.sub,
                identity.name.as_deref(),
                identity.picture.as_deref(),
            )
            .await?
        } else {
            User::touch_login(&state.db, user.id).await?;
            user
        };
        info!(user_id = %user.id, "google sign-in");
        return Ok(Json(issue_tokens(&state, user)?).into_response());
    }

    let Some(username) = payload.username.map(|u| u.trim().to_string()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Username required for new accounts",
                "needsUsername": true
            })),
        )
            .into_response());
    };
    validate_username(&username)?;
    if User::username_taken(&state.db, &username).await? {
        return Err(AppError::validation("Username already taken"));
    }

    let user = User::create(&state.db, google_account(&username, &identity)).await?;
    info!(user_id = %user.id, "user registered through google");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)).into_response())
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<PublicUser>> {
    let found = User::find_by_email(&state.db, user.email())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(public(found)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let found = User::find_by_email(&state.db, user.email())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let username = payload
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| *u != found.username);
    if let Some(u) = &username {
        validate_username(u)?;
        if User::username_taken(&state.db, u).await? {
            return Err(AppError::Conflict("Username already taken".into()));
        }
    }

    let updated = User::update_profile(
        &state.db,
        found.id,
        username.as_deref(),
        payload.name.as_deref(),
    )
    .await?;
    Ok(Json(public(updated)))
}
