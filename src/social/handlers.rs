use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::{self, MealGroup};
use crate::{
    auth::{
        repo_types::{User, UserSummary},
        AuthUser,
    },
    error::{AppError, AppResult},
    state::AppState,
};

const SEARCH_LIMIT: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/social/search", get(search_users))
        .route("/social/friends/request", post(send_request))
        .route("/social/friends/accept", post(accept_request))
        .route("/social/friends/:user_id", get(list_friends))
        .route("/social/friend-requests/:user_id", get(list_requests))
        .route("/social/groups/create", post(create_group))
        // user id for GET, group id for the members route
        .route("/social/groups/:id", get(list_groups))
        .route("/social/groups/:id/members", post(add_group_members))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    pub member_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FriendRequests {
    pub received: Vec<UserSummary>,
    pub sent: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: MealGroup,
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Members as a set: creator first, the rest in request order, blanks dropped.
pub fn group_members(creator: &str, requested: &[String]) -> Vec<String> {
    let mut members = vec![normalize_email(creator)];
    for m in requested.iter().map(|m| normalize_email(m)) {
        if !m.is_empty() && !members.contains(&m) {
            members.push(m);
        }
    }
    members
}

#[instrument(skip(state, user))]
pub async fn search_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Value>> {
    let term = q.term.trim();
    if term.is_empty() {
        return Ok(Json(json!({ "users": [] })));
    }
    let users = User::search(&state.db, term, user.email(), SEARCH_LIMIT).await?;
    Ok(Json(json!({ "users": users })))
}

#[instrument(skip(state, user))]
pub async fn list_friends(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<UserSummary>>> {
    user.ensure_owner(&user_id)?;
    let emails = repo::friends_of(&state.db, user.email()).await?;
    Ok(Json(User::summaries(&state.db, &emails).await?))
}

#[instrument(skip(state, user, payload))]
pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FriendRequest>,
) -> AppResult<Json<Value>> {
    let friend_id = normalize_email(&payload.friend_id);
    if friend_id == user.email() {
        return Err(AppError::validation("You cannot add yourself as a friend"));
    }
    let friend = User::find_by_email(&state.db, &friend_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if repo::are_friends(&state.db, user.email(), &friend.email).await? {
        return Err(AppError::validation("Already friends"));
    }
    if !repo::insert_request(&state.db, user.email(), &friend.email).await? {
        return Err(AppError::validation("Friend request already sent"));
    }

    info!(from = %user.email(), to = %friend.email, "friend request sent");
    Ok(Json(json!({
        "message": "Friend request sent",
        "requestedFriend": {
            "email": friend.email,
            "username": friend.username,
            "name": friend.name,
        }
    })))
}

#[instrument(skip(state, user, payload))]
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FriendRequest>,
) -> AppResult<Json<Value>> {
    let friend_id = normalize_email(&payload.friend_id);
    let friend = User::find_by_email(&state.db, &friend_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !repo::accept_request(&state.db, user.email(), &friend.email).await? {
        warn!(user = %user.email(), from = %friend.email, "no pending request to accept");
        return Err(AppError::validation("No pending friend request from this user"));
    }

    info!(user = %user.email(), friend = %friend.email, "friend request accepted");
    Ok(Json(json!({ "friend": UserSummary::from(friend) })))
}

#[instrument(skip(state, user))]
pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<FriendRequests>> {
    user.ensure_owner(&user_id)?;
    let (received, sent) = repo::pending_requests(&state.db, user.email()).await?;
    let (received, sent) = tokio::try_join!(
        User::summaries(&state.db, &received),
        User::summaries(&state.db, &sent),
    )?;
    Ok(Json(FriendRequests { received, sent }))
}

#[instrument(skip(state, user))]
pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<MealGroup>>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(repo::groups_for(&state.db, user.email()).await?))
}

#[instrument(skip(state, user, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<Json<GroupResponse>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Group name is required"));
    }
    let members = group_members(user.email(), &payload.members);
    let group = repo::create_group(&state.db, name, user.email(), &members).await?;

    info!(group_id = %group.id, creator = %user.email(), members = group.members.len(), "group created");
    Ok(Json(GroupResponse { group }))
}

#[instrument(skip(state, user, payload))]
pub async fn add_group_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AddMembersRequest>,
) -> AppResult<Json<GroupResponse>> {
    let group = repo::find_group(&state.db, group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    if !group.creator.eq_ignore_ascii_case(user.email()) {
        return Err(AppError::forbidden("Only group creator can add members"));
    }

    let members: Vec<String> = group_members(&group.creator, &payload.member_ids)
        .into_iter()
        .skip(1)
        .collect();
    let group = repo::add_members(&state.db, group_id, &members)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    Ok(Json(GroupResponse { group }))
}
