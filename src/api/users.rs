//! User record REST endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::db::{NewUser, UserPatch, UserRecord};

/// Confirmation body for a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Build user records router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}

/// Create a new user
async fn create_user(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let Json(new) = body?;
    let user = state.user_repo.create(&new)?;

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// List all users, newest first
async fn list_users(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.user_repo.list()?))
}

/// Get a specific user
async fn get_user(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    state
        .user_repo
        .find(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Merge fields into an existing user
async fn update_user(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiError> {
    let Json(patch) = body?;
    let user = state.user_repo.update(&id, &patch)?;

    tracing::info!(user_id = %user.id, "user updated");
    Ok(Json(user))
}

/// Delete a user
async fn delete_user(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    state.user_repo.delete(&id)?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(MessageBody {
        message: "User deleted successfully".to_string(),
    }))
}
