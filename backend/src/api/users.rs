//! User management API handlers
//!
//! Contains HTTP request handlers for user CRUD operations.

use crate::api::utils::{email_or_none, required, MutationResponse};
use crate::error::AppError;
use crate::state::{generate_id, AppState, RecordId};
use crate::store::{User, UserFields};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{info, warn};

/// Create or update user request (signup/biodata form)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    /// Full name (required)
    pub full_name: Option<String>,
    /// Email address, unique across users
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Self-described gender
    pub gender: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

impl UserRequest {
    fn into_fields(self) -> Result<UserFields, AppError> {
        Ok(UserFields {
            full_name: required(self.full_name, "fullName")?,
            email: email_or_none(self.email),
            phone: self.phone,
            gender: self.gender,
            address: self.address,
        })
    }
}

/// POST /api/users - Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let Json(request) = payload?;
    let user = User::new(generate_id(), request.into_fields()?);

    state.store.create_user(&user).await.map_err(|e| {
        warn!("Error creating user: {}", e);
        AppError::rejected(e)
    })?;

    info!(user_id = %user.id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::user("User created successfully", user.id)),
    ))
}

/// GET /api/users - List all users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store.list_users().await?))
}

/// GET /api/users/:userId - Get a specific user
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<RecordId>,
) -> Result<Json<User>, AppError> {
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// PUT /api/users/:userId - Replace a user's details
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<RecordId>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, AppError> {
    let Json(request) = payload?;
    let fields = request.into_fields()?;

    let updated = state
        .store
        .update_user(&user_id, &fields)
        .await
        .map_err(|e| {
            warn!("Error updating user {}: {}", user_id, e);
            AppError::rejected(e)
        })?;
    if !updated {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(MutationResponse::user("User updated successfully", user_id)))
}

/// DELETE /api/users/:userId - Delete a user
///
/// Dependent events and files follow the configured delete policy.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<RecordId>,
) -> Result<Json<MutationResponse>, AppError> {
    let deletion = state
        .store
        .delete_user(&user_id, state.delete_policy)
        .await
        .map_err(|e| {
            warn!("Error deleting user {}: {}", user_id, e);
            AppError::rejected(e)
        })?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    state.uploads.remove_all(&deletion.file_paths).await;

    info!(
        user_id = %user_id,
        removed_files = deletion.file_paths.len(),
        policy = state.delete_policy.as_str(),
        "User deleted"
    );
    Ok(Json(MutationResponse::user("User deleted successfully", user_id)))
}
