//! API utility functions
//!
//! Contains the mutation response envelope and helpers used by API handlers
//! for request validation.

use crate::error::AppError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Serialize;

/// Body returned by successful create/update/delete requests
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// Always `true`; failures use the error body instead
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// Affected user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Affected event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Affected file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Original name of an uploaded file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl MutationResponse {
    fn new(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            user_id: None,
            event_id: None,
            file_id: None,
            file_name: None,
        }
    }

    /// Response naming an affected user
    pub fn user(message: &str, user_id: String) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::new(message)
        }
    }

    /// Response naming an affected event
    pub fn event(message: &str, event_id: String) -> Self {
        Self {
            event_id: Some(event_id),
            ..Self::new(message)
        }
    }

    /// Response naming an affected file
    pub fn file(message: &str, file_id: String) -> Self {
        Self {
            file_id: Some(file_id),
            ..Self::new(message)
        }
    }

    /// Attach the original file name
    pub fn with_file_name(mut self, file_name: String) -> Self {
        self.file_name = Some(file_name);
        self
    }
}

/// Require a non-blank string field, returning it as submitted
pub fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// Email as submitted; a blank email is stored as `NULL` so it never
/// collides with another blank one on the unique index
pub fn email_or_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Multipart(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        // The body limit surfaces as a multipart read error
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::Multipart(err.body_text())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::services::UploadStorage;
    use crate::state::AppState;
    use crate::store::SqliteStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// State over a fresh database and upload directory inside a temp dir
    pub async fn create_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(&temp_dir.path().join("test.db"))
            .await
            .expect("Failed to create test database");
        let uploads = UploadStorage::new(temp_dir.path().join("uploads"));
        uploads.init().await.expect("Failed to create upload dir");
        (AppState::new(Arc::new(store), uploads), temp_dir)
    }
}
