//! Application state
//! Owns the store handle and upload storage injected into handlers

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::services::UploadStorage;
use crate::store::{DeletePolicy, EventStore};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for users, events and files
pub type RecordId = String;

/// Generate a new unique record id
/// Uses UUID v4 for uniqueness
pub fn generate_id() -> RecordId {
    Uuid::new_v4().to_string()
}

/// State shared by all request handlers
///
/// Cheap to clone; the store sits behind an `Arc` so tests can inject their
/// own implementation.
#[derive(Clone)]
pub struct AppState {
    /// Users, events and file metadata
    pub store: Arc<dyn EventStore>,
    /// Upload directory
    pub uploads: UploadStorage,
    /// Treatment of dependents when a user or event is deleted
    pub delete_policy: DeletePolicy,
    /// Largest accepted file part, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create state with the default delete policy and upload limit
    pub fn new(store: Arc<dyn EventStore>, uploads: UploadStorage) -> Self {
        Self {
            store,
            uploads,
            delete_policy: DeletePolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Create state configured from `config`
    pub fn from_config(store: Arc<dyn EventStore>, uploads: UploadStorage, config: &Config) -> Self {
        Self::new(store, uploads)
            .with_delete_policy(config.integrity.delete_policy)
            .with_max_upload_bytes(config.upload.max_upload_bytes)
    }

    /// Override the delete policy
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Override the upload size limit
    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
