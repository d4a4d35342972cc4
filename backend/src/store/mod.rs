//! Store module
//!
//! Persistence for users, events and file metadata. Handlers only see the
//! [`EventStore`] trait; [`SqliteStore`] is the production implementation.

pub mod models;
pub mod sqlite;

pub use models::{Event, EventFields, EventStatus, FileRecord, FileSummary, User, UserFields};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::str::FromStr;
use thiserror::Error;

/// Errors reported by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database refused the statement (constraint violation and the like).
    /// Carries the database's own message.
    #[error("{0}")]
    Rejected(String),

    /// Connection, pool or decoding failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::Rejected(db_err.message().to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// What happens to events and files when their parent is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Delete dependent events and files along with the parent
    #[default]
    Cascade,
    /// Leave dependents in place, referencing a missing parent
    Orphan,
}

impl DeletePolicy {
    /// Configuration string for this policy
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletePolicy::Cascade => "cascade",
            DeletePolicy::Orphan => "orphan",
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletePolicy::Cascade),
            "orphan" => Ok(DeletePolicy::Orphan),
            other => Err(format!("Unknown delete policy: {}", other)),
        }
    }
}

/// Outcome of deleting a user or event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deletion {
    /// Storage paths of file records removed alongside the parent.
    /// The objects are still on disk and must be removed by the caller.
    pub file_paths: Vec<String>,
}

/// Access to persisted users, events and file metadata
///
/// Methods returning `Option`/`bool` report a missing record that way rather
/// than as an error.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new user
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;
    /// All users, newest first
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Look up a user by id
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    /// Replace all mutable fields; `false` when no such user
    async fn update_user(&self, id: &str, fields: &UserFields) -> Result<bool, StoreError>;
    /// Delete a user; `None` when no such user
    async fn delete_user(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<Option<Deletion>, StoreError>;

    /// Insert a new event
    async fn create_event(&self, event: &Event) -> Result<(), StoreError>;
    /// All events, newest first
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;
    /// Events owned by `user_id`, newest first
    async fn list_events_for_user(&self, user_id: &str) -> Result<Vec<Event>, StoreError>;
    /// Look up an event by id
    async fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError>;
    /// Replace all mutable fields; a `None` status keeps the current one
    async fn update_event(
        &self,
        id: &str,
        fields: &EventFields,
        status: Option<EventStatus>,
    ) -> Result<bool, StoreError>;
    /// Delete an event; `None` when no such event
    async fn delete_event(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<Option<Deletion>, StoreError>;

    /// Insert file metadata for an object already written to disk
    async fn create_file(&self, file: &FileRecord) -> Result<(), StoreError>;
    /// Files uploaded under `event_id`, oldest first
    async fn list_files_for_event(&self, event_id: &str) -> Result<Vec<FileSummary>, StoreError>;
    /// Look up a file record, including its storage path
    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>, StoreError>;
    /// Delete a file record; `false` when no such record
    async fn delete_file(&self, id: &str) -> Result<bool, StoreError>;
    /// Storage paths of every file record
    async fn file_paths(&self) -> Result<Vec<String>, StoreError>;

    /// Number of users
    async fn count_users(&self) -> Result<i64, StoreError>;
    /// Number of events
    async fn count_events(&self) -> Result<i64, StoreError>;
    /// Number of file records
    async fn count_files(&self) -> Result<i64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_policy_from_str() {
        assert_eq!("cascade".parse::<DeletePolicy>(), Ok(DeletePolicy::Cascade));
        assert_eq!(" Orphan ".parse::<DeletePolicy>(), Ok(DeletePolicy::Orphan));
        assert!("restrict".parse::<DeletePolicy>().is_err());
    }

    #[test]
    fn test_non_database_errors_stay_internal() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
