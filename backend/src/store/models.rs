//! Record types persisted by the store
//!
//! JSON uses camelCase field names, the SQLite columns are snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Newly submitted, not yet reviewed
    #[default]
    Pending,
    /// Accepted by the planner
    Confirmed,
    /// Currently being organised
    InProgress,
    /// Event took place
    Completed,
    /// Event was called off
    Cancelled,
}

impl EventStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Pending,
        EventStatus::Confirmed,
        EventStatus::InProgress,
        EventStatus::Completed,
        EventStatus::Cancelled,
    ];

    /// Convert the status to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Confirmed => "confirmed",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored or submitted status string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier for the user
    pub id: String,
    /// Full name as entered on the signup form
    pub full_name: String,
    /// Email address, unique across users
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Self-described gender
    pub gender: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// When the user was created
    pub created_at: DateTime<Utc>,
}

/// Mutable user fields, shared by create and full-record update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFields {
    /// Full name (required)
    pub full_name: String,
    /// Email address
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Self-described gender
    pub gender: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

impl User {
    /// Create a new user record stamped with the current time
    pub fn new(id: String, fields: UserFields) -> Self {
        Self {
            id,
            full_name: fields.full_name,
            email: fields.email,
            phone: fields.phone,
            gender: fields.gender,
            address: fields.address,
            created_at: Utc::now(),
        }
    }
}

/// An event requested by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique identifier for the event
    pub id: String,
    /// Owning user (not enforced by the store)
    pub user_id: String,
    /// Kind of event, e.g. "wedding"
    pub event_type: String,
    /// Date as entered by the client
    pub event_date: Option<String>,
    /// Time as entered by the client
    pub event_time: Option<String>,
    /// Expected number of guests
    pub guest_count: Option<i64>,
    /// Budget in the client's currency
    pub budget: Option<f64>,
    /// Requested venue
    pub venue: Option<String>,
    /// Catering choice
    pub catering: Option<String>,
    /// Decoration choice
    pub decorations: Option<String>,
    /// Photography package
    pub photography: Option<String>,
    /// Music or entertainment choice
    pub music: Option<String>,
    /// Free-text notes
    pub additional_notes: Option<String>,
    /// Stored as the string form of [`EventStatus`]
    pub status: String,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

/// Event fields replaced by a full-record update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFields {
    /// Kind of event (required)
    pub event_type: String,
    /// Date as entered by the client
    pub event_date: Option<String>,
    /// Time as entered by the client
    pub event_time: Option<String>,
    /// Expected number of guests
    pub guest_count: Option<i64>,
    /// Budget in the client's currency
    pub budget: Option<f64>,
    /// Requested venue
    pub venue: Option<String>,
    /// Catering choice
    pub catering: Option<String>,
    /// Decoration choice
    pub decorations: Option<String>,
    /// Photography package
    pub photography: Option<String>,
    /// Music or entertainment choice
    pub music: Option<String>,
    /// Free-text notes
    pub additional_notes: Option<String>,
}

impl Event {
    /// Create a new pending event for `user_id`
    pub fn new(id: String, user_id: String, fields: EventFields) -> Self {
        Self {
            id,
            user_id,
            event_type: fields.event_type,
            event_date: fields.event_date,
            event_time: fields.event_time,
            guest_count: fields.guest_count,
            budget: fields.budget,
            venue: fields.venue,
            catering: fields.catering,
            decorations: fields.decorations,
            photography: fields.photography,
            music: fields.music,
            additional_notes: fields.additional_notes,
            status: EventStatus::default().as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Get the status as enum, falling back to pending for unknown values
    pub fn status_enum(&self) -> EventStatus {
        EventStatus::parse(&self.status).unwrap_or_default()
    }
}

/// Metadata of an uploaded file, including where its bytes live
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier for the file
    pub id: String,
    /// Event the file was uploaded under
    pub event_id: String,
    /// Uploading user
    pub user_id: String,
    /// Original file name sent by the client
    pub file_name: String,
    /// Declared MIME type
    pub file_type: Option<String>,
    /// Location of the stored object on disk
    #[serde(skip_serializing)]
    pub file_path: String,
    /// Size in bytes
    pub file_size: i64,
    /// When the upload completed
    pub uploaded_at: DateTime<Utc>,
}

/// File metadata as listed for an event; never exposes the storage path
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Unique identifier for the file
    pub id: String,
    /// Original file name sent by the client
    pub file_name: String,
    /// Declared MIME type
    pub file_type: Option<String>,
    /// Size in bytes
    pub file_size: i64,
    /// When the upload completed
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_round_trips_through_str() {
        for status in EventStatus::ALL {
            assert_eq!(EventStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EventStatus::parse("postponed"), None);
    }

    #[test]
    fn test_event_status_serde_matches_stored_form() {
        let json = serde_json::to_string(&EventStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
    }

    #[test]
    fn test_new_event_is_pending() {
        let event = Event::new(
            "e1".to_string(),
            "u1".to_string(),
            EventFields {
                event_type: "wedding".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(event.status, "pending");
        assert_eq!(event.status_enum(), EventStatus::Pending);
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User::new(
            "u1".to_string(),
            UserFields {
                full_name: "Jane D.".to_string(),
                email: Some("jane@x.com".to_string()),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["fullName"], "Jane D.");
        assert_eq!(value["email"], "jane@x.com");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_file_record_hides_storage_path() {
        let record = FileRecord {
            id: "f1".to_string(),
            event_id: "e1".to_string(),
            user_id: "u1".to_string(),
            file_name: "menu.pdf".to_string(),
            file_type: Some("application/pdf".to_string()),
            file_path: "/srv/uploads/f1.pdf".to_string(),
            file_size: 42,
            uploaded_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("filePath").is_none());
        assert_eq!(value["fileSize"], 42);
    }
}
