//! Event management API handlers
//!
//! Contains HTTP request handlers for event CRUD operations and per-user listings.

use crate::api::utils::{required, MutationResponse};
use crate::error::AppError;
use crate::state::{generate_id, AppState, RecordId};
use crate::store::{Event, EventFields, EventStatus};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{info, warn};

/// Create or update event request
///
/// `userId` is only read on create; `status` only on update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Owning user (required on create)
    pub user_id: Option<String>,
    /// Kind of event (required)
    pub event_type: Option<String>,
    /// Date as entered on the booking form
    pub event_date: Option<String>,
    /// Time as entered on the booking form
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
    /// New status, e.g. `confirmed`
    pub status: Option<String>,
}

impl EventRequest {
    fn fields(&self) -> Result<EventFields, AppError> {
        if matches!(self.guest_count, Some(n) if n < 0) {
            return Err(AppError::Validation(
                "guestCount cannot be negative".to_string(),
            ));
        }

        Ok(EventFields {
            event_type: required(self.event_type.clone(), "eventType")?,
            event_date: self.event_date.clone(),
            event_time: self.event_time.clone(),
            guest_count: self.guest_count,
            budget: self.budget,
            venue: self.venue.clone(),
            catering: self.catering.clone(),
            decorations: self.decorations.clone(),
            photography: self.photography.clone(),
            music: self.music.clone(),
            additional_notes: self.additional_notes.clone(),
        })
    }

    fn status(&self) -> Result<Option<EventStatus>, AppError> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => EventStatus::parse(&s.to_ascii_lowercase())
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("Invalid event status: {}", s))),
        }
    }
}

/// POST /api/events - Create a new event
///
/// The owning user is not checked for existence.
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let Json(request) = payload?;
    let fields = request.fields()?;
    let user_id = required(request.user_id, "userId")?;
    let event = Event::new(generate_id(), user_id, fields);

    state.store.create_event(&event).await.map_err(|e| {
        warn!("Error creating event: {}", e);
        AppError::rejected(e)
    })?;

    info!(event_id = %event.id, user_id = %event.user_id, "Event created");
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::event("Event created successfully", event.id)),
    ))
}

/// GET /api/events - List all events
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.store.list_events().await?))
}

/// GET /api/events/:eventId - Get a specific event
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<RecordId>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .store
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(event))
}

/// GET /api/users/:userId/events - List a user's events
pub async fn list_user_events(
    State(state): State<AppState>,
    Path(user_id): Path<RecordId>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.store.list_events_for_user(&user_id).await?))
}

/// PUT /api/events/:eventId - Replace an event's details, including its status
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<RecordId>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, AppError> {
    let Json(request) = payload?;
    let fields = request.fields()?;
    let status = request.status()?;

    let updated = state
        .store
        .update_event(&event_id, &fields, status)
        .await
        .map_err(|e| {
            warn!("Error updating event {}: {}", event_id, e);
            AppError::rejected(e)
        })?;
    if !updated {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(Json(MutationResponse::event(
        "Event updated successfully",
        event_id,
    )))
}

/// DELETE /api/events/:eventId - Delete an event
///
/// Dependent files follow the configured delete policy.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<RecordId>,
) -> Result<Json<MutationResponse>, AppError> {
    let deletion = state
        .store
        .delete_event(&event_id, state.delete_policy)
        .await
        .map_err(|e| {
            warn!("Error deleting event {}: {}", event_id, e);
            AppError::rejected(e)
        })?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    state.uploads.remove_all(&deletion.file_paths).await;

    info!(
        event_id = %event_id,
        removed_files = deletion.file_paths.len(),
        "Event deleted"
    );
    Ok(Json(MutationResponse::event(
        "Event deleted successfully",
        event_id,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::test_support::create_test_state;

    fn wedding(user_id: &str) -> EventRequest {
        EventRequest {
            user_id: Some(user_id.to_string()),
            event_type: Some("wedding".to_string()),
            event_date: Some("2026-06-01".to_string()),
            event_time: Some("17:30".to_string()),
            guest_count: Some(120),
            budget: Some(15000.0),
            venue: Some("Garden".to_string()),
            ..Default::default()
        }
    }

    async fn create(state: &AppState, request: EventRequest) -> Result<String, AppError> {
        let (status, response) = create_event(State(state.clone()), Ok(Json(request))).await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok(response.0.event_id.clone().expect("eventId in response"))
    }

    #[tokio::test]
    async fn test_create_event_with_unknown_user_succeeds() {
        let (state, _temp_dir) = create_test_state().await;
        let event_id = create(&state, wedding("no-such-user")).await.unwrap();

        let event = get_event(State(state), Path(event_id)).await.unwrap().0;
        assert_eq!(event.user_id, "no-such-user");
        assert_eq!(event.event_type, "wedding");
        assert_eq!(event.guest_count, Some(120));
        assert_eq!(event.budget, Some(15000.0));
        assert_eq!(event.status, "pending");
    }

    #[tokio::test]
    async fn test_event_fields_are_stored_verbatim() {
        let (state, _temp_dir) = create_test_state().await;
        let request = EventRequest {
            event_type: Some(" Wedding ".to_string()),
            venue: Some("".to_string()),
            additional_notes: Some("  vegan menu  ".to_string()),
            ..wedding("u1")
        };
        let event_id = create(&state, request).await.unwrap();

        let event = get_event(State(state), Path(event_id)).await.unwrap().0;
        assert_eq!(event.event_type, " Wedding ");
        assert_eq!(event.venue.as_deref(), Some(""));
        assert_eq!(event.additional_notes.as_deref(), Some("  vegan menu  "));
    }

    #[tokio::test]
    async fn test_create_event_rejects_blank_type() {
        let (state, _temp_dir) = create_test_state().await;
        let request = EventRequest {
            event_type: Some("   ".to_string()),
            ..wedding("u1")
        };
        assert!(matches!(
            create(&state, request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_event_requires_user_and_type() {
        let (state, _temp_dir) = create_test_state().await;

        let missing_type = EventRequest {
            event_type: None,
            ..wedding("u1")
        };
        match create(&state, missing_type).await {
            Err(AppError::Validation(message)) => assert_eq!(message, "eventType is required"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }

        let missing_user = EventRequest {
            user_id: None,
            ..wedding("u1")
        };
        match create(&state, missing_user).await {
            Err(AppError::Validation(message)) => assert_eq!(message, "userId is required"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_event_rejects_negative_guest_count() {
        let (state, _temp_dir) = create_test_state().await;
        let request = EventRequest {
            guest_count: Some(-3),
            ..wedding("u1")
        };
        assert!(matches!(
            create(&state, request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_events_by_user() {
        let (state, _temp_dir) = create_test_state().await;
        create(&state, wedding("u1")).await.unwrap();
        create(&state, wedding("u1")).await.unwrap();
        create(&state, wedding("u2")).await.unwrap();

        let all = list_events(State(state.clone())).await.unwrap().0;
        assert_eq!(all.len(), 3);

        let mine = list_user_events(State(state.clone()), Path("u1".to_string()))
            .await
            .unwrap()
            .0;
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|e| e.user_id == "u1"));

        let none = list_user_events(State(state), Path("u3".to_string()))
            .await
            .unwrap()
            .0;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_update_event_transitions_status() {
        let (state, _temp_dir) = create_test_state().await;
        let event_id = create(&state, wedding("u1")).await.unwrap();

        let update = EventRequest {
            status: Some("Confirmed".to_string()),
            guest_count: Some(150),
            ..wedding("ignored")
        };
        update_event(State(state.clone()), Path(event_id.clone()), Ok(Json(update)))
            .await
            .unwrap();

        let event = get_event(State(state), Path(event_id)).await.unwrap().0;
        assert_eq!(event.status_enum(), EventStatus::Confirmed);
        assert_eq!(event.guest_count, Some(150));
        assert_eq!(event.user_id, "u1");
    }

    #[tokio::test]
    async fn test_update_event_rejects_unknown_status() {
        let (state, _temp_dir) = create_test_state().await;
        let event_id = create(&state, wedding("u1")).await.unwrap();

        let update = EventRequest {
            status: Some("postponed".to_string()),
            ..wedding("u1")
        };
        let result = update_event(State(state), Path(event_id), Ok(Json(update))).await;
        match result {
            Err(AppError::Validation(message)) => {
                assert_eq!(message, "Invalid event status: postponed")
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_missing_event_is_not_found() {
        let (state, _temp_dir) = create_test_state().await;
        let result = update_event(State(state), Path("ghost".to_string()), Ok(Json(wedding("u1")))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_event() {
        let (state, _temp_dir) = create_test_state().await;
        let event_id = create(&state, wedding("u1")).await.unwrap();

        let response = delete_event(State(state.clone()), Path(event_id.clone()))
            .await
            .unwrap();
        assert_eq!(response.event_id.as_deref(), Some(event_id.as_str()));

        match get_event(State(state), Path(event_id)).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "Event not found"),
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }
}
