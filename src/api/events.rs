use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_attendance_marker, require_school_member, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Event;
use crate::db::types::RegistrationStatus;
use crate::repositories;
use crate::schemas::events::{
    EventCreate, EventResponse, RegistrationResponse, RegistrationStatusUpdate,
};
use crate::services::spreadsheet;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:school_id/events", get(list_events).post(create_event))
        .route(
            "/:school_id/events/:event_id/registrations",
            get(list_registrations).post(register),
        )
        .route("/:school_id/events/:event_id/registrations/me", delete(cancel_my_registration))
        .route(
            "/:school_id/events/:event_id/registrations/:registration_id",
            patch(update_registration),
        )
        .route("/:school_id/events/:event_id/registrations/export", get(export_registrations))
}

async fn create_event(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EventCreate>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    require_attendance_marker(&user, &school_id)?;
    validate_payload(&payload)?;

    if payload.ends_at <= payload.starts_at {
        return Err(ApiError::BadRequest("ends_at must be after starts_at".to_string()));
    }

    let now = primitive_now_utc();
    let event = repositories::events::create_event(
        state.db(),
        repositories::events::CreateEvent {
            id: &Uuid::new_v4().to_string(),
            school_id: &school_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            starts_at: to_primitive_utc(payload.starts_at),
            ends_at: to_primitive_utc(payload.ends_at),
            capacity: payload.capacity,
            created_by: &user.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create event"))?;

    Ok((StatusCode::CREATED, Json(EventResponse::from_db(event))))
}

async fn list_events(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let events = repositories::events::list_for_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list events"))?;

    Ok(Json(events.into_iter().map(EventResponse::from_db).collect()))
}

/// Register the acting user. A full event waitlists instead of rejecting; a
/// previously cancelled registration is re-activated.
async fn register(
    Path((school_id, event_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    require_school_member(&user, &school_id)?;

    let event = load_event(&state, &school_id, &event_id).await?;
    let now = primitive_now_utc();

    if let Some(existing) = repositories::events::find_registration(state.db(), &event_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check registration"))?
    {
        if existing.status != RegistrationStatus::Cancelled {
            return Err(ApiError::Conflict("Already registered for this event".to_string()));
        }

        let status = next_registration_status(&state, &event).await?;
        let updated =
            repositories::events::update_registration_status(state.db(), &existing.id, status, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to re-register"))?
                .ok_or_else(|| ApiError::NotFound("Registration not found".to_string()))?;

        return Ok((StatusCode::OK, Json(RegistrationResponse::from_db(updated))));
    }

    let status = next_registration_status(&state, &event).await?;
    let registration = repositories::events::create_registration(
        state.db(),
        repositories::events::CreateRegistration {
            id: &Uuid::new_v4().to_string(),
            event_id: &event_id,
            user_id: &user.id,
            status,
            registered_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to register for event"))?;

    Ok((StatusCode::CREATED, Json(RegistrationResponse::from_db(registration))))
}

async fn cancel_my_registration(
    Path((school_id, event_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    require_school_member(&user, &school_id)?;
    load_event(&state, &school_id, &event_id).await?;

    let registration = repositories::events::find_registration(state.db(), &event_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check registration"))?
        .ok_or_else(|| ApiError::NotFound("Registration not found".to_string()))?;

    let updated = repositories::events::update_registration_status(
        state.db(),
        &registration.id,
        RegistrationStatus::Cancelled,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to cancel registration"))?
    .ok_or_else(|| ApiError::NotFound("Registration not found".to_string()))?;

    Ok(Json(RegistrationResponse::from_db(updated)))
}

async fn update_registration(
    Path((school_id, event_id, registration_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<RegistrationStatusUpdate>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    require_attendance_marker(&user, &school_id)?;
    load_event(&state, &school_id, &event_id).await?;

    let updated = repositories::events::update_registration_status(
        state.db(),
        &registration_id,
        payload.status,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update registration"))?
    .ok_or_else(|| ApiError::NotFound("Registration not found".to_string()))?;

    Ok(Json(RegistrationResponse::from_db(updated)))
}

async fn list_registrations(
    Path((school_id, event_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, ApiError> {
    require_attendance_marker(&user, &school_id)?;
    load_event(&state, &school_id, &event_id).await?;

    let rows = repositories::events::list_registrations_with_users(state.db(), &event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list registrations"))?;

    Ok(Json(
        rows.into_iter()
            .map(|row| RegistrationResponse {
                id: row.id,
                event_id: event_id.clone(),
                user_id: row.user_id,
                status: row.status,
                registered_at: crate::core::time::format_primitive(row.registered_at),
            })
            .collect(),
    ))
}

async fn export_registrations(
    Path((school_id, event_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    require_attendance_marker(&user, &school_id)?;
    let event = load_event(&state, &school_id, &event_id).await?;

    let rows = repositories::events::list_registrations_with_users(state.db(), &event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list registrations"))?;

    let csv = spreadsheet::registrations_csv(&rows)
        .map_err(|e| ApiError::internal(e, "Failed to build registration export"))?;

    let filename = format!("{}-registrations.csv", event.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        csv,
    ))
}

async fn load_event(
    state: &AppState,
    school_id: &str,
    event_id: &str,
) -> Result<Event, ApiError> {
    repositories::events::find_event(state.db(), school_id, event_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch event"))?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
}

async fn next_registration_status(
    state: &AppState,
    event: &Event,
) -> Result<RegistrationStatus, ApiError> {
    let Some(capacity) = event.capacity else {
        return Ok(RegistrationStatus::Registered);
    };

    let taken = repositories::events::count_taking_seat(state.db(), &event.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count registrations"))?;

    if taken >= capacity as i64 {
        Ok(RegistrationStatus::Waitlisted)
    } else {
        Ok(RegistrationStatus::Registered)
    }
}
