use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Event, EventRegistration};
use crate::db::types::RegistrationStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EventCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "startsAt")]
    #[serde(deserialize_with = "crate::schemas::deserialize_offset_datetime")]
    pub(crate) starts_at: OffsetDateTime,
    #[serde(alias = "endsAt")]
    #[serde(deserialize_with = "crate::schemas::deserialize_offset_datetime")]
    pub(crate) ends_at: OffsetDateTime,
    #[serde(default)]
    #[validate(range(min = 1, message = "capacity must be positive"))]
    pub(crate) capacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationStatusUpdate {
    pub(crate) status: RegistrationStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) starts_at: String,
    pub(crate) ends_at: String,
    pub(crate) capacity: Option<i32>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl EventResponse {
    pub(crate) fn from_db(event: Event) -> Self {
        Self {
            id: event.id,
            school_id: event.school_id,
            title: event.title,
            description: event.description,
            starts_at: format_primitive(event.starts_at),
            ends_at: format_primitive(event.ends_at),
            capacity: event.capacity,
            created_by: event.created_by,
            created_at: format_primitive(event.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationResponse {
    pub(crate) id: String,
    pub(crate) event_id: String,
    pub(crate) user_id: String,
    pub(crate) status: RegistrationStatus,
    pub(crate) registered_at: String,
}

impl RegistrationResponse {
    pub(crate) fn from_db(registration: EventRegistration) -> Self {
        Self {
            id: registration.id,
            event_id: registration.event_id,
            user_id: registration.user_id,
            status: registration.status,
            registered_at: format_primitive(registration.registered_at),
        }
    }
}
