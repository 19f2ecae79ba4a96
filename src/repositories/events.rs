use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{Event, EventRegistration};
use crate::db::types::RegistrationStatus;

pub(crate) const EVENT_COLUMNS: &str = "\
    id, school_id, title, description, starts_at, ends_at, capacity, \
    created_by, created_at, updated_at";

pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, registered_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RegistrationWithUser {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) status: RegistrationStatus,
    pub(crate) registered_at: PrimitiveDateTime,
    pub(crate) full_name: String,
    pub(crate) email: String,
}

pub(crate) async fn find_event(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE school_id = $1 ORDER BY starts_at DESC"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateEvent<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub starts_at: PrimitiveDateTime,
    pub ends_at: PrimitiveDateTime,
    pub capacity: Option<i32>,
    pub created_by: &'a str,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create_event(
    pool: &PgPool,
    params: CreateEvent<'_>,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (
            id, school_id, title, description, starts_at, ends_at, capacity,
            created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {EVENT_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.starts_at)
    .bind(params.ends_at)
    .bind(params.capacity)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_registration(
    pool: &PgPool,
    event_id: &str,
    user_id: &str,
) -> Result<Option<EventRegistration>, sqlx::Error> {
    sqlx::query_as::<_, EventRegistration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM event_registrations
         WHERE event_id = $1 AND user_id = $2"
    ))
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_taking_seat(pool: &PgPool, event_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM event_registrations
         WHERE event_id = $1 AND status IN ('registered', 'attended')",
    )
    .bind(event_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateRegistration<'a> {
    pub id: &'a str,
    pub event_id: &'a str,
    pub user_id: &'a str,
    pub status: RegistrationStatus,
    pub registered_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create_registration(
    pool: &PgPool,
    params: CreateRegistration<'_>,
) -> Result<EventRegistration, sqlx::Error> {
    sqlx::query_as::<_, EventRegistration>(&format!(
        "INSERT INTO event_registrations (
            id, event_id, user_id, status, registered_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING {REGISTRATION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.event_id)
    .bind(params.user_id)
    .bind(params.status)
    .bind(params.registered_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update_registration_status(
    pool: &PgPool,
    registration_id: &str,
    status: RegistrationStatus,
    updated_at: PrimitiveDateTime,
) -> Result<Option<EventRegistration>, sqlx::Error> {
    sqlx::query_as::<_, EventRegistration>(&format!(
        "UPDATE event_registrations SET status = $1, updated_at = $2
         WHERE id = $3
         RETURNING {REGISTRATION_COLUMNS}",
    ))
    .bind(status)
    .bind(updated_at)
    .bind(registration_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_registrations_with_users(
    pool: &PgPool,
    event_id: &str,
) -> Result<Vec<RegistrationWithUser>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationWithUser>(
        "SELECT r.id, r.user_id, r.status, r.registered_at, u.full_name, u.email
         FROM event_registrations r
         JOIN users u ON u.id = r.user_id
         WHERE r.event_id = $1
         ORDER BY r.registered_at",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}
