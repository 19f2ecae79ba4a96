use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use time::Duration;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_attendance_marker, require_school_member, CurrentUser};
use crate::api::validation::{parse_date_param, validate_payload};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, today_utc};
use crate::db::models::StudentProfile;
use crate::db::types::{AttendanceStatus, UserRole};
use crate::repositories;
use crate::schemas::attendance::{
    AbsenteeAlertResponse, HistoryEntryResponse, SaveAttendanceRequest, SaveAttendanceResponse,
    SessionResponse, SessionsQuery,
};
use crate::services::attendance::{self, StudentRef};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:school_id/sessions", get(list_sessions).put(save_session))
        .route("/:school_id/alerts", get(list_alerts))
        .route("/:school_id/students/:profile_id/history", get(student_history))
}

async fn list_sessions(
    Path(school_id): Path<String>,
    Query(params): Query<SessionsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let from = params.from.as_deref().map(|raw| parse_date_param("from", raw)).transpose()?;
    let to = params.to.as_deref().map(|raw| parse_date_param("to", raw)).transpose()?;

    let rows = repositories::attendance::list_for_school(state.db(), &school_id, from, to)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attendance"))?;
    let profiles = repositories::student_profiles::list_for_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student profiles"))?;

    let sessions = attendance::group_sessions(
        &rows,
        &profiles,
        state.settings().attendance().marker_policy,
    );

    let marker_ids: Vec<String> = sessions
        .iter()
        .map(|session| session.marked_by.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let marker_names: HashMap<String, String> =
        repositories::users::list_by_ids(state.db(), &marker_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch marker names"))?
            .into_iter()
            .map(|marker| (marker.id, marker.full_name))
            .collect();

    Ok(Json(
        sessions
            .into_iter()
            .map(|session| SessionResponse::from_session(session, &marker_names))
            .collect(),
    ))
}

/// Save one attendance session. Prior rows for this roster on this
/// date/subject are deleted and a fresh row is written for every student in
/// the class/section, defaulting to present when no entry was supplied.
async fn save_session(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveAttendanceRequest>,
) -> Result<Json<SaveAttendanceResponse>, ApiError> {
    require_attendance_marker(&user, &school_id)?;
    validate_payload(&payload)?;

    let roster = repositories::student_profiles::list_for_class_section(
        state.db(),
        &school_id,
        &payload.class_name,
        &payload.section,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch class roster"))?;

    if roster.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No students found in class {} section {}",
            payload.class_name, payload.section
        )));
    }

    let roster_ids: HashSet<&str> = roster.iter().map(|profile| profile.id.as_str()).collect();
    let mut statuses: HashMap<String, AttendanceStatus> = HashMap::new();
    for entry in &payload.entries {
        if !roster_ids.contains(entry.student_profile_id.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Student profile {} is not in class {} section {}",
                entry.student_profile_id, payload.class_name, payload.section
            )));
        }
        statuses.insert(entry.student_profile_id.clone(), entry.status);
    }

    let subject = payload.subject.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let profile_ids: Vec<String> = roster.iter().map(|profile| profile.id.clone()).collect();
    let rows: Vec<repositories::attendance::NewSessionRow> = roster
        .iter()
        .map(|profile| repositories::attendance::NewSessionRow {
            id: Uuid::new_v4().to_string(),
            student_profile_id: profile.id.clone(),
            status: statuses.get(&profile.id).copied().unwrap_or(AttendanceStatus::Present),
        })
        .collect();

    let saved_rows = repositories::attendance::replace_session(
        state.db(),
        repositories::attendance::ReplaceSession {
            school_id: &school_id,
            attendance_date: payload.date,
            subject,
            marked_by: &user.id,
            profile_ids: &profile_ids,
            rows,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save attendance"))?;

    metrics::counter!("attendance_saves_total").increment(1);
    tracing::info!(
        school_id,
        date = %payload.date,
        class_name = payload.class_name,
        section = payload.section,
        saved_rows,
        "Attendance session saved"
    );

    Ok(Json(SaveAttendanceResponse { saved_rows }))
}

async fn list_alerts(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AbsenteeAlertResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let settings = state.settings().attendance();
    let today = today_utc();
    let window_start = today - Duration::days(settings.alert_window_days);

    let rows = repositories::attendance::list_for_school(
        state.db(),
        &school_id,
        Some(window_start),
        Some(today),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch attendance"))?;
    let profiles = repositories::student_profiles::list_for_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student profiles"))?;

    let sessions = attendance::group_sessions(&rows, &profiles, settings.marker_policy);
    let students = student_refs(state.db(), &profiles).await?;

    let alerts = attendance::absentee_alerts(
        &sessions,
        &students,
        today,
        settings.alert_window_days,
        settings.alert_threshold,
    );

    Ok(Json(alerts.into_iter().map(AbsenteeAlertResponse::from_alert).collect()))
}

async fn student_history(
    Path((school_id, profile_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let profile = repositories::student_profiles::find_by_id(state.db(), &profile_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student profile"))?
        .filter(|profile| profile.school_id == school_id)
        .ok_or_else(|| ApiError::NotFound("Student profile not found".to_string()))?;

    // Students see their own history only; staff roles see any student's.
    if user.role == UserRole::Student && profile.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions for this school"));
    }

    let records = repositories::attendance::list_for_profile(state.db(), &school_id, &profile_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attendance history"))?;

    Ok(Json(records.into_iter().map(HistoryEntryResponse::from_db).collect()))
}

async fn student_refs(
    pool: &sqlx::PgPool,
    profiles: &[StudentProfile],
) -> Result<Vec<StudentRef>, ApiError> {
    let user_ids: Vec<String> = profiles.iter().map(|profile| profile.user_id.clone()).collect();
    let names: HashMap<String, String> = repositories::users::list_by_ids(pool, &user_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch students"))?
        .into_iter()
        .map(|student| (student.id, student.full_name))
        .collect();

    Ok(profiles
        .iter()
        .map(|profile| StudentRef {
            user_id: profile.user_id.clone(),
            full_name: names.get(&profile.user_id).cloned().unwrap_or_default(),
            class_name: profile.class_name.clone(),
            section: profile.section.clone(),
        })
        .collect())
}
