use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == crate::db::types::UserRole::SuperAdmin {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

/// Every school-scoped check takes the acting user explicitly; there is no
/// ambient session context anywhere below the extractors.
pub(crate) fn require_school_member(user: &User, school_id: &str) -> Result<(), ApiError> {
    if user.role == crate::db::types::UserRole::SuperAdmin {
        return Ok(());
    }

    match user.school_id.as_deref() {
        Some(member_of) if member_of == school_id => Ok(()),
        _ => Err(ApiError::Forbidden("Membership required for this school")),
    }
}

pub(crate) fn require_school_admin(user: &User, school_id: &str) -> Result<(), ApiError> {
    require_school_member(user, school_id)?;

    if user.role.is_school_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this school"))
    }
}

pub(crate) fn require_attendance_marker(user: &User, school_id: &str) -> Result<(), ApiError> {
    require_school_member(user, school_id)?;

    if user.role.can_mark_attendance() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this school"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use time::macros::datetime;

    fn user(role: UserRole, school_id: Option<&str>) -> User {
        User {
            id: "u1".to_string(),
            email: "user@example.com".to_string(),
            hashed_password: String::new(),
            full_name: "Test User".to_string(),
            role,
            school_id: school_id.map(|s| s.to_string()),
            phone: None,
            is_active: true,
            created_at: datetime!(2026-01-01 00:00:00),
            updated_at: datetime!(2026-01-01 00:00:00),
        }
    }

    #[test]
    fn super_admin_passes_every_school_check() {
        let admin = user(UserRole::SuperAdmin, None);
        assert!(require_school_member(&admin, "school-1").is_ok());
        assert!(require_school_admin(&admin, "school-1").is_ok());
        assert!(require_attendance_marker(&admin, "school-1").is_ok());
    }

    #[test]
    fn member_of_other_school_is_rejected() {
        let faculty = user(UserRole::Faculty, Some("school-2"));
        assert!(require_school_member(&faculty, "school-1").is_err());
    }

    #[test]
    fn faculty_can_mark_but_not_administer() {
        let faculty = user(UserRole::Faculty, Some("school-1"));
        assert!(require_attendance_marker(&faculty, "school-1").is_ok());
        assert!(require_school_admin(&faculty, "school-1").is_err());
    }

    #[test]
    fn student_cannot_mark_attendance() {
        let student = user(UserRole::Student, Some("school-1"));
        assert!(require_school_member(&student, "school-1").is_ok());
        assert!(require_attendance_marker(&student, "school-1").is_err());
    }

    #[test]
    fn co_admin_administers_own_school() {
        let co_admin = user(UserRole::CoAdmin, Some("school-1"));
        assert!(require_school_admin(&co_admin, "school-1").is_ok());
    }
}
