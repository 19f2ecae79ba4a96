use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_school_admin, require_school_member, CurrentAdmin, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::school::{
    OnboardMemberRequest, SchoolCreate, SchoolResponse, TeachingAssignmentResponse,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_schools).post(create_school))
        .route("/:school_id", get(get_school))
        .route("/:school_id/members", post(onboard_member))
        .route("/:school_id/teaching-assignments", get(list_teaching_assignments))
}

async fn list_schools(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<SchoolResponse>>, ApiError> {
    let schools = repositories::schools::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list schools"))?;

    Ok(Json(schools.into_iter().map(SchoolResponse::from_db).collect()))
}

async fn create_school(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let school = repositories::schools::create(
        state.db(),
        repositories::schools::CreateSchool {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            is_active: true,
            created_by: &admin.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create school"))?;

    Ok((StatusCode::CREATED, Json(SchoolResponse::from_db(school))))
}

async fn get_school(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SchoolResponse>, ApiError> {
    require_school_member(&user, &school_id)?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    Ok(Json(SchoolResponse::from_db(school)))
}

/// Attach an existing user to this school. Mirrors the onboarding step that
/// sets `school_id` after registration.
async fn onboard_member(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OnboardMemberRequest>,
) -> Result<StatusCode, ApiError> {
    require_school_admin(&user, &school_id)?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    if school.is_none() {
        return Err(ApiError::NotFound("School not found".to_string()));
    }

    let target = repositories::users::find_by_id(state.db(), &payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Some(existing) = target.school_id.as_deref() {
        if existing != school_id {
            return Err(ApiError::Conflict("User already belongs to another school".to_string()));
        }
        return Ok(StatusCode::NO_CONTENT);
    }

    repositories::users::update(
        state.db(),
        &target.id,
        repositories::users::UpdateUser {
            full_name: None,
            role: None,
            school_id: Some(school_id),
            phone: None,
            is_active: None,
            hashed_password: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to attach user to school"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_teaching_assignments(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TeachingAssignmentResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let assignments = repositories::teaching_assignments::list_for_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list teaching assignments"))?;

    Ok(Json(assignments.into_iter().map(TeachingAssignmentResponse::from_db).collect()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn admin_creates_school_and_onboards_member() {
        let ctx = test_support::setup_test_context().await;
        let admin = test_support::insert_super_admin(
            ctx.state.db(),
            "admin@example.com",
            "Admin",
            "pw-123456",
        )
        .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let create = test_support::json_request(
            Method::POST,
            "/api/v1/schools",
            Some(&token),
            Some(serde_json::json!({"name": "Northside High"})),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create school");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        let school_id = body["id"].as_str().expect("school id").to_string();

        let member =
            test_support::insert_user(ctx.state.db(), "new@example.com", "New Member", "pw-123456")
                .await;

        let onboard = test_support::json_request(
            Method::POST,
            &format!("/api/v1/schools/{school_id}/members"),
            Some(&token),
            Some(serde_json::json!({"user_id": member.id})),
        );
        let response = ctx.app.clone().oneshot(onboard).await.expect("onboard");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let fetched = crate::repositories::users::find_by_id(ctx.state.db(), &member.id)
            .await
            .expect("query")
            .expect("user");
        assert_eq!(fetched.school_id.as_deref(), Some(school_id.as_str()));
    }

    #[tokio::test]
    async fn member_of_other_school_cannot_view_school() {
        let ctx = test_support::setup_test_context().await;
        let admin = test_support::insert_super_admin(
            ctx.state.db(),
            "admin@example.com",
            "Admin",
            "pw-123456",
        )
        .await;
        let school_a = test_support::insert_school(ctx.state.db(), "School A", &admin.id).await;
        let school_b = test_support::insert_school(ctx.state.db(), "School B", &admin.id).await;
        let outsider = test_support::insert_school_user(
            ctx.state.db(),
            "faculty@example.com",
            "Faculty",
            "pw-123456",
            crate::db::types::UserRole::Faculty,
            &school_b.id,
        )
        .await;
        let token = test_support::bearer_token(&outsider.id, ctx.state.settings());

        let request = test_support::json_request(
            Method::GET,
            &format!("/api/v1/schools/{}", school_a.id),
            Some(&token),
            None,
        );
        let response = ctx.app.clone().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
