use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{AdminUserCreate, AdminUserUpdate, UserResponse};

const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    school_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    is_active: Option<bool>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", get(get_user).patch(update_user))
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM users",
        repositories::users::COLUMNS
    ));
    let mut has_where = false;

    if let Some(email) = params.email.as_ref() {
        builder.push(" WHERE ");
        has_where = true;
        builder.push("email = ");
        builder.push_bind(email);
    }
    if let Some(role) = params.role {
        if !has_where {
            builder.push(" WHERE ");
            has_where = true;
        } else {
            builder.push(" AND ");
        }
        builder.push("role = ");
        builder.push_bind(role);
    }
    if let Some(school_id) = params.school_id.as_ref() {
        if !has_where {
            builder.push(" WHERE ");
            has_where = true;
        } else {
            builder.push(" AND ");
        }
        builder.push("school_id = ");
        builder.push_bind(school_id);
    }
    if let Some(is_active) = params.is_active {
        if !has_where {
            builder.push(" WHERE ");
        } else {
            builder.push(" AND ");
        }
        builder.push("is_active = ");
        builder.push_bind(is_active);
    }

    builder.push(" ORDER BY created_at DESC");
    builder.push(" OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));

    let users = builder
        .build_query_as::<User>()
        .fetch_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn get_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?;

    let Some(user) = user else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    Ok(Json(UserResponse::from_db(user)))
}

async fn create_user(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_payload(&payload)?;
    let email = payload.email.trim().to_ascii_lowercase();

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    if let Some(school_id) = payload.school_id.as_ref() {
        let school = repositories::schools::find_by_id(state.db(), school_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
        if school.is_none() {
            return Err(ApiError::BadRequest("Unknown school".to_string()));
        }
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            hashed_password,
            full_name: &payload.full_name,
            role: payload.role,
            school_id: payload.school_id.as_deref(),
            phone: payload.phone.as_deref(),
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

async fn update_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    let existing = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?;

    if existing.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            full_name: payload.full_name,
            role: payload.role,
            school_id: payload.school_id,
            phone: payload.phone,
            is_active: payload.is_active,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?;

    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_db(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn non_admin_cannot_list_users() {
        let ctx = test_support::setup_test_context().await;
        let user =
            test_support::insert_user(ctx.state.db(), "user@example.com", "Plain User", "pw-123456")
                .await;
        let token = test_support::bearer_token(&user.id, ctx.state.settings());

        let request =
            test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None);
        let response = ctx.app.clone().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_creates_and_filters_users() {
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
            "/api/v1/users",
            Some(&token),
            Some(serde_json::json!({
                "email": "faculty@example.com",
                "full_name": "Faculty Member",
                "password": "pw-123456",
                "role": "faculty"
            })),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let list = test_support::json_request(
            Method::GET,
            "/api/v1/users?role=faculty",
            Some(&token),
            None,
        );
        let response = ctx.app.clone().oneshot(list).await.expect("list response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["email"], "faculty@example.com");
    }
}
