use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{UserCreate, UserLogin, UserResponse};

/// Max attempts per window for auth endpoints (login/signup/token).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_payload(&payload)?;
    let email = payload.email.trim().to_ascii_lowercase();

    let rate_key = format!("rl:signup:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many signup attempts, try again later"));
    }

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();

    // Self-signup lands outside any school; an admin attaches the school at
    // onboarding.
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            hashed_password,
            full_name: &payload.full_name,
            role: UserRole::Student,
            school_id: None,
            phone: payload.phone.as_deref(),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let response = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, &payload.email, &payload.password).await.map(Json)
}

/// OAuth2 password-flow compatible endpoint: form-encoded, `username` holds
/// the email.
async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, &payload.username, &payload.password).await.map(Json)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<TokenResponse, ApiError> {
    let email = email.trim().to_ascii_lowercase();

    let rate_key = format!("rl:login:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    };

    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|e| ApiError::internal(e, "Failed to verify password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is disabled"));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn signup_login_me_roundtrip() {
        let ctx = test_support::setup_test_context().await;

        let signup = test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(serde_json::json!({
                "email": "avery@example.com",
                "full_name": "Avery Lee",
                "password": "super-secret-pw"
            })),
        );
        let response = ctx.app.clone().oneshot(signup).await.expect("signup response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        let token = body["access_token"].as_str().expect("token").to_string();
        assert_eq!(body["user"]["email"], "avery@example.com");
        assert_eq!(body["user"]["role"], "student");

        let me = test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None);
        let response = ctx.app.clone().oneshot(me).await.expect("me response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["full_name"], "Avery Lee");

        let login = test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(serde_json::json!({
                "email": "avery@example.com",
                "password": "super-secret-pw"
            })),
        );
        let response = ctx.app.clone().oneshot(login).await.expect("login response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let ctx = test_support::setup_test_context().await;

        let payload = serde_json::json!({
            "email": "avery@example.com",
            "full_name": "Avery Lee",
            "password": "super-secret-pw"
        });

        let first = test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(payload.clone()),
        );
        let response = ctx.app.clone().oneshot(first).await.expect("first signup");
        assert_eq!(response.status(), StatusCode::CREATED);

        let second =
            test_support::json_request(Method::POST, "/api/v1/auth/signup", None, Some(payload));
        let response = ctx.app.clone().oneshot(second).await.expect("second signup");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "avery@example.com", "Avery Lee", "right-pw")
            .await;

        let login = test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(serde_json::json!({
                "email": "avery@example.com",
                "password": "wrong-pw"
            })),
        );
        let response = ctx.app.clone().oneshot(login).await.expect("login response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
