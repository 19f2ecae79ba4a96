use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::generation::{
    CodeTutorRequest, IdeaGenerateRequest, QuizGenerateRequest, TeacherPrepRequest,
};
use crate::services::content_generation::{
    self, GenerationService, PromptSpec,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/ideas", post(generate_ideas))
        .route("/quiz", post(generate_quiz))
        .route("/teacher-prep", post(generate_teacher_prep))
        .route("/code-tutor", post(generate_code_tutor))
}

async fn generate_ideas(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<IdeaGenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let prompt =
        content_generation::idea_prompt(&payload.topic, &payload.audience, payload.count);
    run_generation(&state, &prompt).await
}

async fn generate_quiz(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizGenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let prompt = content_generation::quiz_prompt(
        &payload.subject,
        &payload.topic,
        &payload.difficulty,
        payload.count,
    );
    run_generation(&state, &prompt).await
}

async fn generate_teacher_prep(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<TeacherPrepRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let prompt = content_generation::teacher_prep_prompt(
        &payload.subject,
        &payload.topic,
        &payload.grade,
        payload.count,
    );
    run_generation(&state, &prompt).await
}

async fn generate_code_tutor(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CodeTutorRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let prompt = content_generation::code_tutor_prompt(
        &payload.language,
        &payload.question,
        &payload.skill_level,
    );
    run_generation(&state, &prompt).await
}

/// One pass-through call; a failed or malformed response surfaces as one
/// generic retry-me error, never retried automatically.
async fn run_generation(state: &AppState, prompt: &PromptSpec) -> Result<Json<Value>, ApiError> {
    let service = GenerationService::from_settings(state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to build generation client"))?;

    match service.generate(prompt).await {
        Ok(content) => {
            metrics::counter!("content_generation_total", "outcome" => "ok").increment(1);
            Ok(Json(content))
        }
        Err(err) => {
            metrics::counter!("content_generation_total", "outcome" => "error").increment(1);
            tracing::error!(error = %err, "Content generation failed");
            Err(ApiError::ServiceUnavailable(
                "Failed to generate content, please try again".to_string(),
            ))
        }
    }
}
