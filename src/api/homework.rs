use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_attendance_marker, require_school_member, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::types::{HomeworkKind, UserRole};
use crate::repositories;
use crate::schemas::homework::{
    AssignmentCreate, AssignmentResponse, AssignmentsQuery, SubmissionCreate, SubmissionResponse,
};
use crate::services::scoring;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:school_id/assignments", get(list_assignments).post(create_assignment))
        .route("/:school_id/assignments/:assignment_id", get(get_assignment))
        .route(
            "/:school_id/assignments/:assignment_id/submissions",
            get(list_submissions).post(submit),
        )
        .route("/:school_id/assignments/:assignment_id/submissions/me", get(my_submission))
}

async fn create_assignment(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    // Assigning homework follows the same role line as marking attendance.
    require_attendance_marker(&user, &school_id)?;
    validate_payload(&payload)?;

    match payload.kind {
        HomeworkKind::Mcq => {
            let questions = scoring::parse_mcq_questions(&payload.questions)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            if questions.is_empty() {
                return Err(ApiError::BadRequest(
                    "assignment needs at least one question".to_string(),
                ));
            }
        }
        HomeworkKind::Viva => {
            let questions = scoring::parse_viva_questions(&payload.questions)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            if questions.is_empty() {
                return Err(ApiError::BadRequest(
                    "assignment needs at least one question".to_string(),
                ));
            }
        }
    }

    let now = primitive_now_utc();
    let assignment = repositories::homework::create_assignment(
        state.db(),
        repositories::homework::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            school_id: &school_id,
            title: payload.title.trim(),
            kind: payload.kind,
            class_name: &payload.class_name,
            section: &payload.section,
            questions: payload.questions,
            deadline: to_primitive_utc(payload.deadline),
            max_marks: payload.max_marks,
            created_by: &user.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assignment"))?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

async fn list_assignments(
    Path(school_id): Path<String>,
    Query(params): Query<AssignmentsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    require_school_member(&user, &school_id)?;

    let assignments = repositories::homework::list_assignments(
        state.db(),
        &school_id,
        params.class_name.as_deref(),
        params.section.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    let redact = user.role == UserRole::Student;
    Ok(Json(
        assignments
            .into_iter()
            .map(|assignment| {
                if redact {
                    AssignmentResponse::from_db_redacted(assignment)
                } else {
                    AssignmentResponse::from_db(assignment)
                }
            })
            .collect(),
    ))
}

async fn get_assignment(
    Path((school_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    require_school_member(&user, &school_id)?;

    let assignment = repositories::homework::find_assignment(state.db(), &school_id, &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let response = if user.role == UserRole::Student {
        AssignmentResponse::from_db_redacted(assignment)
    } else {
        AssignmentResponse::from_db(assignment)
    };

    Ok(Json(response))
}

/// Submit answers; the score is computed server-side at submit time and a
/// re-submission replaces the previous one.
async fn submit(
    Path((school_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    require_school_member(&user, &school_id)?;

    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Only students can submit homework"));
    }

    let assignment = repositories::homework::find_assignment(state.db(), &school_id, &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let now = primitive_now_utc();
    if now > assignment.deadline {
        return Err(ApiError::BadRequest("The deadline for this assignment has passed".to_string()));
    }

    let outcome = match assignment.kind {
        HomeworkKind::Mcq => {
            let questions = scoring::parse_mcq_questions(&assignment.questions.0)
                .map_err(|e| ApiError::internal(e, "Stored assignment questions are invalid"))?;
            scoring::score_mcq(&questions, &payload.answers, assignment.max_marks)
        }
        HomeworkKind::Viva => {
            let questions = scoring::parse_viva_questions(&assignment.questions.0)
                .map_err(|e| ApiError::internal(e, "Stored assignment questions are invalid"))?;
            scoring::score_viva(&questions, &payload.answers)
        }
    };

    let answers = serde_json::to_value(&payload.answers)
        .map_err(|e| ApiError::internal(e, "Failed to serialize answers"))?;

    let submission = repositories::homework::upsert_submission(
        state.db(),
        repositories::homework::UpsertSubmission {
            id: &Uuid::new_v4().to_string(),
            assignment_id: &assignment_id,
            student_id: &user.id,
            answers,
            score: outcome.score,
            marks_obtained: outcome.marks_obtained,
            submitted_at: now,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store submission"))?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

async fn list_submissions(
    Path((school_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    require_attendance_marker(&user, &school_id)?;

    let assignment = repositories::homework::find_assignment(state.db(), &school_id, &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
    if assignment.is_none() {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    let submissions = repositories::homework::list_submissions(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

async fn my_submission(
    Path((school_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    require_school_member(&user, &school_id)?;

    let submission = repositories::homework::find_submission(state.db(), &assignment_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("No submission yet".to_string()))?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    fn mcq_assignment_payload(deadline: &str) -> serde_json::Value {
        serde_json::json!({
            "title": "Fractions quiz",
            "kind": "mcq",
            "class_name": "8",
            "section": "A",
            "max_marks": 50.0,
            "deadline": deadline,
            "questions": [
                {"id": "q1", "prompt": "1/2 + 1/2?", "options": ["1", "2"], "correct_answer": "1"},
                {"id": "q2", "prompt": "1/4 + 1/4?", "options": ["1/2", "1"], "correct_answer": "1/2"},
                {"id": "q3", "prompt": "1/3 * 3?", "options": ["1", "3"], "correct_answer": "1"},
                {"id": "q4", "prompt": "2/4 simplified?", "options": ["1/2", "2"], "correct_answer": "1/2"},
                {"id": "q5", "prompt": "1 - 1/2?", "options": ["1/2", "0"], "correct_answer": "1/2"}
            ]
        })
    }

    #[tokio::test]
    async fn mcq_submission_is_scored_exactly() {
        let ctx = test_support::setup_test_context().await;
        let seeded = test_support::seed_school_with_class(&ctx, "8", "A", 1).await;
        let faculty_token = test_support::bearer_token(&seeded.faculty.id, ctx.state.settings());

        let create = test_support::json_request(
            Method::POST,
            &format!("/api/v1/homework/{}/assignments", seeded.school.id),
            Some(&faculty_token),
            Some(mcq_assignment_payload("2030-01-01T00:00:00Z")),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create assignment");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        let assignment_id = body["id"].as_str().expect("assignment id").to_string();

        let student_token =
            test_support::bearer_token(&seeded.students[0].id, ctx.state.settings());
        let submit = test_support::json_request(
            Method::POST,
            &format!(
                "/api/v1/homework/{}/assignments/{assignment_id}/submissions",
                seeded.school.id
            ),
            Some(&student_token),
            Some(serde_json::json!({
                "answers": {"q1": "1", "q2": "1/2", "q3": "1", "q4": "2", "q5": "0"}
            })),
        );
        let response = ctx.app.clone().oneshot(submit).await.expect("submit");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["score"], 60.0);
        assert_eq!(body["marks_obtained"], 30.0);
    }

    #[tokio::test]
    async fn student_sees_assignment_without_answer_key() {
        let ctx = test_support::setup_test_context().await;
        let seeded = test_support::seed_school_with_class(&ctx, "8", "A", 1).await;
        let faculty_token = test_support::bearer_token(&seeded.faculty.id, ctx.state.settings());

        let create = test_support::json_request(
            Method::POST,
            &format!("/api/v1/homework/{}/assignments", seeded.school.id),
            Some(&faculty_token),
            Some(mcq_assignment_payload("2030-01-01T00:00:00Z")),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create assignment");
        let body = test_support::read_json(response).await;
        let assignment_id = body["id"].as_str().expect("assignment id").to_string();

        let student_token =
            test_support::bearer_token(&seeded.students[0].id, ctx.state.settings());
        let get = test_support::json_request(
            Method::GET,
            &format!("/api/v1/homework/{}/assignments/{assignment_id}", seeded.school.id),
            Some(&student_token),
            None,
        );
        let response = ctx.app.clone().oneshot(get).await.expect("get assignment");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        for question in body["questions"].as_array().expect("questions") {
            assert!(question.get("correct_answer").is_none());
        }
    }

    #[tokio::test]
    async fn submission_after_deadline_is_rejected() {
        let ctx = test_support::setup_test_context().await;
        let seeded = test_support::seed_school_with_class(&ctx, "8", "A", 1).await;
        let faculty_token = test_support::bearer_token(&seeded.faculty.id, ctx.state.settings());

        let create = test_support::json_request(
            Method::POST,
            &format!("/api/v1/homework/{}/assignments", seeded.school.id),
            Some(&faculty_token),
            Some(mcq_assignment_payload("2020-01-01T00:00:00Z")),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create assignment");
        let body = test_support::read_json(response).await;
        let assignment_id = body["id"].as_str().expect("assignment id").to_string();

        let student_token =
            test_support::bearer_token(&seeded.students[0].id, ctx.state.settings());
        let submit = test_support::json_request(
            Method::POST,
            &format!(
                "/api/v1/homework/{}/assignments/{assignment_id}/submissions",
                seeded.school.id
            ),
            Some(&student_token),
            Some(serde_json::json!({"answers": {"q1": "1"}})),
        );
        let response = ctx.app.clone().oneshot(submit).await.expect("submit");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resubmission_replaces_previous_score() {
        let ctx = test_support::setup_test_context().await;
        let seeded = test_support::seed_school_with_class(&ctx, "8", "A", 1).await;
        let faculty_token = test_support::bearer_token(&seeded.faculty.id, ctx.state.settings());

        let create = test_support::json_request(
            Method::POST,
            &format!("/api/v1/homework/{}/assignments", seeded.school.id),
            Some(&faculty_token),
            Some(mcq_assignment_payload("2030-01-01T00:00:00Z")),
        );
        let response = ctx.app.clone().oneshot(create).await.expect("create assignment");
        let body = test_support::read_json(response).await;
        let assignment_id = body["id"].as_str().expect("assignment id").to_string();

        let student_token =
            test_support::bearer_token(&seeded.students[0].id, ctx.state.settings());
        let submissions_url = format!(
            "/api/v1/homework/{}/assignments/{assignment_id}/submissions",
            seeded.school.id
        );

        let first = test_support::json_request(
            Method::POST,
            &submissions_url,
            Some(&student_token),
            Some(serde_json::json!({"answers": {}})),
        );
        let response = ctx.app.clone().oneshot(first).await.expect("first submit");
        let body = test_support::read_json(response).await;
        assert_eq!(body["score"], 0.0);

        let second = test_support::json_request(
            Method::POST,
            &submissions_url,
            Some(&student_token),
            Some(serde_json::json!({
                "answers": {"q1": "1", "q2": "1/2", "q3": "1", "q4": "1/2", "q5": "1/2"}
            })),
        );
        let response = ctx.app.clone().oneshot(second).await.expect("second submit");
        let body = test_support::read_json(response).await;
        assert_eq!(body["score"], 100.0);

        let list = test_support::json_request(
            Method::GET,
            &submissions_url,
            Some(&faculty_token),
            None,
        );
        let response = ctx.app.clone().oneshot(list).await.expect("list submissions");
        let body = test_support::read_json(response).await;
        assert_eq!(body.as_array().expect("submissions").len(), 1);
    }
}
