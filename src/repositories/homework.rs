use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{HomeworkAssignment, HomeworkSubmission};
use crate::db::types::HomeworkKind;

pub(crate) const ASSIGNMENT_COLUMNS: &str = "\
    id, school_id, title, kind, class_name, section, questions, deadline, \
    max_marks, created_by, created_at, updated_at";

pub(crate) const SUBMISSION_COLUMNS: &str = "\
    id, assignment_id, student_id, answers, score, marks_obtained, \
    submitted_at, created_at, updated_at";

pub(crate) async fn find_assignment(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<HomeworkAssignment>, sqlx::Error> {
    sqlx::query_as::<_, HomeworkAssignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM homework_assignments
         WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_assignments(
    pool: &PgPool,
    school_id: &str,
    class_name: Option<&str>,
    section: Option<&str>,
) -> Result<Vec<HomeworkAssignment>, sqlx::Error> {
    sqlx::query_as::<_, HomeworkAssignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM homework_assignments
         WHERE school_id = $1
           AND ($2::text IS NULL OR class_name = $2)
           AND ($3::text IS NULL OR section = $3)
         ORDER BY deadline DESC"
    ))
    .bind(school_id)
    .bind(class_name)
    .bind(section)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateAssignment<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub title: &'a str,
    pub kind: HomeworkKind,
    pub class_name: &'a str,
    pub section: &'a str,
    pub questions: serde_json::Value,
    pub deadline: PrimitiveDateTime,
    pub max_marks: f64,
    pub created_by: &'a str,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create_assignment(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<HomeworkAssignment, sqlx::Error> {
    sqlx::query_as::<_, HomeworkAssignment>(&format!(
        "INSERT INTO homework_assignments (
            id, school_id, title, kind, class_name, section, questions,
            deadline, max_marks, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {ASSIGNMENT_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.title)
    .bind(params.kind)
    .bind(params.class_name)
    .bind(params.section)
    .bind(Json(params.questions))
    .bind(params.deadline)
    .bind(params.max_marks)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpsertSubmission<'a> {
    pub id: &'a str,
    pub assignment_id: &'a str,
    pub student_id: &'a str,
    pub answers: serde_json::Value,
    pub score: f64,
    pub marks_obtained: f64,
    pub submitted_at: PrimitiveDateTime,
    pub now: PrimitiveDateTime,
}

/// Re-submission replaces the previous answers and scores in place.
pub(crate) async fn upsert_submission(
    pool: &PgPool,
    params: UpsertSubmission<'_>,
) -> Result<HomeworkSubmission, sqlx::Error> {
    sqlx::query_as::<_, HomeworkSubmission>(&format!(
        "INSERT INTO homework_submissions (
            id, assignment_id, student_id, answers, score, marks_obtained,
            submitted_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        ON CONFLICT (assignment_id, student_id) DO UPDATE SET
            answers = EXCLUDED.answers,
            score = EXCLUDED.score,
            marks_obtained = EXCLUDED.marks_obtained,
            submitted_at = EXCLUDED.submitted_at,
            updated_at = EXCLUDED.updated_at
        RETURNING {SUBMISSION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.student_id)
    .bind(Json(params.answers))
    .bind(params.score)
    .bind(params.marks_obtained)
    .bind(params.submitted_at)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_submissions(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<HomeworkSubmission>, sqlx::Error> {
    sqlx::query_as::<_, HomeworkSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM homework_submissions
         WHERE assignment_id = $1
         ORDER BY submitted_at DESC"
    ))
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_submission(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<Option<HomeworkSubmission>, sqlx::Error> {
    sqlx::query_as::<_, HomeworkSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM homework_submissions
         WHERE assignment_id = $1 AND student_id = $2"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
