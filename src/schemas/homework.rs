use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{HomeworkAssignment, HomeworkSubmission};
use crate::db::types::HomeworkKind;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    pub(crate) kind: HomeworkKind,
    #[serde(alias = "className")]
    #[validate(length(min = 1, message = "class_name must not be empty"))]
    pub(crate) class_name: String,
    #[validate(length(min = 1, message = "section must not be empty"))]
    pub(crate) section: String,
    pub(crate) questions: serde_json::Value,
    #[serde(deserialize_with = "crate::schemas::deserialize_offset_datetime")]
    pub(crate) deadline: OffsetDateTime,
    #[serde(alias = "maxMarks")]
    #[validate(range(exclusive_min = 0.0, message = "max_marks must be positive"))]
    pub(crate) max_marks: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentsQuery {
    #[serde(default)]
    #[serde(alias = "className")]
    pub(crate) class_name: Option<String>,
    #[serde(default)]
    pub(crate) section: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) title: String,
    pub(crate) kind: HomeworkKind,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) questions: serde_json::Value,
    pub(crate) deadline: String,
    pub(crate) max_marks: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: HomeworkAssignment) -> Self {
        Self {
            id: assignment.id,
            school_id: assignment.school_id,
            title: assignment.title,
            kind: assignment.kind,
            class_name: assignment.class_name,
            section: assignment.section,
            questions: assignment.questions.0,
            deadline: format_primitive(assignment.deadline),
            max_marks: assignment.max_marks,
            created_by: assignment.created_by,
            created_at: format_primitive(assignment.created_at),
        }
    }

    /// Student-facing view: answer keys stay on the server.
    pub(crate) fn from_db_redacted(assignment: HomeworkAssignment) -> Self {
        let mut response = Self::from_db(assignment);
        if let Some(questions) = response.questions.as_array_mut() {
            for question in questions {
                if let Some(object) = question.as_object_mut() {
                    object.remove("correct_answer");
                    object.remove("correctAnswer");
                }
            }
        }
        response
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionCreate {
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) answers: serde_json::Value,
    pub(crate) score: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) submitted_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: HomeworkSubmission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            answers: submission.answers.0,
            score: submission.score,
            marks_obtained: submission.marks_obtained,
            submitted_at: format_primitive(submission.submitted_at),
        }
    }
}
