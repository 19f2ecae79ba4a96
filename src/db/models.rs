use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{
    AttendanceStatus, HomeworkKind, RegistrationStatus, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) school_id: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct School {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) is_active: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentProfile {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) school_id: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeachingAssignment {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) faculty_id: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) subject: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttendanceRecord {
    pub(crate) id: String,
    pub(crate) student_profile_id: String,
    pub(crate) school_id: String,
    pub(crate) attendance_date: Date,
    pub(crate) subject: Option<String>,
    pub(crate) status: AttendanceStatus,
    pub(crate) marked_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct HomeworkAssignment {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) title: String,
    pub(crate) kind: HomeworkKind,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) questions: Json<serde_json::Value>,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) max_marks: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct HomeworkSubmission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) answers: Json<serde_json::Value>,
    pub(crate) score: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Event {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: PrimitiveDateTime,
    pub(crate) capacity: Option<i32>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct EventRegistration {
    pub(crate) id: String,
    pub(crate) event_id: String,
    pub(crate) user_id: String,
    pub(crate) status: RegistrationStatus,
    pub(crate) registered_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
