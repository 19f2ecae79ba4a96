use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{School, TeachingAssignment};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OnboardMemberRequest {
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) is_active: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl SchoolResponse {
    pub(crate) fn from_db(school: School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            is_active: school.is_active,
            created_by: school.created_by,
            created_at: format_primitive(school.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeachingAssignmentResponse {
    pub(crate) id: String,
    pub(crate) faculty_id: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) subject: String,
}

impl TeachingAssignmentResponse {
    pub(crate) fn from_db(assignment: TeachingAssignment) -> Self {
        Self {
            id: assignment.id,
            faculty_id: assignment.faculty_id,
            class_name: assignment.class_name,
            section: assignment.section,
            subject: assignment.subject,
        }
    }
}
