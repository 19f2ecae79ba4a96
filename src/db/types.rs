use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "userrole", rename_all = "snake_case")]
pub(crate) enum UserRole {
    SuperAdmin,
    CoAdmin,
    Faculty,
    Student,
    Parent,
    Counselor,
    B2cStudent,
    B2cMentor,
}

impl UserRole {
    /// Roles allowed to administer a school's data.
    pub(crate) fn is_school_admin(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::CoAdmin)
    }

    pub(crate) fn can_mark_attendance(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::CoAdmin | UserRole::Faculty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attendancestatus", rename_all = "lowercase")]
pub(crate) enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "homeworkkind", rename_all = "lowercase")]
pub(crate) enum HomeworkKind {
    Mcq,
    Viva,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "registrationstatus", rename_all = "lowercase")]
pub(crate) enum RegistrationStatus {
    Registered,
    Cancelled,
    Attended,
    Waitlisted,
}
