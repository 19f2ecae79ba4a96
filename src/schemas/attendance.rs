use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::db::models::AttendanceRecord;
use crate::db::types::AttendanceStatus;
use crate::services::attendance::{AbsenteeAlert, AttendanceSession};

#[derive(Debug, Deserialize)]
pub(crate) struct SessionsQuery {
    #[serde(default)]
    pub(crate) from: Option<String>,
    #[serde(default)]
    pub(crate) to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttendanceEntry {
    #[serde(alias = "studentProfileId")]
    pub(crate) student_profile_id: String,
    pub(crate) status: AttendanceStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAttendanceRequest {
    #[serde(deserialize_with = "crate::schemas::deserialize_date")]
    pub(crate) date: Date,
    #[serde(alias = "className")]
    #[validate(length(min = 1, message = "class_name must not be empty"))]
    pub(crate) class_name: String,
    #[validate(length(min = 1, message = "section must not be empty"))]
    pub(crate) section: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAttendanceResponse {
    pub(crate) saved_rows: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) date: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) subject: String,
    pub(crate) marked_by: String,
    pub(crate) marked_by_name: Option<String>,
    pub(crate) records: HashMap<String, AttendanceStatus>,
}

impl SessionResponse {
    pub(crate) fn from_session(
        session: AttendanceSession,
        marker_names: &HashMap<String, String>,
    ) -> Self {
        let marked_by_name = marker_names.get(&session.marked_by).cloned();
        Self {
            date: session.date.to_string(),
            class_name: session.class_name,
            section: session.section,
            subject: session.subject,
            marked_by: session.marked_by,
            marked_by_name,
            records: session.records,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AbsenteeAlertResponse {
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) absent_days: usize,
    pub(crate) last_absent: String,
}

impl AbsenteeAlertResponse {
    pub(crate) fn from_alert(alert: AbsenteeAlert) -> Self {
        Self {
            user_id: alert.student.user_id,
            full_name: alert.student.full_name,
            class_name: alert.student.class_name,
            section: alert.student.section,
            absent_days: alert.absent_days,
            last_absent: alert.last_absent.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryEntryResponse {
    pub(crate) id: String,
    pub(crate) date: String,
    pub(crate) subject: Option<String>,
    pub(crate) status: AttendanceStatus,
    pub(crate) marked_by: String,
}

impl HistoryEntryResponse {
    pub(crate) fn from_db(record: AttendanceRecord) -> Self {
        Self {
            id: record.id,
            date: record.attendance_date.to_string(),
            subject: record.subject,
            status: record.status,
            marked_by: record.marked_by,
        }
    }
}
