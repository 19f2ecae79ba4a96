use std::collections::HashMap;

use time::{Date, Duration};

use crate::db::models::{AttendanceRecord, StudentProfile};
use crate::db::types::AttendanceStatus;

/// Rows stored without a subject belong to the catch-all session.
pub(crate) const DEFAULT_SUBJECT: &str = "general";

/// Which marker a session reports when several faculty rows share one
/// session key. `EarliestWins` mirrors the historical behavior; the policy
/// is named so it can be swapped without touching the grouping loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerPolicy {
    EarliestWins,
    LatestWins,
}

/// One unit of attendance-taking: a (date, class, section, subject) group
/// reconstructed from flat rows. Derived on every fetch, never persisted.
#[derive(Debug, Clone)]
pub(crate) struct AttendanceSession {
    pub(crate) date: Date,
    pub(crate) class_name: String,
    pub(crate) section: String,
    pub(crate) subject: String,
    /// user_id -> status for every student seen in the session.
    pub(crate) records: HashMap<String, AttendanceStatus>,
    pub(crate) marked_by: String,
}

impl AttendanceSession {
    pub(crate) fn key(&self) -> String {
        session_key(self.date, &self.class_name, &self.section, &self.subject)
    }
}

fn session_key(date: Date, class_name: &str, section: &str, subject: &str) -> String {
    // Subjects are matched by exact string equality; no case or whitespace
    // normalization, so "Math" and "math" form distinct sessions.
    format!("{date}|{class_name}|{section}|{subject}")
}

/// Group flat attendance rows into sessions.
///
/// Rows whose profile cannot be resolved are dropped: they reference a
/// student this school no longer knows about and must not surface in any
/// session. Output order is first-sight order of each session key, so a
/// date-descending input yields date-descending sessions.
pub(crate) fn group_sessions(
    rows: &[AttendanceRecord],
    profiles: &[StudentProfile],
    policy: MarkerPolicy,
) -> Vec<AttendanceSession> {
    let profile_index: HashMap<&str, &StudentProfile> =
        profiles.iter().map(|profile| (profile.id.as_str(), profile)).collect();

    let mut sessions: Vec<AttendanceSession> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(profile) = profile_index.get(row.student_profile_id.as_str()) else {
            dropped += 1;
            continue;
        };

        let subject = row.subject.as_deref().unwrap_or(DEFAULT_SUBJECT);
        let key = session_key(row.attendance_date, &profile.class_name, &profile.section, subject);

        let index = match by_key.get(&key) {
            Some(index) => *index,
            None => {
                sessions.push(AttendanceSession {
                    date: row.attendance_date,
                    class_name: profile.class_name.clone(),
                    section: profile.section.clone(),
                    subject: subject.to_string(),
                    records: HashMap::new(),
                    marked_by: row.marked_by.clone(),
                });
                by_key.insert(key, sessions.len() - 1);
                sessions.len() - 1
            }
        };

        let session = &mut sessions[index];
        if policy == MarkerPolicy::LatestWins {
            session.marked_by = row.marked_by.clone();
        }
        session.records.insert(profile.user_id.clone(), row.status);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Skipped attendance rows with unresolved student profiles");
    }

    sessions
}

#[derive(Debug, Clone)]
pub(crate) struct StudentRef {
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) class_name: String,
    pub(crate) section: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AbsenteeAlert {
    pub(crate) student: StudentRef,
    pub(crate) absent_days: usize,
    pub(crate) last_absent: Date,
}

/// Flag students absent at least `threshold` times within the trailing
/// window `[today - window_days, today]`, both ends inclusive.
///
/// Matching dates are sorted here rather than inherited from the caller, so
/// `last_absent` stays correct for any input order.
pub(crate) fn absentee_alerts(
    sessions: &[AttendanceSession],
    students: &[StudentRef],
    today: Date,
    window_days: i64,
    threshold: u32,
) -> Vec<AbsenteeAlert> {
    let window_start = today - Duration::days(window_days);

    let mut alerts = Vec::new();

    for student in students {
        let mut absent_dates: Vec<Date> = sessions
            .iter()
            .filter(|session| {
                session.date >= window_start
                    && session.date <= today
                    && session.records.get(&student.user_id) == Some(&AttendanceStatus::Absent)
            })
            .map(|session| session.date)
            .collect();

        if absent_dates.len() >= threshold as usize {
            absent_dates.sort();
            alerts.push(AbsenteeAlert {
                student: student.clone(),
                absent_days: absent_dates.len(),
                last_absent: *absent_dates.last().expect("non-empty after threshold check"),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::{PrimitiveDateTime, Time};

    fn ts(date: Date) -> PrimitiveDateTime {
        PrimitiveDateTime::new(date, Time::MIDNIGHT)
    }

    fn profile(id: &str, user_id: &str, class_name: &str, section: &str) -> StudentProfile {
        StudentProfile {
            id: id.to_string(),
            user_id: user_id.to_string(),
            school_id: "school-1".to_string(),
            class_name: class_name.to_string(),
            section: section.to_string(),
            created_at: ts(date!(2026 - 01 - 01)),
            updated_at: ts(date!(2026 - 01 - 01)),
        }
    }

    fn row(
        id: &str,
        profile_id: &str,
        day: Date,
        subject: Option<&str>,
        status: AttendanceStatus,
        marked_by: &str,
    ) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            student_profile_id: profile_id.to_string(),
            school_id: "school-1".to_string(),
            attendance_date: day,
            subject: subject.map(|s| s.to_string()),
            status,
            marked_by: marked_by.to_string(),
            created_at: ts(day),
        }
    }

    fn student(user_id: &str) -> StudentRef {
        StudentRef {
            user_id: user_id.to_string(),
            full_name: format!("Student {user_id}"),
            class_name: "8".to_string(),
            section: "A".to_string(),
        }
    }

    #[test]
    fn rows_with_same_key_share_one_session() {
        let profiles = vec![profile("p1", "u1", "8", "A"), profile("p2", "u2", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![
            row("r1", "p1", day, Some("math"), AttendanceStatus::Present, "f1"),
            row("r2", "p2", day, Some("math"), AttendanceStatus::Absent, "f1"),
        ];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].records.len(), 2);
        assert_eq!(sessions[0].records["u1"], AttendanceStatus::Present);
        assert_eq!(sessions[0].records["u2"], AttendanceStatus::Absent);
    }

    #[test]
    fn later_row_for_same_student_wins() {
        let profiles = vec![profile("p1", "u1", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![
            row("r1", "p1", day, Some("math"), AttendanceStatus::Present, "f1"),
            row("r2", "p1", day, Some("math"), AttendanceStatus::Late, "f1"),
        ];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].records["u1"], AttendanceStatus::Late);
    }

    #[test]
    fn missing_subject_falls_back_to_general() {
        let profiles = vec![profile("p1", "u1", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![row("r1", "p1", day, None, AttendanceStatus::Present, "f1")];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        assert_eq!(sessions[0].subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn subject_casing_creates_distinct_sessions() {
        let profiles = vec![profile("p1", "u1", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![
            row("r1", "p1", day, Some("Math"), AttendanceStatus::Present, "f1"),
            row("r2", "p1", day, Some("math"), AttendanceStatus::Present, "f1"),
        ];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn orphaned_rows_are_dropped_without_error() {
        let profiles = vec![profile("p1", "u1", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![
            row("r1", "p1", day, Some("math"), AttendanceStatus::Present, "f1"),
            row("r2", "p-gone", day, Some("math"), AttendanceStatus::Absent, "f1"),
        ];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].records.len(), 1);
        assert!(sessions[0].records.contains_key("u1"));
    }

    #[test]
    fn earliest_marker_wins_by_default() {
        let profiles = vec![profile("p1", "u1", "8", "A"), profile("p2", "u2", "8", "A")];
        let day = date!(2026 - 02 - 10);
        let rows = vec![
            row("r1", "p1", day, Some("math"), AttendanceStatus::Present, "faculty-early"),
            row("r2", "p2", day, Some("math"), AttendanceStatus::Present, "faculty-late"),
        ];

        let earliest = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);
        assert_eq!(earliest[0].marked_by, "faculty-early");

        let latest = group_sessions(&rows, &profiles, MarkerPolicy::LatestWins);
        assert_eq!(latest[0].marked_by, "faculty-late");
    }

    #[test]
    fn sessions_preserve_first_sight_order() {
        let profiles = vec![profile("p1", "u1", "8", "A")];
        let rows = vec![
            row("r1", "p1", date!(2026 - 02 - 12), Some("math"), AttendanceStatus::Present, "f1"),
            row("r2", "p1", date!(2026 - 02 - 11), Some("math"), AttendanceStatus::Present, "f1"),
            row("r3", "p1", date!(2026 - 02 - 10), Some("math"), AttendanceStatus::Present, "f1"),
        ];

        let sessions = group_sessions(&rows, &profiles, MarkerPolicy::EarliestWins);

        let dates: Vec<Date> = sessions.iter().map(|session| session.date).collect();
        assert_eq!(
            dates,
            vec![date!(2026 - 02 - 12), date!(2026 - 02 - 11), date!(2026 - 02 - 10)]
        );
    }

    fn absent_session(day: Date, user_id: &str) -> AttendanceSession {
        let mut records = HashMap::new();
        records.insert(user_id.to_string(), AttendanceStatus::Absent);
        AttendanceSession {
            date: day,
            class_name: "8".to_string(),
            section: "A".to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            records,
            marked_by: "f1".to_string(),
        }
    }

    #[test]
    fn three_absences_in_window_trigger_alert() {
        let today = date!(2026 - 02 - 10);
        let sessions = vec![
            absent_session(today, "u1"),
            absent_session(date!(2026 - 02 - 09), "u1"),
            absent_session(date!(2026 - 02 - 07), "u1"),
        ];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].absent_days, 3);
        assert_eq!(alerts[0].last_absent, today);
    }

    #[test]
    fn two_absences_do_not_trigger_alert() {
        let today = date!(2026 - 02 - 10);
        let sessions =
            vec![absent_session(today, "u1"), absent_session(date!(2026 - 02 - 09), "u1")];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert!(alerts.is_empty());
    }

    #[test]
    fn absences_outside_window_are_ignored() {
        let today = date!(2026 - 02 - 10);
        let sessions = vec![
            absent_session(today, "u1"),
            absent_session(date!(2026 - 02 - 09), "u1"),
            // One day past the inclusive window edge.
            absent_session(date!(2026 - 02 - 06), "u1"),
        ];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert!(alerts.is_empty());
    }

    #[test]
    fn window_edge_is_inclusive() {
        let today = date!(2026 - 02 - 10);
        let sessions = vec![
            absent_session(today, "u1"),
            absent_session(date!(2026 - 02 - 09), "u1"),
            absent_session(date!(2026 - 02 - 07), "u1"),
        ];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn last_absent_is_order_independent() {
        let today = date!(2026 - 02 - 10);
        // Oldest first: the alert must still report the newest date.
        let sessions = vec![
            absent_session(date!(2026 - 02 - 08), "u1"),
            absent_session(today, "u1"),
            absent_session(date!(2026 - 02 - 09), "u1"),
        ];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert_eq!(alerts[0].last_absent, today);
    }

    #[test]
    fn present_students_are_not_flagged() {
        let today = date!(2026 - 02 - 10);
        let mut records = HashMap::new();
        records.insert("u1".to_string(), AttendanceStatus::Present);
        let sessions = vec![AttendanceSession {
            date: today,
            class_name: "8".to_string(),
            section: "A".to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            records,
            marked_by: "f1".to_string(),
        }];

        let alerts = absentee_alerts(&sessions, &[student("u1")], today, 3, 3);

        assert!(alerts.is_empty());
    }
}
