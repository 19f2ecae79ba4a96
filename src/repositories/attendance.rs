use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::AttendanceRecord;
use crate::db::types::AttendanceStatus;

pub(crate) const COLUMNS: &str = "\
    id, student_profile_id, school_id, attendance_date, subject, status, \
    marked_by, created_at";

/// All rows for a school, newest date first. The grouping service relies on
/// this ordering only for display; alerting sorts on its own.
pub(crate) async fn list_for_school(
    pool: &PgPool,
    school_id: &str,
    from: Option<Date>,
    to: Option<Date>,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM student_attendance
         WHERE school_id = $1
           AND ($2::date IS NULL OR attendance_date >= $2)
           AND ($3::date IS NULL OR attendance_date <= $3)
         ORDER BY attendance_date DESC, created_at DESC"
    ))
    .bind(school_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_profile(
    pool: &PgPool,
    school_id: &str,
    student_profile_id: &str,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM student_attendance
         WHERE school_id = $1 AND student_profile_id = $2
         ORDER BY attendance_date DESC"
    ))
    .bind(school_id)
    .bind(student_profile_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct NewSessionRow {
    pub id: String,
    pub student_profile_id: String,
    pub status: AttendanceStatus,
}

pub(crate) struct ReplaceSession<'a> {
    pub school_id: &'a str,
    pub attendance_date: Date,
    pub subject: Option<&'a str>,
    pub marked_by: &'a str,
    pub profile_ids: &'a [String],
    pub rows: Vec<NewSessionRow>,
    pub created_at: PrimitiveDateTime,
}

/// Delete-then-insert for one (date, class/section roster, subject) session.
/// Both steps share a transaction so a save is atomic; repeating a save with
/// the same inputs leaves the same stored row set.
pub(crate) async fn replace_session(
    pool: &PgPool,
    params: ReplaceSession<'_>,
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM student_attendance
         WHERE school_id = $1
           AND attendance_date = $2
           AND subject IS NOT DISTINCT FROM $3
           AND student_profile_id = ANY($4)",
    )
    .bind(params.school_id)
    .bind(params.attendance_date)
    .bind(params.subject)
    .bind(params.profile_ids)
    .execute(&mut *tx)
    .await?;

    let mut inserted = 0usize;
    for row in &params.rows {
        sqlx::query(
            "INSERT INTO student_attendance (
                id, student_profile_id, school_id, attendance_date, subject,
                status, marked_by, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(&row.id)
        .bind(&row.student_profile_id)
        .bind(params.school_id)
        .bind(params.attendance_date)
        .bind(params.subject)
        .bind(row.status)
        .bind(params.marked_by)
        .bind(params.created_at)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }

    tx.commit().await?;

    Ok(inserted)
}
