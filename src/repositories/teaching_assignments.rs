use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::TeachingAssignment;

pub(crate) const COLUMNS: &str =
    "id, school_id, faculty_id, class_name, section, subject, created_at";

pub(crate) async fn list_for_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<TeachingAssignment>, sqlx::Error> {
    sqlx::query_as::<_, TeachingAssignment>(&format!(
        "SELECT {COLUMNS} FROM teaching_assignments
         WHERE school_id = $1
         ORDER BY class_name, section, subject"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateAssignment<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub faculty_id: &'a str,
    pub class_name: &'a str,
    pub section: &'a str,
    pub subject: &'a str,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    params: CreateAssignment<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO teaching_assignments (
            id, school_id, faculty_id, class_name, section, subject, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (school_id, faculty_id, class_name, section, subject) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.faculty_id)
    .bind(params.class_name)
    .bind(params.section)
    .bind(params.subject)
    .bind(params.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
