use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::StudentProfile;

pub(crate) const COLUMNS: &str =
    "id, user_id, school_id, class_name, section, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {COLUMNS} FROM student_profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {COLUMNS} FROM student_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {COLUMNS} FROM student_profiles WHERE school_id = $1
         ORDER BY class_name, section"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_class_section(
    pool: &PgPool,
    school_id: &str,
    class_name: &str,
    section: &str,
) -> Result<Vec<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {COLUMNS} FROM student_profiles
         WHERE school_id = $1 AND class_name = $2 AND section = $3"
    ))
    .bind(school_id)
    .bind(class_name)
    .bind(section)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateProfile<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub school_id: &'a str,
    pub class_name: &'a str,
    pub section: &'a str,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateProfile<'_>,
) -> Result<StudentProfile, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "INSERT INTO student_profiles (
            id, user_id, school_id, class_name, section, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.school_id)
    .bind(params.class_name)
    .bind(params.section)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    params: CreateProfile<'_>,
) -> Result<StudentProfile, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "INSERT INTO student_profiles (
            id, user_id, school_id, class_name, section, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.school_id)
    .bind(params.class_name)
    .bind(params.section)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(&mut **tx)
    .await
}
