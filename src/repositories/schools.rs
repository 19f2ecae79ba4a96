use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::School;

pub(crate) const COLUMNS: &str = "id, name, is_active, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_active(pool: &PgPool) -> Result<Vec<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "SELECT {COLUMNS} FROM schools WHERE is_active ORDER BY name"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateSchool<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub is_active: bool,
    pub created_by: &'a str,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSchool<'_>) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "INSERT INTO schools (id, name, is_active, created_by, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.is_active)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}
