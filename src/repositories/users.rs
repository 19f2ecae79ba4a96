use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

pub(crate) const COLUMNS: &str = "\
    id, email, hashed_password, full_name, role, school_id, phone, \
    is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<User>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub hashed_password: String,
    pub full_name: &'a str,
    pub role: UserRole,
    pub school_id: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub is_active: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, email, hashed_password, full_name, role, school_id, phone,
            is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.school_id)
    .bind(params.phone)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, email, hashed_password, full_name, role, school_id, phone,
            is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.school_id)
    .bind(params.phone)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) struct UpdateUser {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub school_id: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub hashed_password: Option<String>,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(pool: &PgPool, id: &str, params: UpdateUser) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            full_name = COALESCE($1, full_name),
            role = COALESCE($2, role),
            school_id = COALESCE($3, school_id),
            phone = COALESCE($4, phone),
            is_active = COALESCE($5, is_active),
            hashed_password = COALESCE($6, hashed_password),
            updated_at = $7
         WHERE id = $8",
    )
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.school_id)
    .bind(params.phone)
    .bind(params.is_active)
    .bind(params.hashed_password)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
