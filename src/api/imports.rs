use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_school_admin, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::imports::{
    ImportCommitResponse, ImportRequest, ImportValidateResponse, TemplateQuery,
};
use crate::services::{bulk_import, spreadsheet};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/template", get(template))
        .route("/:school_id/validate", post(validate))
        .route("/:school_id/commit", post(commit))
}

async fn template(
    Query(params): Query<TemplateQuery>,
    CurrentUser(_user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let csv = spreadsheet::template_csv(params.kind)
        .map_err(|e| ApiError::internal(e, "Failed to build import template"))?;

    let filename = format!("{}-template.csv", params.kind.as_str());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        csv,
    ))
}

async fn validate(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportValidateResponse>, ApiError> {
    require_school_admin(&user, &school_id)?;

    let rows = parse_rows(&state, &payload.csv_data)?;
    let issues = bulk_import::validate(
        payload.kind,
        &payload.mapping,
        &rows,
        state.settings().import().min_phone_digits,
    );

    Ok(Json(ImportValidateResponse {
        valid: issues.is_empty(),
        total_rows: rows.len(),
        issues,
    }))
}

/// Commit a previously validated import. Any remaining validation issue
/// blocks the commit; persistence is all-or-nothing.
async fn commit(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ImportCommitResponse>), ApiError> {
    require_school_admin(&user, &school_id)?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    if school.is_none() {
        return Err(ApiError::NotFound("School not found".to_string()));
    }

    let rows = parse_rows(&state, &payload.csv_data)?;
    let min_phone_digits = state.settings().import().min_phone_digits;

    let issues = bulk_import::validate(payload.kind, &payload.mapping, &rows, min_phone_digits);
    if !issues.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Import blocked by {} validation issue(s); validate first",
            issues.len()
        )));
    }

    let summary = bulk_import::commit(
        state.db(),
        bulk_import::CommitParams {
            school_id: &school_id,
            kind: payload.kind,
            mapping: &payload.mapping,
            rows: &rows,
            min_phone_digits,
        },
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, school_id, "Bulk import failed");
        ApiError::BadRequest(format!("Import failed: {e}"))
    })?;

    tracing::info!(
        school_id,
        kind = summary.kind.as_str(),
        created_users = summary.created_users,
        created_profiles = summary.created_profiles,
        created_assignments = summary.created_assignments,
        "Bulk import committed"
    );

    Ok((StatusCode::CREATED, Json(ImportCommitResponse::from_summary(summary))))
}

fn parse_rows(
    state: &AppState,
    csv_data: &str,
) -> Result<Vec<std::collections::HashMap<String, String>>, ApiError> {
    let (_, rows) = spreadsheet::parse_rows(csv_data)
        .map_err(|e| ApiError::BadRequest(format!("Could not parse CSV: {e}")))?;

    let max_rows = state.settings().import().max_rows as usize;
    if rows.len() > max_rows {
        return Err(ApiError::BadRequest(format!(
            "Import exceeds the {max_rows} row limit"
        )));
    }

    Ok(rows)
}
