use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::services::bulk_import::{ImportIssue, ImportKind, ImportSummary};

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRequest {
    pub(crate) kind: ImportKind,
    /// system field key -> CSV column header
    pub(crate) mapping: HashMap<String, String>,
    #[serde(alias = "csvData")]
    pub(crate) csv_data: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportValidateResponse {
    pub(crate) valid: bool,
    pub(crate) total_rows: usize,
    pub(crate) issues: Vec<ImportIssue>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportCommitResponse {
    pub(crate) kind: ImportKind,
    pub(crate) created_users: usize,
    pub(crate) created_profiles: usize,
    pub(crate) created_assignments: usize,
}

impl ImportCommitResponse {
    pub(crate) fn from_summary(summary: ImportSummary) -> Self {
        Self {
            kind: summary.kind,
            created_users: summary.created_users,
            created_profiles: summary.created_profiles,
            created_assignments: summary.created_assignments,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateQuery {
    pub(crate) kind: ImportKind,
}
