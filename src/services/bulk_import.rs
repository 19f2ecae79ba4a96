use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::core::security;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Reported row numbers are spreadsheet line numbers as a human sees them:
/// data index + header row + 1-based counting.
pub(crate) const ROW_NUMBER_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ImportKind {
    Students,
    Faculty,
    AcademicAssignments,
}

impl ImportKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ImportKind::Students => "students",
            ImportKind::Faculty => "faculty",
            ImportKind::AcademicAssignments => "academic_assignments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldFormat {
    Text,
    Email,
    Phone,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) required: bool,
    pub(crate) format: FieldFormat,
}

const STUDENT_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "full_name", label: "Full Name", required: true, format: FieldFormat::Text },
    FieldSpec { key: "email", label: "Email", required: true, format: FieldFormat::Email },
    FieldSpec { key: "phone", label: "Phone", required: false, format: FieldFormat::Phone },
    FieldSpec { key: "class_name", label: "Class", required: true, format: FieldFormat::Text },
    FieldSpec { key: "section", label: "Section", required: true, format: FieldFormat::Text },
];

const FACULTY_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "full_name", label: "Full Name", required: true, format: FieldFormat::Text },
    FieldSpec { key: "email", label: "Email", required: true, format: FieldFormat::Email },
    FieldSpec { key: "phone", label: "Phone", required: false, format: FieldFormat::Phone },
];

const ASSIGNMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "faculty_email",
        label: "Faculty Email",
        required: true,
        format: FieldFormat::Email,
    },
    FieldSpec { key: "class_name", label: "Class", required: true, format: FieldFormat::Text },
    FieldSpec { key: "section", label: "Section", required: true, format: FieldFormat::Text },
    FieldSpec { key: "subject", label: "Subject", required: true, format: FieldFormat::Text },
];

pub(crate) fn field_specs(kind: ImportKind) -> &'static [FieldSpec] {
    match kind {
        ImportKind::Students => STUDENT_FIELDS,
        ImportKind::Faculty => FACULTY_FIELDS,
        ImportKind::AcademicAssignments => ASSIGNMENT_FIELDS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum IssueKind {
    Mapping,
    Row,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImportIssue {
    #[serde(rename = "type")]
    pub(crate) kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) field: Option<String>,
    pub(crate) message: String,
}

/// Validate a column mapping plus parsed rows. An incomplete required-field
/// mapping short-circuits with a single aggregate issue; row-level checks
/// only run once every required field is mapped.
pub(crate) fn validate(
    kind: ImportKind,
    mapping: &HashMap<String, String>,
    rows: &[HashMap<String, String>],
    min_phone_digits: u32,
) -> Vec<ImportIssue> {
    let specs = field_specs(kind);

    let missing: Vec<&str> = specs
        .iter()
        .filter(|spec| spec.required)
        .filter(|spec| {
            mapping.get(spec.key).map(|column| column.trim().is_empty()).unwrap_or(true)
        })
        .map(|spec| spec.label)
        .collect();

    if !missing.is_empty() {
        return vec![ImportIssue {
            kind: IssueKind::Mapping,
            row: None,
            field: None,
            message: format!("Required fields not mapped: {}", missing.join(", ")),
        }];
    }

    let mut issues = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + ROW_NUMBER_OFFSET;

        for spec in specs {
            let Some(column) = mapping.get(spec.key) else {
                continue;
            };

            let value = row.get(column).map(|value| value.trim()).unwrap_or("");

            if value.is_empty() {
                if spec.required {
                    issues.push(ImportIssue {
                        kind: IssueKind::Row,
                        row: Some(row_number),
                        field: Some(spec.key.to_string()),
                        message: format!("{} is required", spec.label),
                    });
                }
                continue;
            }

            match spec.format {
                FieldFormat::Text => {}
                FieldFormat::Email => {
                    if !value.validate_email() {
                        issues.push(ImportIssue {
                            kind: IssueKind::Row,
                            row: Some(row_number),
                            field: Some(spec.key.to_string()),
                            message: format!("{} is not a valid email address", spec.label),
                        });
                    }
                }
                FieldFormat::Phone => {
                    if digit_count(value) < min_phone_digits as usize {
                        issues.push(ImportIssue {
                            kind: IssueKind::Row,
                            row: Some(row_number),
                            field: Some(spec.key.to_string()),
                            message: format!(
                                "{} must contain at least {min_phone_digits} digits",
                                spec.label
                            ),
                        });
                    }
                }
            }
        }
    }

    issues
}

fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

fn mapped_value<'a>(
    row: &'a HashMap<String, String>,
    mapping: &HashMap<String, String>,
    key: &str,
) -> Option<&'a str> {
    let column = mapping.get(key)?;
    row.get(column).map(|value| value.trim()).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) kind: ImportKind,
    pub(crate) created_users: usize,
    pub(crate) created_profiles: usize,
    pub(crate) created_assignments: usize,
}

pub(crate) struct CommitParams<'a> {
    pub(crate) school_id: &'a str,
    pub(crate) kind: ImportKind,
    pub(crate) mapping: &'a HashMap<String, String>,
    pub(crate) rows: &'a [HashMap<String, String>],
    pub(crate) min_phone_digits: u32,
}

/// Persist validated rows in one transaction; any failure rolls the whole
/// batch back. Imported accounts start with an unusable random password and
/// go through the normal reset flow.
pub(crate) async fn commit(
    pool: &sqlx::PgPool,
    params: CommitParams<'_>,
) -> anyhow::Result<ImportSummary> {
    let issues = validate(params.kind, params.mapping, params.rows, params.min_phone_digits);
    if !issues.is_empty() {
        return Err(anyhow!("import has {} unresolved validation issues", issues.len()));
    }

    let now = primitive_now_utc();
    let mut tx = pool.begin().await.context("failed to begin import transaction")?;

    let mut summary = ImportSummary {
        kind: params.kind,
        created_users: 0,
        created_profiles: 0,
        created_assignments: 0,
    };
    let mut seen_emails: HashSet<String> = HashSet::new();

    for (index, row) in params.rows.iter().enumerate() {
        let row_number = index + ROW_NUMBER_OFFSET;

        match params.kind {
            ImportKind::Students | ImportKind::Faculty => {
                let email = mapped_value(row, params.mapping, "email")
                    .ok_or_else(|| anyhow!("row {row_number}: email missing after validation"))?
                    .to_ascii_lowercase();
                let full_name = mapped_value(row, params.mapping, "full_name")
                    .ok_or_else(|| anyhow!("row {row_number}: name missing after validation"))?;
                let phone = mapped_value(row, params.mapping, "phone");

                if !seen_emails.insert(email.clone()) {
                    return Err(anyhow!("row {row_number}: duplicate email {email} in file"));
                }

                let role = if params.kind == ImportKind::Students {
                    UserRole::Student
                } else {
                    UserRole::Faculty
                };

                let hashed_password = security::hash_password(&Uuid::new_v4().to_string())
                    .map_err(|err| anyhow!("row {row_number}: {err}"))?;

                let user = repositories::users::create_in_tx(
                    &mut tx,
                    repositories::users::CreateUser {
                        id: &Uuid::new_v4().to_string(),
                        email: &email,
                        hashed_password,
                        full_name,
                        role,
                        school_id: Some(params.school_id),
                        phone,
                        is_active: true,
                        created_at: now,
                        updated_at: now,
                    },
                )
                .await
                .with_context(|| format!("row {row_number}: failed to create user {email}"))?;
                summary.created_users += 1;

                if params.kind == ImportKind::Students {
                    let class_name =
                        mapped_value(row, params.mapping, "class_name").ok_or_else(|| {
                            anyhow!("row {row_number}: class missing after validation")
                        })?;
                    let section = mapped_value(row, params.mapping, "section").ok_or_else(
                        || anyhow!("row {row_number}: section missing after validation"),
                    )?;

                    repositories::student_profiles::create_in_tx(
                        &mut tx,
                        repositories::student_profiles::CreateProfile {
                            id: &Uuid::new_v4().to_string(),
                            user_id: &user.id,
                            school_id: params.school_id,
                            class_name,
                            section,
                            created_at: now,
                            updated_at: now,
                        },
                    )
                    .await
                    .with_context(|| {
                        format!("row {row_number}: failed to create profile for {email}")
                    })?;
                    summary.created_profiles += 1;
                }
            }
            ImportKind::AcademicAssignments => {
                let faculty_email = mapped_value(row, params.mapping, "faculty_email")
                    .ok_or_else(|| anyhow!("row {row_number}: faculty email missing"))?
                    .to_ascii_lowercase();
                let class_name = mapped_value(row, params.mapping, "class_name")
                    .ok_or_else(|| anyhow!("row {row_number}: class missing"))?;
                let section = mapped_value(row, params.mapping, "section")
                    .ok_or_else(|| anyhow!("row {row_number}: section missing"))?;
                let subject = mapped_value(row, params.mapping, "subject")
                    .ok_or_else(|| anyhow!("row {row_number}: subject missing"))?;

                let faculty_id = sqlx::query_scalar::<_, String>(
                    "SELECT id FROM users WHERE email = $1 AND school_id = $2",
                )
                .bind(&faculty_email)
                .bind(params.school_id)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("row {row_number}: failed to look up faculty"))?
                .ok_or_else(|| {
                    anyhow!("row {row_number}: no faculty with email {faculty_email} in school")
                })?;

                repositories::teaching_assignments::create_in_tx(
                    &mut tx,
                    repositories::teaching_assignments::CreateAssignment {
                        id: &Uuid::new_v4().to_string(),
                        school_id: params.school_id,
                        faculty_id: &faculty_id,
                        class_name,
                        section,
                        subject,
                        created_at: now,
                    },
                )
                .await
                .with_context(|| format!("row {row_number}: failed to record assignment"))?;
                summary.created_assignments += 1;
            }
        }
    }

    tx.commit().await.context("failed to commit import transaction")?;

    metrics::counter!("bulk_import_rows_total", "kind" => params.kind.as_str())
        .increment(params.rows.len() as u64);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    fn full_student_mapping() -> HashMap<String, String> {
        mapping(&[
            ("full_name", "Name"),
            ("email", "Email"),
            ("phone", "Phone"),
            ("class_name", "Class"),
            ("section", "Section"),
        ])
    }

    #[test]
    fn unmapped_required_field_blocks_with_single_mapping_issue() {
        let mapping = mapping(&[("full_name", "Name"), ("email", "Email")]);
        let rows = vec![row(&[("Name", "Avery Lee"), ("Email", "avery@example.com")])];

        let issues = validate(ImportKind::Students, &mapping, &rows, 10);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Mapping);
    }

    #[test]
    fn valid_rows_produce_no_issues() {
        let rows = vec![row(&[
            ("Name", "Avery Lee"),
            ("Email", "avery@example.com"),
            ("Phone", "(555) 123-4567"),
            ("Class", "8"),
            ("Section", "A"),
        ])];

        let issues = validate(ImportKind::Students, &full_student_mapping(), &rows, 10);

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn invalid_email_is_reported_with_spreadsheet_row_number() {
        let rows = vec![row(&[
            ("Name", "Avery Lee"),
            ("Email", "not-an-email"),
            ("Class", "8"),
            ("Section", "A"),
        ])];

        let issues = validate(ImportKind::Students, &full_student_mapping(), &rows, 10);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Row);
        assert_eq!(issues[0].row, Some(2));
        assert_eq!(issues[0].field.as_deref(), Some("email"));
    }

    #[test]
    fn short_phone_fails_and_formatted_phone_passes() {
        let rows = vec![
            row(&[
                ("Name", "Avery Lee"),
                ("Email", "avery@example.com"),
                ("Phone", "123-456-78"),
                ("Class", "8"),
                ("Section", "A"),
            ]),
            row(&[
                ("Name", "Blake Kim"),
                ("Email", "blake@example.com"),
                ("Phone", "(555) 123-4567"),
                ("Class", "8"),
                ("Section", "A"),
            ]),
        ];

        let issues = validate(ImportKind::Students, &full_student_mapping(), &rows, 10);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row, Some(2));
        assert_eq!(issues[0].field.as_deref(), Some("phone"));
    }

    #[test]
    fn missing_required_value_reported_per_row() {
        let rows = vec![
            row(&[
                ("Name", "Avery Lee"),
                ("Email", "avery@example.com"),
                ("Class", "8"),
                ("Section", "A"),
            ]),
            row(&[("Name", ""), ("Email", "blake@example.com"), ("Class", "8"), ("Section", "A")]),
        ];

        let issues = validate(ImportKind::Students, &full_student_mapping(), &rows, 10);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row, Some(3));
        assert_eq!(issues[0].field.as_deref(), Some("full_name"));
    }

    #[test]
    fn optional_empty_phone_is_accepted() {
        let rows = vec![row(&[
            ("Name", "Avery Lee"),
            ("Email", "avery@example.com"),
            ("Phone", ""),
            ("Class", "8"),
            ("Section", "A"),
        ])];

        let issues = validate(ImportKind::Students, &full_student_mapping(), &rows, 10);

        assert!(issues.is_empty());
    }

    #[test]
    fn assignment_kind_validates_faculty_email() {
        let mapping = mapping(&[
            ("faculty_email", "Faculty"),
            ("class_name", "Class"),
            ("section", "Section"),
            ("subject", "Subject"),
        ]);
        let rows = vec![row(&[
            ("Faculty", "bad-email"),
            ("Class", "8"),
            ("Section", "A"),
            ("Subject", "Math"),
        ])];

        let issues = validate(ImportKind::AcademicAssignments, &mapping, &rows, 10);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("faculty_email"));
    }

    #[test]
    fn digit_count_strips_formatting() {
        assert_eq!(digit_count("(555) 123-4567"), 10);
        assert_eq!(digit_count("123-456-78"), 8);
    }
}
