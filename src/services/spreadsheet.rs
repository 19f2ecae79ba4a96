use std::collections::HashMap;

use anyhow::Context;

use crate::core::time::format_primitive;
use crate::repositories::events::RegistrationWithUser;
use crate::services::bulk_import::{field_specs, ImportKind};

/// Parse CSV text into header-keyed row maps. The first record is the header
/// row; short records leave trailing columns absent rather than failing.
pub(crate) fn parse_rows(
    csv_text: &str,
) -> anyhow::Result<(Vec<String>, Vec<HashMap<String, String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header row")?
        .iter()
        .map(|header| header.to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to parse CSV record {}", index + 1))?;
        let mut row = HashMap::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Header-only CSV template for an import kind, using the human-facing
/// field labels as column names.
pub(crate) fn template_csv(kind: ImportKind) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let labels: Vec<&str> = field_specs(kind).iter().map(|spec| spec.label).collect();
    writer.write_record(&labels).context("failed to write template header")?;
    let bytes =
        writer.into_inner().map_err(|err| anyhow::anyhow!("failed to flush template: {err}"))?;
    String::from_utf8(bytes).context("template is not valid UTF-8")
}

pub(crate) fn registrations_csv(rows: &[RegistrationWithUser]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Full Name", "Email", "Status", "Registered At"])
        .context("failed to write export header")?;

    for row in rows {
        let status = serde_json::to_value(row.status)
            .ok()
            .and_then(|value| value.as_str().map(|s| s.to_string()))
            .unwrap_or_default();
        writer
            .write_record([
                row.full_name.as_str(),
                row.email.as_str(),
                status.as_str(),
                format_primitive(row.registered_at).as_str(),
            ])
            .context("failed to write export row")?;
    }

    let bytes =
        writer.into_inner().map_err(|err| anyhow::anyhow!("failed to flush export: {err}"))?;
    String::from_utf8(bytes).context("export is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::RegistrationStatus;
    use time::macros::datetime;

    #[test]
    fn parse_rows_keys_by_header() {
        let csv_text = "Name,Email\nAvery Lee,avery@example.com\nBlake Kim,blake@example.com\n";

        let (headers, rows) = parse_rows(csv_text).expect("parse");

        assert_eq!(headers, vec!["Name".to_string(), "Email".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], "Avery Lee");
        assert_eq!(rows[1]["Email"], "blake@example.com");
    }

    #[test]
    fn parse_rows_trims_whitespace() {
        let csv_text = "Name,Email\n  Avery Lee , avery@example.com \n";

        let (_, rows) = parse_rows(csv_text).expect("parse");

        assert_eq!(rows[0]["Name"], "Avery Lee");
        assert_eq!(rows[0]["Email"], "avery@example.com");
    }

    #[test]
    fn parse_rows_tolerates_short_records() {
        let csv_text = "Name,Email,Phone\nAvery Lee,avery@example.com\n";

        let (_, rows) = parse_rows(csv_text).expect("parse");

        assert_eq!(rows[0].get("Phone"), None);
    }

    #[test]
    fn template_lists_field_labels() {
        let template = template_csv(ImportKind::Students).expect("template");
        assert!(template.starts_with("Full Name,Email,Phone,Class,Section"));
    }

    #[test]
    fn registrations_csv_includes_rows() {
        let rows = vec![RegistrationWithUser {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            status: RegistrationStatus::Registered,
            registered_at: datetime!(2026-02-10 09:00:00),
            full_name: "Avery Lee".to_string(),
            email: "avery@example.com".to_string(),
        }];

        let out = registrations_csv(&rows).expect("export");

        assert!(out.contains("Avery Lee,avery@example.com,registered,2026-02-10T09:00:00Z"));
    }
}
