use time::macros::format_description;
use time::Date;
use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(ApiError::from)
}

pub(crate) fn parse_date_param(field: &str, raw: &str) -> Result<Date, ApiError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parse_date_param_accepts_iso_dates() {
        assert_eq!(parse_date_param("from", "2026-02-10").unwrap(), date!(2026 - 02 - 10));
    }

    #[test]
    fn parse_date_param_rejects_garbage() {
        assert!(parse_date_param("from", "02/10/2026").is_err());
        assert!(parse_date_param("from", "not-a-date").is_err());
    }
}
