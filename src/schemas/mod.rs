use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub(crate) mod attendance;
pub(crate) mod auth;
pub(crate) mod events;
pub(crate) mod generation;
pub(crate) mod homework;
pub(crate) mod imports;
pub(crate) mod school;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Date::parse(&raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| D::Error::custom(format!("invalid date: {raw}, expected YYYY-MM-DD")))
}

pub(crate) fn deserialize_offset_datetime<'de, D>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|_| D::Error::custom(format!("invalid timestamp: {raw}, expected RFC 3339")))
}
