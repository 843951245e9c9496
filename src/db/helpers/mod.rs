use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::models::{DiaperType, FeedingMode, Sex};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn opt_to_u64(value: Option<i64>, field: &str) -> Result<Option<u64>> {
    value.map(|raw| to_u64(raw, field)).transpose()
}

/// Timestamps are stored as whole-second RFC 3339 text ("...T...Z") so
/// SQLite's date functions can bucket them by local calendar date.
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>> {
    match value {
        Some(raw) => parse_date(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_feeding_mode(value: &str) -> Result<FeedingMode> {
    match value {
        "breast" => Ok(FeedingMode::Breast),
        "bottle" => Ok(FeedingMode::Bottle),
        other => Err(anyhow!("unknown feeding mode {other}")),
    }
}

pub fn parse_diaper_type(value: &str) -> Result<DiaperType> {
    match value {
        "pee" => Ok(DiaperType::Pee),
        "poop" => Ok(DiaperType::Poop),
        "both" => Ok(DiaperType::Both),
        other => Err(anyhow!("unknown diaper type {other}")),
    }
}

pub fn parse_sex(value: &str) -> Result<Sex> {
    match value {
        "boy" => Ok(Sex::Boy),
        "girl" => Ok(Sex::Girl),
        other => Err(anyhow!("unknown sex {other}")),
    }
}
