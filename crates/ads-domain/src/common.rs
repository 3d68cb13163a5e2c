//! Shared traits and wire helpers for the record-keeping primitives.

use chrono::{DateTime, NaiveDate};
use serde::{de::IgnoredAny, Deserialize, Deserializer};

/// Identifier assigned by the backend to every persisted entity.
pub type EntityId = String;

/// Exposes the backend identifier of a persisted entity.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving numeric amounts.
///
/// Implementors must never return a non-finite value; wire parsing already
/// coerces garbage to zero through [`lenient_amount`].
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Optional free-text description attached to a line item.
pub trait Described {
    fn description(&self) -> Option<&str>;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Reads an amount leniently: numbers and numeric strings are accepted,
/// anything else (null, booleans, garbage text) becomes `0.0`.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawAmount::deserialize(deserializer)?;
    Ok(match raw {
        RawAmount::Number(value) => finite_or_zero(value),
        RawAmount::Text(text) => parse_amount_text(&text),
        RawAmount::Other(_) => 0.0,
    })
}

/// Replaces NaN and infinities with zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Parses user or wire text into an amount, accepting both `1234.5` and the
/// Italian `1.234,50` notation. Unparseable text yields zero.
pub fn parse_amount_text(text: &str) -> f64 {
    let trimmed = text.trim().trim_end_matches('€').trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized
        .parse::<f64>()
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Reads an optional date written either as `YYYY-MM-DD` or as a full
/// RFC 3339 timestamp (the backend stores dates as midnight timestamps).
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_wire_date))
}

/// Parses the date formats the backend emits. Blank or malformed text is `None`.
pub fn parse_wire_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|stamp| stamp.date_naive())
        })
        .or_else(|| {
            trimmed
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Returns the trimmed text when it carries any content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}
