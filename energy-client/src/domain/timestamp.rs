use serde::{Deserialize, Deserializer};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, PrimitiveDateTime};

/// Parse a monitoring API timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T10:15:00Z`, `2024-05-01T10:15:00-03:00`) and
/// the naive form the upstream API emits when it has no zone configured
/// (`2024-05-01T10:15:00`, optionally with fractional seconds). Naive values
/// are taken as UTC.
pub fn parse_lenient(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
        .map(PrimitiveDateTime::assume_utc)
    })
}

/// `deserialize_with` adapter for [`parse_lenient`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lenient(&raw).map_err(serde::de::Error::custom)
}
