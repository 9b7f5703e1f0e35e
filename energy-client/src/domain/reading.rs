use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Per-phase electrical measurements of one sample.
///
/// Every channel is optional: meters report whatever subset they support.
/// Serialized names follow the monitoring API payload so the public JSON
/// matches what upstream clients already consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Channels {
    #[serde(rename = "tensaoa")]
    pub voltage_a: Option<f64>,
    #[serde(rename = "tensaob")]
    pub voltage_b: Option<f64>,
    #[serde(rename = "tensaoc")]
    pub voltage_c: Option<f64>,
    #[serde(rename = "correntea")]
    pub current_a: Option<f64>,
    #[serde(rename = "correnteb")]
    pub current_b: Option<f64>,
    #[serde(rename = "correntec")]
    pub current_c: Option<f64>,
    #[serde(rename = "potativaa")]
    pub active_power_a: Option<f64>,
    #[serde(rename = "potativab")]
    pub active_power_b: Option<f64>,
    #[serde(rename = "potativac")]
    pub active_power_c: Option<f64>,
    #[serde(rename = "potativatotal")]
    pub active_power_total: Option<f64>,
    #[serde(rename = "potreativaa")]
    pub reactive_power_a: Option<f64>,
    #[serde(rename = "potreativab")]
    pub reactive_power_b: Option<f64>,
    #[serde(rename = "potreativac")]
    pub reactive_power_c: Option<f64>,
    #[serde(rename = "potreativatotal")]
    pub reactive_power_total: Option<f64>,
    #[serde(rename = "potaparentea")]
    pub apparent_power_a: Option<f64>,
    #[serde(rename = "potaparenteb")]
    pub apparent_power_b: Option<f64>,
    #[serde(rename = "potaparentec")]
    pub apparent_power_c: Option<f64>,
    #[serde(rename = "potaparentetotal")]
    pub apparent_power_total: Option<f64>,
    #[serde(rename = "fatorpotenciaa")]
    pub power_factor_a: Option<f64>,
    #[serde(rename = "fatorpotenciab")]
    pub power_factor_b: Option<f64>,
    #[serde(rename = "fatorpotenciac")]
    pub power_factor_c: Option<f64>,
    #[serde(rename = "fatorpotenciatotal")]
    pub power_factor_total: Option<f64>,
}

/// A persisted metering sample.
///
/// `id` is the composite identity (raw upstream id plus building
/// disambiguator). `building` and `created_at` are assigned at ingestion and
/// never taken from the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: String,
    pub building: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub channels: Channels,
    #[serde(rename = "created_at", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A sample as returned by a building's monitoring API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteReading {
    pub id: i64,
    #[serde(deserialize_with = "crate::domain::timestamp::deserialize")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub channels: Channels,
}

impl RemoteReading {
    /// Turn an upstream sample into a storable reading under `id`.
    pub fn into_reading(self, id: String, building: &str, created_at: OffsetDateTime) -> Reading {
        Reading {
            id,
            building: building.to_string(),
            timestamp: self.timestamp,
            channels: self.channels,
            created_at,
        }
    }
}
