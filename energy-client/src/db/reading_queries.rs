use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::Reading;

const READING_COLUMNS: &str = r#"
    id,
    building,
    timestamp,
    voltage_a, voltage_b, voltage_c,
    current_a, current_b, current_c,
    active_power_a, active_power_b, active_power_c, active_power_total,
    reactive_power_a, reactive_power_b, reactive_power_c, reactive_power_total,
    apparent_power_a, apparent_power_b, apparent_power_c, apparent_power_total,
    power_factor_a, power_factor_b, power_factor_c, power_factor_total,
    created_at
"#;

/// Column a history page can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Timestamp,
    Id,
    Building,
}

impl SortField {
    /// Accepts both the camelCase names used by API clients and the column names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "timestamp" => Some(Self::Timestamp),
            "id" => Some(Self::Id),
            "building" => Some(Self::Building),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Timestamp => "timestamp",
            Self::Id => "id",
            Self::Building => "building",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingOrder {
    pub field: SortField,
    pub descending: bool,
}

impl Default for ReadingOrder {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: false,
        }
    }
}

/// Insert a single reading. Fails on a duplicate `id`.
pub async fn insert_reading(pool: &PgPool, r: &Reading) -> Result<()> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("INSERT INTO energy_reading ({READING_COLUMNS}) "));

    builder.push_values(std::iter::once(r), |mut b, r| {
        let c = &r.channels;
        b.push_bind(r.id.clone())
            .push_bind(r.building.clone())
            .push_bind(r.timestamp)
            .push_bind(c.voltage_a)
            .push_bind(c.voltage_b)
            .push_bind(c.voltage_c)
            .push_bind(c.current_a)
            .push_bind(c.current_b)
            .push_bind(c.current_c)
            .push_bind(c.active_power_a)
            .push_bind(c.active_power_b)
            .push_bind(c.active_power_c)
            .push_bind(c.active_power_total)
            .push_bind(c.reactive_power_a)
            .push_bind(c.reactive_power_b)
            .push_bind(c.reactive_power_c)
            .push_bind(c.reactive_power_total)
            .push_bind(c.apparent_power_a)
            .push_bind(c.apparent_power_b)
            .push_bind(c.apparent_power_c)
            .push_bind(c.apparent_power_total)
            .push_bind(c.power_factor_a)
            .push_bind(c.power_factor_b)
            .push_bind(c.power_factor_c)
            .push_bind(c.power_factor_total)
            .push_bind(r.created_at);
    });

    builder.build().execute(pool).await?;
    Ok(())
}

/// Every stored reading, across all buildings.
pub async fn all_readings(pool: &PgPool) -> Result<Vec<Reading>> {
    let rows = sqlx::query_as::<_, Reading>(&format!("SELECT {READING_COLUMNS} FROM energy_reading"))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// All readings of one building, oldest ingestion first.
pub async fn readings_for_building(pool: &PgPool, building: &str) -> Result<Vec<Reading>> {
    let rows = sqlx::query_as::<_, Reading>(&format!(
        r#"
        SELECT {READING_COLUMNS}
        FROM energy_reading
        WHERE building = $1
        ORDER BY created_at
        "#
    ))
    .bind(building)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Readings of one building ingested within `[start, end)`.
pub async fn readings_for_building_between(
    pool: &PgPool,
    building: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<Reading>> {
    let rows = sqlx::query_as::<_, Reading>(&format!(
        r#"
        SELECT {READING_COLUMNS}
        FROM energy_reading
        WHERE building = $1
          AND created_at >= $2
          AND created_at <  $3
        ORDER BY created_at
        "#
    ))
    .bind(building)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One page of history. The ORDER BY column comes from a closed enum, never
/// from caller text.
pub async fn reading_page(pool: &PgPool, order: ReadingOrder, offset: i64, limit: i64) -> Result<Vec<Reading>> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {READING_COLUMNS} FROM energy_reading ORDER BY "));
    builder.push(order.field.column());
    builder.push(if order.descending { " DESC" } else { " ASC" });
    // Tie-break so pages stay stable when the sort column repeats.
    if order.field != SortField::Id {
        builder.push(", id ASC");
    }
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let rows = builder.build_query_as::<Reading>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn reading_by_id(pool: &PgPool, id: &str) -> Result<Option<Reading>> {
    let row = sqlx::query_as::<_, Reading>(&format!("SELECT {READING_COLUMNS} FROM energy_reading WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
