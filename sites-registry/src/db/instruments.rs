//! Instrument persistence

use serde::Deserialize;
use serde_json::{Map, Value};
use sites_common::db::{Instrument, InstrumentType};
use sites_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::classify_parent_delete;

const INSTRUMENT_COLUMNS: &str = "id, platform_id, normalized_name, display_name, instrument_type, \
     type_code, status, specifications, description, viewing_direction, azimuth_degrees, height_m, \
     created_at, updated_at";

/// Fields written when an instrument is created
#[derive(Debug, Clone)]
pub struct NewInstrument {
    pub platform_id: i64,
    pub normalized_name: String,
    pub display_name: String,
    pub instrument_type: InstrumentType,
    pub status: String,
    pub specifications: Map<String, Value>,
    pub description: Option<String>,
    pub viewing_direction: Option<String>,
    pub azimuth_degrees: Option<f64>,
    pub height_m: Option<f64>,
}

/// Non-identity fields an instrument update may touch
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstrumentUpdate {
    pub display_name: Option<String>,
    pub status: Option<String>,
    /// Replaces the whole specifications map when present
    pub specifications: Option<Map<String, Value>>,
    pub description: Option<String>,
    pub viewing_direction: Option<String>,
    pub azimuth_degrees: Option<f64>,
    pub height_m: Option<f64>,
}

fn instrument_from_row(row: &SqliteRow) -> Result<Instrument> {
    let instrument_type: String = row.get("instrument_type");
    let specifications: String = row.get("specifications");
    Ok(Instrument {
        id: row.get("id"),
        platform_id: row.get("platform_id"),
        normalized_name: row.get("normalized_name"),
        display_name: row.get("display_name"),
        instrument_type: instrument_type.parse().map_err(Error::Internal)?,
        type_code: row.get("type_code"),
        status: row.get("status"),
        specifications: serde_json::from_str(&specifications)?,
        description: row.get("description"),
        viewing_direction: row.get("viewing_direction"),
        azimuth_degrees: row.get("azimuth_degrees"),
        height_m: row.get("height_m"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Insert an instrument; the normalized_name uniqueness constraint is authoritative
pub async fn insert_instrument(pool: &SqlitePool, instrument: &NewInstrument) -> Result<Instrument> {
    let specifications = serde_json::to_string(&instrument.specifications)?;

    let id = sqlx::query(
        r#"
        INSERT INTO instruments (
            platform_id, normalized_name, display_name, instrument_type, type_code, status,
            specifications, description, viewing_direction, azimuth_degrees, height_m
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(instrument.platform_id)
    .bind(&instrument.normalized_name)
    .bind(&instrument.display_name)
    .bind(instrument.instrument_type.as_str())
    .bind(instrument.instrument_type.type_code())
    .bind(&instrument.status)
    .bind(specifications)
    .bind(&instrument.description)
    .bind(&instrument.viewing_direction)
    .bind(instrument.azimuth_degrees)
    .bind(instrument.height_m)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_instrument(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("instrument {} vanished after insert", id)))
}

pub async fn get_instrument(pool: &SqlitePool, id: i64) -> Result<Option<Instrument>> {
    let sql = format!("SELECT {} FROM instruments WHERE id = ?", INSTRUMENT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(instrument_from_row).transpose()
}

/// Existence probe used by the creation pre-check
pub async fn name_exists(pool: &SqlitePool, normalized_name: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM instruments WHERE normalized_name = ?)")
            .bind(normalized_name)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

pub async fn list_instruments_for_platform(
    pool: &SqlitePool,
    platform_id: i64,
) -> Result<Vec<Instrument>> {
    let sql = format!(
        "SELECT {} FROM instruments WHERE platform_id = ? ORDER BY normalized_name",
        INSTRUMENT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(platform_id).fetch_all(pool).await?;
    rows.iter().map(instrument_from_row).collect()
}

/// Every instrument name starting with `prefix` (see `platforms::names_with_prefix`)
pub async fn names_with_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT normalized_name FROM instruments WHERE substr(normalized_name, 1, ?) = ?",
    )
    .bind(prefix.chars().count() as i64)
    .bind(prefix)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn update_instrument(pool: &SqlitePool, id: i64, update: &InstrumentUpdate) -> Result<u64> {
    let specifications = update
        .specifications
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE instruments SET
            display_name = COALESCE(?, display_name),
            status = COALESCE(?, status),
            specifications = COALESCE(?, specifications),
            description = COALESCE(?, description),
            viewing_direction = COALESCE(?, viewing_direction),
            azimuth_degrees = COALESCE(?, azimuth_degrees),
            height_m = COALESCE(?, height_m),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.display_name)
    .bind(&update.status)
    .bind(specifications)
    .bind(&update.description)
    .bind(&update.viewing_direction)
    .bind(update.azimuth_degrees)
    .bind(update.height_m)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete an instrument, optionally together with all of its ROIs (any state).
///
/// Both deletes share one transaction so a cascade never leaves orphans.
pub async fn delete_instrument(pool: &SqlitePool, id: i64, cascade_rois: bool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    if cascade_rois {
        sqlx::query("DELETE FROM instrument_rois WHERE instrument_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let result = sqlx::query("DELETE FROM instruments WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| classify_parent_delete(err, &format!("instrument {}", id)))?;

    tx.commit().await?;
    Ok(result.rows_affected())
}
