//! ROI persistence
//!
//! Functions used inside the legacy transition take a generic executor so
//! the service can run them on a transaction; the rest take the pool.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sites_common::db::{GeometryPoint, Roi, RoiColor, RoiStatus};
use sites_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

const ROI_COLUMNS: &str = "id, instrument_id, roi_name, description, points_json, color_r, color_g, \
     color_b, alpha, thickness, status, is_legacy, legacy_date, legacy_reason, replaced_by_roi_id, \
     timeseries_broken, source_image, auto_generated, processing_enabled, created_at, updated_at";

/// Fields written when a ROI is created
#[derive(Debug, Clone)]
pub struct NewRoi {
    pub instrument_id: i64,
    pub roi_name: String,
    pub description: Option<String>,
    pub points: Vec<GeometryPoint>,
    pub color: RoiColor,
    pub alpha: f64,
    pub thickness: i64,
    pub source_image: Option<String>,
    pub auto_generated: bool,
}

/// In-place changes to an active ROI; `None` leaves the column as is
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoiUpdate {
    pub description: Option<String>,
    pub points: Option<Vec<GeometryPoint>>,
    pub color: Option<RoiColor>,
    pub alpha: Option<f64>,
    pub thickness: Option<i64>,
    pub source_image: Option<String>,
    pub processing_enabled: Option<bool>,
}

fn color_channel(row: &SqliteRow, column: &str) -> Result<u8> {
    let value: i64 = row.get(column);
    u8::try_from(value)
        .map_err(|_| Error::Internal(format!("{} out of range: {}", column, value)))
}

fn roi_from_row(row: &SqliteRow) -> Result<Roi> {
    let points_json: String = row.get("points_json");
    let status: String = row.get("status");
    Ok(Roi {
        id: row.get("id"),
        instrument_id: row.get("instrument_id"),
        roi_name: row.get("roi_name"),
        description: row.get("description"),
        points: serde_json::from_str(&points_json)?,
        color: RoiColor {
            r: color_channel(row, "color_r")?,
            g: color_channel(row, "color_g")?,
            b: color_channel(row, "color_b")?,
        },
        alpha: row.get("alpha"),
        thickness: row.get("thickness"),
        status: status.parse::<RoiStatus>().map_err(Error::Internal)?,
        is_legacy: row.get("is_legacy"),
        legacy_date: row.get("legacy_date"),
        legacy_reason: row.get("legacy_reason"),
        replaced_by_roi_id: row.get("replaced_by_roi_id"),
        timeseries_broken: row.get("timeseries_broken"),
        source_image: row.get("source_image"),
        auto_generated: row.get("auto_generated"),
        processing_enabled: row.get("processing_enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Insert a ROI and return the stored record.
///
/// `(instrument_id, roi_name)` is unique across every row ever written for
/// the instrument, so a racing insert surfaces as a unique violation.
pub async fn insert_roi<'e, E>(executor: E, roi: &NewRoi) -> Result<Roi>
where
    E: Executor<'e, Database = Sqlite>,
{
    let points_json = serde_json::to_string(&roi.points)?;
    let sql = format!(
        r#"
        INSERT INTO instrument_rois (
            instrument_id, roi_name, description, points_json, color_r, color_g, color_b,
            alpha, thickness, source_image, auto_generated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        ROI_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(roi.instrument_id)
        .bind(&roi.roi_name)
        .bind(&roi.description)
        .bind(points_json)
        .bind(i64::from(roi.color.r))
        .bind(i64::from(roi.color.g))
        .bind(i64::from(roi.color.b))
        .bind(roi.alpha)
        .bind(roi.thickness)
        .bind(&roi.source_image)
        .bind(roi.auto_generated)
        .fetch_one(executor)
        .await?;

    roi_from_row(&row)
}

pub async fn get_roi(pool: &SqlitePool, id: i64) -> Result<Option<Roi>> {
    let sql = format!("SELECT {} FROM instrument_rois WHERE id = ?", ROI_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(roi_from_row).transpose()
}

/// ROIs of an instrument; without `include_history` only active, non-legacy rows
pub async fn list_rois_for_instrument(
    pool: &SqlitePool,
    instrument_id: i64,
    include_history: bool,
) -> Result<Vec<Roi>> {
    let filter = if include_history {
        ""
    } else {
        "AND status = 'active' AND is_legacy = 0"
    };
    let sql = format!(
        "SELECT {} FROM instrument_rois WHERE instrument_id = ? {} ORDER BY roi_name, id",
        ROI_COLUMNS, filter
    );
    let rows = sqlx::query(&sql).bind(instrument_id).fetch_all(pool).await?;
    rows.iter().map(roi_from_row).collect()
}

/// Every ROI name ever issued for an instrument, legacy and archived included
pub async fn roi_names_for_instrument<'e, E>(executor: E, instrument_id: i64) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let names: Vec<String> =
        sqlx::query_scalar("SELECT roi_name FROM instrument_rois WHERE instrument_id = ?")
            .bind(instrument_id)
            .fetch_all(executor)
            .await?;
    Ok(names)
}

/// Existence probe used by the creation pre-check
pub async fn roi_name_exists(pool: &SqlitePool, instrument_id: i64, roi_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM instrument_rois WHERE instrument_id = ? AND roi_name = ?)",
    )
    .bind(instrument_id)
    .bind(roi_name)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Apply an in-place update to an active ROI.
///
/// Only matches rows that are still active and not legacy, so a ROI that
/// changed state after the caller loaded it is left alone (0 rows).
/// `break_timeseries` raises the advisory flag; otherwise it is untouched.
pub async fn update_active_roi(
    pool: &SqlitePool,
    id: i64,
    update: &RoiUpdate,
    break_timeseries: bool,
) -> Result<u64> {
    let points_json = update
        .points
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let color = update.color;

    let result = sqlx::query(
        r#"
        UPDATE instrument_rois SET
            description = COALESCE(?, description),
            points_json = COALESCE(?, points_json),
            color_r = COALESCE(?, color_r),
            color_g = COALESCE(?, color_g),
            color_b = COALESCE(?, color_b),
            alpha = COALESCE(?, alpha),
            thickness = COALESCE(?, thickness),
            source_image = COALESCE(?, source_image),
            processing_enabled = COALESCE(?, processing_enabled),
            timeseries_broken = CASE WHEN ? THEN 1 ELSE timeseries_broken END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'active' AND is_legacy = 0
        "#,
    )
    .bind(&update.description)
    .bind(points_json)
    .bind(color.map(|c| i64::from(c.r)))
    .bind(color.map(|c| i64::from(c.g)))
    .bind(color.map(|c| i64::from(c.b)))
    .bind(update.alpha)
    .bind(update.thickness)
    .bind(&update.source_image)
    .bind(update.processing_enabled)
    .bind(break_timeseries)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Flip an active ROI to legacy.
///
/// Guarded on the current state: returns 0 when the ROI is no longer an
/// active, non-legacy record. Being a write, it takes the database write
/// lock when it is the first statement of a transaction.
pub async fn mark_legacy<'e, E>(
    executor: E,
    id: i64,
    reason: &str,
    legacy_date: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE instrument_rois SET
            is_legacy = 1,
            legacy_date = ?,
            legacy_reason = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'active' AND is_legacy = 0
        "#,
    )
    .bind(legacy_date)
    .bind(reason)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Point a legacy ROI at its replacement; only fills an empty link
pub async fn link_replacement<'e, E>(executor: E, id: i64, replacement_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE instrument_rois SET replaced_by_roi_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND is_legacy = 1 AND replaced_by_roi_id IS NULL
        "#,
    )
    .bind(replacement_id)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Soft-remove an active ROI; its name stays reserved
pub async fn archive_roi(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE instrument_rois SET status = 'archived', updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'active' AND is_legacy = 0
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// ROIs whose replacement is `id` (the one-hop-backward lookup)
pub async fn find_replaced_by(pool: &SqlitePool, id: i64) -> Result<Vec<Roi>> {
    let sql = format!(
        "SELECT {} FROM instrument_rois WHERE replaced_by_roi_id = ? ORDER BY legacy_date DESC, id DESC",
        ROI_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(id).fetch_all(pool).await?;
    rows.iter().map(roi_from_row).collect()
}

pub async fn count_rois_for_instrument(pool: &SqlitePool, instrument_id: i64) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM instrument_rois WHERE instrument_id = ?")
            .bind(instrument_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
