//! Platform persistence

use serde::Deserialize;
use sites_common::db::{Platform, PlatformType};
use sites_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::classify_parent_delete;

const PLATFORM_COLUMNS: &str = "id, station_id, normalized_name, display_name, platform_type, \
     ecosystem_code, mount_type_code, description, latitude, longitude, platform_height_m, status, \
     created_at, updated_at";

/// Fields written when a platform is created
#[derive(Debug, Clone)]
pub struct NewPlatform {
    pub station_id: i64,
    pub normalized_name: String,
    pub display_name: String,
    pub platform_type: PlatformType,
    pub ecosystem_code: String,
    pub mount_type_code: String,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub platform_height_m: Option<f64>,
}

/// Non-identity fields a platform update may touch
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub platform_height_m: Option<f64>,
    pub status: Option<String>,
}

fn platform_from_row(row: &SqliteRow) -> Result<Platform> {
    let platform_type: String = row.get("platform_type");
    Ok(Platform {
        id: row.get("id"),
        station_id: row.get("station_id"),
        normalized_name: row.get("normalized_name"),
        display_name: row.get("display_name"),
        platform_type: platform_type.parse().map_err(Error::Internal)?,
        ecosystem_code: row.get("ecosystem_code"),
        mount_type_code: row.get("mount_type_code"),
        description: row.get("description"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        platform_height_m: row.get("platform_height_m"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Insert a platform; the normalized_name uniqueness constraint is authoritative
pub async fn insert_platform(pool: &SqlitePool, platform: &NewPlatform) -> Result<Platform> {
    let id = sqlx::query(
        r#"
        INSERT INTO platforms (
            station_id, normalized_name, display_name, platform_type, ecosystem_code,
            mount_type_code, description, latitude, longitude, platform_height_m
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(platform.station_id)
    .bind(&platform.normalized_name)
    .bind(&platform.display_name)
    .bind(platform.platform_type.as_str())
    .bind(&platform.ecosystem_code)
    .bind(&platform.mount_type_code)
    .bind(&platform.description)
    .bind(platform.latitude)
    .bind(platform.longitude)
    .bind(platform.platform_height_m)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_platform(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("platform {} vanished after insert", id)))
}

pub async fn get_platform(pool: &SqlitePool, id: i64) -> Result<Option<Platform>> {
    let sql = format!("SELECT {} FROM platforms WHERE id = ?", PLATFORM_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(platform_from_row).transpose()
}

/// Existence probe used by the creation pre-check
pub async fn name_exists(pool: &SqlitePool, normalized_name: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM platforms WHERE normalized_name = ?)")
            .bind(normalized_name)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

pub async fn list_platforms_for_station(pool: &SqlitePool, station_id: i64) -> Result<Vec<Platform>> {
    let sql = format!(
        "SELECT {} FROM platforms WHERE station_id = ? ORDER BY normalized_name",
        PLATFORM_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(station_id).fetch_all(pool).await?;
    rows.iter().map(platform_from_row).collect()
}

/// Every platform name starting with `prefix`.
///
/// Scans the whole unique column rather than one station so explicitly
/// named platforms inside the scope are seen too. `substr` is used instead of
/// `LIKE` because `_` is a `LIKE` wildcard.
pub async fn names_with_prefix(pool: &SqlitePool, prefix: &str) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT normalized_name FROM platforms WHERE substr(normalized_name, 1, ?) = ?",
    )
    .bind(prefix.chars().count() as i64)
    .bind(prefix)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn update_platform(pool: &SqlitePool, id: i64, update: &PlatformUpdate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE platforms SET
            display_name = COALESCE(?, display_name),
            description = COALESCE(?, description),
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            platform_height_m = COALESCE(?, platform_height_m),
            status = COALESCE(?, status),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.display_name)
    .bind(&update.description)
    .bind(update.latitude)
    .bind(update.longitude)
    .bind(update.platform_height_m)
    .bind(&update.status)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_instruments(pool: &SqlitePool, platform_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instruments WHERE platform_id = ?")
        .bind(platform_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn delete_platform(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM platforms WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| classify_parent_delete(err, &format!("platform {}", id)))?;
    Ok(result.rows_affected())
}
