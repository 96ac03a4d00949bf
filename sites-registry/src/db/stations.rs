//! Station persistence

use serde::Deserialize;
use sites_common::db::Station;
use sites_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::classify_parent_delete;

const STATION_COLUMNS: &str = "id, acronym, display_name, description, country, latitude, longitude, \
     elevation_m, status, created_at, updated_at";

/// Fields written when a station is created
#[derive(Debug, Clone)]
pub struct NewStation {
    pub acronym: String,
    pub display_name: String,
    pub description: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_m: Option<f64>,
}

/// Non-identity fields a station update may touch; `None` leaves the column as is
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_m: Option<f64>,
    pub status: Option<String>,
}

fn station_from_row(row: &SqliteRow) -> Station {
    Station {
        id: row.get("id"),
        acronym: row.get("acronym"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        country: row.get("country"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        elevation_m: row.get("elevation_m"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert a station; the acronym column's uniqueness constraint is authoritative
pub async fn insert_station(pool: &SqlitePool, station: &NewStation) -> Result<Station> {
    let id = sqlx::query(
        r#"
        INSERT INTO stations (acronym, display_name, description, country, latitude, longitude, elevation_m)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&station.acronym)
    .bind(&station.display_name)
    .bind(&station.description)
    .bind(&station.country)
    .bind(station.latitude)
    .bind(station.longitude)
    .bind(station.elevation_m)
    .execute(pool)
    .await?
    .last_insert_rowid();

    fetch_station(pool, id).await
}

async fn fetch_station(pool: &SqlitePool, id: i64) -> Result<Station> {
    let sql = format!("SELECT {} FROM stations WHERE id = ?", STATION_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_one(pool).await?;
    Ok(station_from_row(&row))
}

pub async fn get_station(pool: &SqlitePool, id: i64) -> Result<Option<Station>> {
    let sql = format!("SELECT {} FROM stations WHERE id = ?", STATION_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(station_from_row))
}

/// Existence probe used by the creation pre-check
pub async fn acronym_exists(pool: &SqlitePool, acronym: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stations WHERE acronym = ?)")
        .bind(acronym)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn list_stations(pool: &SqlitePool) -> Result<Vec<Station>> {
    let sql = format!("SELECT {} FROM stations ORDER BY acronym", STATION_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(station_from_row).collect())
}

/// Update non-identity fields; returns the number of rows changed
pub async fn update_station(pool: &SqlitePool, id: i64, update: &StationUpdate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE stations SET
            display_name = COALESCE(?, display_name),
            description = COALESCE(?, description),
            country = COALESCE(?, country),
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            elevation_m = COALESCE(?, elevation_m),
            status = COALESCE(?, status),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.display_name)
    .bind(&update.description)
    .bind(&update.country)
    .bind(update.latitude)
    .bind(update.longitude)
    .bind(update.elevation_m)
    .bind(&update.status)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_platforms(pool: &SqlitePool, station_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM platforms WHERE station_id = ?")
        .bind(station_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn delete_station(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM stations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| classify_parent_delete(err, &format!("station {}", id)))?;
    Ok(result.rows_affected())
}
