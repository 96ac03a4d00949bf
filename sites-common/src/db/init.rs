//! Database initialization
//!
//! Creates the registry schema idempotently. Name uniqueness lives here, in
//! the storage layer: every creation path relies on these constraints as the
//! only serialization point between concurrent requests.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// How long a connection waits on the write lock before failing
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas are per connection: set them on the connect options
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table, index, and trigger (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_stations_table(pool).await?;
    create_platforms_table(pool).await?;
    create_instruments_table(pool).await?;
    create_rois_table(pool).await?;
    create_identity_triggers(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            acronym TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            description TEXT,
            country TEXT,
            latitude REAL,
            longitude REAL,
            elevation_m REAL,
            status TEXT NOT NULL DEFAULT 'Active',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_platforms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS platforms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id),
            normalized_name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            platform_type TEXT NOT NULL
                CHECK (platform_type IN ('fixed', 'uav', 'satellite', 'mobile', 'usv', 'uuv')),
            ecosystem_code TEXT NOT NULL,
            mount_type_code TEXT NOT NULL,
            description TEXT,
            latitude REAL,
            longitude REAL,
            platform_height_m REAL,
            status TEXT NOT NULL DEFAULT 'Active',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_platforms_station ON platforms(station_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_instruments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instruments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            platform_id INTEGER NOT NULL REFERENCES platforms(id),
            normalized_name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            instrument_type TEXT NOT NULL,
            type_code TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Active',
            specifications TEXT NOT NULL DEFAULT '{}',
            description TEXT,
            viewing_direction TEXT,
            azimuth_degrees REAL,
            height_m REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_instruments_platform_type ON instruments(platform_id, type_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rois_table(pool: &SqlitePool) -> Result<()> {
    // roi_name is unique per instrument across all history: legacy and
    // archived rows keep their names reserved
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instrument_rois (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            instrument_id INTEGER NOT NULL REFERENCES instruments(id),
            roi_name TEXT NOT NULL,
            description TEXT,
            points_json TEXT NOT NULL,
            color_r INTEGER NOT NULL DEFAULT 255,
            color_g INTEGER NOT NULL DEFAULT 0,
            color_b INTEGER NOT NULL DEFAULT 0,
            alpha REAL NOT NULL DEFAULT 0.3,
            thickness INTEGER NOT NULL DEFAULT 7,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'archived')),
            is_legacy INTEGER NOT NULL DEFAULT 0,
            legacy_date TEXT,
            legacy_reason TEXT,
            replaced_by_roi_id INTEGER REFERENCES instrument_rois(id),
            timeseries_broken INTEGER NOT NULL DEFAULT 0,
            source_image TEXT,
            auto_generated INTEGER NOT NULL DEFAULT 0,
            processing_enabled INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (instrument_id, roi_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_rois_replaced_by ON instrument_rois(replaced_by_roi_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Storage-level guards for identity fields.
///
/// - Station acronyms and normalized names never change once written.
/// - `replaced_by_roi_id` is write-once, keeping the legacy chain acyclic.
async fn create_identity_triggers(pool: &SqlitePool) -> Result<()> {
    let triggers = [
        r#"
        CREATE TRIGGER IF NOT EXISTS stations_acronym_immutable
        BEFORE UPDATE OF acronym ON stations
        WHEN NEW.acronym IS NOT OLD.acronym
        BEGIN
            SELECT RAISE(ABORT, 'station acronym is immutable');
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS platforms_name_immutable
        BEFORE UPDATE OF normalized_name, station_id ON platforms
        WHEN NEW.normalized_name IS NOT OLD.normalized_name
          OR NEW.station_id IS NOT OLD.station_id
        BEGIN
            SELECT RAISE(ABORT, 'platform identity is immutable');
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS instruments_name_immutable
        BEFORE UPDATE OF normalized_name, platform_id ON instruments
        WHEN NEW.normalized_name IS NOT OLD.normalized_name
          OR NEW.platform_id IS NOT OLD.platform_id
        BEGIN
            SELECT RAISE(ABORT, 'instrument identity is immutable');
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS rois_name_immutable
        BEFORE UPDATE OF roi_name, instrument_id ON instrument_rois
        WHEN NEW.roi_name IS NOT OLD.roi_name
          OR NEW.instrument_id IS NOT OLD.instrument_id
        BEGIN
            SELECT RAISE(ABORT, 'ROI identity is immutable');
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS rois_replaced_by_write_once
        BEFORE UPDATE OF replaced_by_roi_id ON instrument_rois
        WHEN OLD.replaced_by_roi_id IS NOT NULL
          AND NEW.replaced_by_roi_id IS NOT OLD.replaced_by_roi_id
        BEGIN
            SELECT RAISE(ABORT, 'replaced_by_roi_id is write-once');
        END
        "#,
    ];

    for sql in triggers {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
