//! Test Helper Utilities
//!
//! Shared fixtures for sites-registry integration tests. Every test gets its
//! own SQLite file inside a `TempDir`, so tests never share state.

#![allow(dead_code)]

use sites_common::db::{
    init_database, GeometryPoint, Instrument, InstrumentType, Platform, PlatformType, Station,
};
use sites_common::{Caller, Role};
use sites_registry::services::{
    instruments, platforms, stations, CreateInstrumentRequest, CreatePlatformRequest,
    CreateRoiRequest, CreateStationRequest,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Fresh registry database; keep the `TempDir` alive for the test's duration
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let pool = init_database(&temp_dir.path().join("sites_registry.db"))
        .await
        .expect("init database");
    (temp_dir, pool)
}

pub fn admin() -> Caller {
    Caller::new("admin-user", Role::Admin, None)
}

pub fn station_admin(station: &str) -> Caller {
    Caller::new("station-admin-user", Role::StationAdmin, Some(station.to_string()))
}

pub fn readonly() -> Caller {
    Caller::new("readonly-user", Role::Readonly, None)
}

pub async fn seed_station(pool: &SqlitePool, acronym: &str) -> Station {
    stations::create_station(
        pool,
        &admin(),
        CreateStationRequest {
            acronym: acronym.to_string(),
            display_name: format!("{} Research Station", acronym),
            description: None,
            country: Some("Sweden".to_string()),
            latitude: None,
            longitude: None,
            elevation_m: None,
        },
    )
    .await
    .expect("seed station")
}

pub fn platform_request(platform_type: PlatformType, ecosystem_code: &str) -> CreatePlatformRequest {
    CreatePlatformRequest {
        platform_type,
        ecosystem_code: ecosystem_code.to_string(),
        mount_type_code: None,
        normalized_name: None,
        display_name: None,
        description: None,
        latitude: None,
        longitude: None,
        platform_height_m: None,
    }
}

pub async fn seed_platform(pool: &SqlitePool, station_id: i64, ecosystem_code: &str) -> Platform {
    platforms::create_platform(
        pool,
        &admin(),
        station_id,
        platform_request(PlatformType::Fixed, ecosystem_code),
    )
    .await
    .expect("seed platform")
    .platform
}

pub async fn seed_instrument(
    pool: &SqlitePool,
    platform_id: i64,
    instrument_type: InstrumentType,
) -> Instrument {
    instruments::create_instrument(
        pool,
        &admin(),
        platform_id,
        CreateInstrumentRequest::of_type(instrument_type),
    )
    .await
    .expect("seed instrument")
}

/// Station `LON`, platform `LON_AGR_TWR01`, and one phenocam
pub async fn seed_phenocam(pool: &SqlitePool) -> (Station, Platform, Instrument) {
    let station = seed_station(pool, "LON").await;
    let platform = seed_platform(pool, station.id, "AGR").await;
    let instrument = seed_instrument(pool, platform.id, InstrumentType::Phenocam).await;
    (station, platform, instrument)
}

/// Axis-aligned square with its top-left corner at `(x, y)`
pub fn square(x: f64, y: f64, size: f64) -> Vec<GeometryPoint> {
    vec![
        GeometryPoint(x, y),
        GeometryPoint(x + size, y),
        GeometryPoint(x + size, y + size),
        GeometryPoint(x, y + size),
    ]
}

pub fn roi_request(points: Vec<GeometryPoint>) -> CreateRoiRequest {
    CreateRoiRequest {
        points,
        description: None,
        color: None,
        alpha: None,
        thickness: None,
        source_image: None,
        auto_generated: false,
    }
}
