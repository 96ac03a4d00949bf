//! Station operations
//!
//! Stations sit at the root of the hierarchy. Their acronym is always
//! supplied by the caller, so the creation protocol runs without allocation.

use crate::db::stations::{self as store, NewStation, StationUpdate};
use crate::services::creation::create_with_requested_name;
use serde::Deserialize;
use sites_common::db::Station;
use sites_common::naming::is_valid_station_acronym;
use sites_common::{Caller, EntityKind, Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Station creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStationRequest {
    pub acronym: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub elevation_m: Option<f64>,
}

pub async fn get_station(pool: &SqlitePool, id: i64) -> Result<Station> {
    store::get_station(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("station {}", id)))
}

pub async fn list_stations(pool: &SqlitePool) -> Result<Vec<Station>> {
    store::list_stations(pool).await
}

/// Create a station; network-wide admins only
pub async fn create_station(
    pool: &SqlitePool,
    caller: &Caller,
    request: CreateStationRequest,
) -> Result<Station> {
    if !caller.role.is_global_admin() {
        return Err(Error::Forbidden(format!(
            "role '{}' cannot create stations",
            caller.role
        )));
    }

    let acronym = request.acronym.trim().to_ascii_uppercase();
    if !is_valid_station_acronym(&acronym) {
        return Err(Error::Validation(format!(
            "station acronym '{}' must be 2-6 uppercase letters or digits, starting with a letter",
            request.acronym
        )));
    }
    if request.display_name.trim().is_empty() {
        return Err(Error::Validation("display_name must not be empty".into()));
    }

    create_with_requested_name(
        EntityKind::Station,
        acronym,
        |name| async move { store::acronym_exists(pool, &name).await },
        |name| async move {
            let new_station = NewStation {
                acronym: name,
                display_name: request.display_name.trim().to_string(),
                description: request.description,
                country: request.country,
                latitude: request.latitude,
                longitude: request.longitude,
                elevation_m: request.elevation_m,
            };
            store::insert_station(pool, &new_station).await
        },
    )
    .await
}

/// Update non-identity fields of a station
pub async fn update_station(
    pool: &SqlitePool,
    caller: &Caller,
    id: i64,
    update: StationUpdate,
) -> Result<Station> {
    let station = get_station(pool, id).await?;
    if !caller.can_write_station(&station.acronym) {
        return Err(Error::Forbidden(format!(
            "caller '{}' cannot modify station {}",
            caller.username, station.acronym
        )));
    }

    store::update_station(pool, id, &update).await?;
    get_station(pool, id).await
}

/// Delete a station that has no platforms left
pub async fn delete_station(pool: &SqlitePool, caller: &Caller, id: i64) -> Result<()> {
    let station = get_station(pool, id).await?;
    if !caller.role.is_global_admin() {
        return Err(Error::Forbidden(format!(
            "role '{}' cannot delete stations",
            caller.role
        )));
    }

    let platforms = store::count_platforms(pool, id).await?;
    if platforms > 0 {
        return Err(Error::ConflictState(format!(
            "station {} still has {} platform(s); delete them first",
            station.acronym, platforms
        )));
    }

    store::delete_station(pool, id).await?;
    info!(station = %station.acronym, "Deleted station");
    Ok(())
}
