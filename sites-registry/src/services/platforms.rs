//! Platform operations
//!
//! Platform names are allocated per station, ecosystem (or vendor), and
//! mount type: `{STATION}_{ECO}_{MOUNT}{NN}`. Categories that ship with a
//! fixed sensor set get their instruments provisioned after the platform
//! itself is stored.

use crate::db::platforms::{self as store, NewPlatform, PlatformUpdate};
use crate::services::creation::create_with_unique_name;
use crate::services::instruments::{self, CreateInstrumentRequest};
use crate::services::sequence::next_sequence;
use crate::services::stations::get_station;
use serde::{Deserialize, Serialize};
use sites_common::db::{Instrument, Platform, PlatformType, Station, ECOSYSTEM_CODES};
use sites_common::naming::{self, is_valid_code};
use sites_common::{Caller, EntityKind, Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Platform creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlatformRequest {
    pub platform_type: PlatformType,
    /// Ecosystem code, or vendor/agency code for uav and satellite platforms
    pub ecosystem_code: String,
    /// Fixed platforms only; defaults to the category's mount type
    #[serde(default)]
    pub mount_type_code: Option<String>,
    /// Explicit name; skips allocation when present
    #[serde(default)]
    pub normalized_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub platform_height_m: Option<f64>,
}

/// Result of a platform creation, including auto-provisioned instruments
#[derive(Debug, Clone, Serialize)]
pub struct PlatformCreated {
    pub platform: Platform,
    pub instruments: Vec<Instrument>,
    /// One entry per auto-provisioned instrument that could not be created
    pub warnings: Vec<String>,
}

pub async fn get_platform(pool: &SqlitePool, id: i64) -> Result<Platform> {
    store::get_platform(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("platform {}", id)))
}

pub async fn list_platforms(pool: &SqlitePool, station_id: i64) -> Result<Vec<Platform>> {
    get_station(pool, station_id).await?;
    store::list_platforms_for_station(pool, station_id).await
}

/// Platform together with the station that owns it
pub async fn platform_with_station(pool: &SqlitePool, id: i64) -> Result<(Platform, Station)> {
    let platform = get_platform(pool, id).await?;
    let station = get_station(pool, platform.station_id).await?;
    Ok((platform, station))
}

/// Ownership-scoped write check shared by platform and instrument mutations
pub(crate) fn require_station_write(caller: &Caller, station: &Station) -> Result<()> {
    if caller.can_write_station(&station.acronym) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "caller '{}' cannot modify station {}",
            caller.username, station.acronym
        )))
    }
}

/// Resolve and validate the naming codes for a new platform
fn resolve_codes(request: &CreatePlatformRequest) -> Result<(String, String)> {
    let platform_type = request.platform_type;
    let ecosystem_code = request.ecosystem_code.trim().to_ascii_uppercase();

    if platform_type.uses_vendor_code() {
        if !is_valid_code(&ecosystem_code, 2, 5) {
            return Err(Error::Validation(format!(
                "vendor code '{}' must be 2-5 uppercase letters or digits",
                request.ecosystem_code
            )));
        }
    } else if !ECOSYSTEM_CODES.contains(&ecosystem_code.as_str()) {
        return Err(Error::Validation(format!(
            "unknown ecosystem code '{}'",
            request.ecosystem_code
        )));
    }

    let mount_type_code = match &request.mount_type_code {
        Some(code) => code.trim().to_ascii_uppercase(),
        None => platform_type.default_mount_type_code().to_string(),
    };
    if !platform_type.accepts_mount_type_code(&mount_type_code) {
        return Err(Error::Validation(format!(
            "mount type '{}' is not valid for {} platforms",
            mount_type_code,
            platform_type.as_str()
        )));
    }

    Ok((ecosystem_code, mount_type_code))
}

/// Explicit names must stay inside the station's namespace
fn validate_requested_name(name: &str, station: &Station) -> Result<String> {
    let name = name.trim().to_ascii_uppercase();
    let in_namespace = name
        .strip_prefix(station.acronym.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| !rest.is_empty());
    let well_formed = name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if in_namespace && well_formed {
        Ok(name)
    } else {
        Err(Error::Validation(format!(
            "platform name '{}' must start with '{}_' and use uppercase letters, digits, and underscores",
            name, station.acronym
        )))
    }
}

/// Create a platform under a station.
///
/// **Algorithm:**
/// 1. Load the station (NotFound) and check the caller may write to it
/// 2. Validate ecosystem/vendor and mount type codes for the category
/// 3. Run the creation protocol with the platform name allocator
/// 4. Provision the category's default instruments one by one; a failure
///    there is logged and reported, never rolled back into the platform
pub async fn create_platform(
    pool: &SqlitePool,
    caller: &Caller,
    station_id: i64,
    request: CreatePlatformRequest,
) -> Result<PlatformCreated> {
    let station = get_station(pool, station_id).await?;
    require_station_write(caller, &station)?;

    let (ecosystem_code, mount_type_code) = resolve_codes(&request)?;
    let requested = request
        .normalized_name
        .as_deref()
        .map(|name| validate_requested_name(name, &station))
        .transpose()?;

    let prefix = naming::platform_prefix(&station.acronym, &ecosystem_code, &mount_type_code);
    let platform_type = request.platform_type;

    let platform = create_with_unique_name(
        EntityKind::Platform,
        requested,
        || async {
            let siblings = store::names_with_prefix(pool, &prefix).await?;
            Ok(format!(
                "{}{}",
                prefix,
                naming::format_sequence(next_sequence(&siblings, &prefix))
            ))
        },
        |name| async move { store::name_exists(pool, &name).await },
        |name| async move {
            let new_platform = NewPlatform {
                station_id: station.id,
                display_name: request
                    .display_name
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| name.clone()),
                normalized_name: name,
                platform_type,
                ecosystem_code,
                mount_type_code,
                description: request.description,
                latitude: request.latitude,
                longitude: request.longitude,
                platform_height_m: request.platform_height_m,
            };
            store::insert_platform(pool, &new_platform).await
        },
    )
    .await?;

    let mut created = Vec::new();
    let mut warnings = Vec::new();
    for instrument_type in platform_type.auto_provisioned_instruments() {
        let child = CreateInstrumentRequest::of_type(*instrument_type);
        match instruments::create_on_platform(pool, &platform, child).await {
            Ok(instrument) => created.push(instrument),
            Err(err) => {
                warn!(
                    platform = %platform.normalized_name,
                    instrument_type = instrument_type.as_str(),
                    error = %err,
                    "Auto-provisioned instrument not created"
                );
                warnings.push(format!(
                    "{} instrument was not created: {}",
                    instrument_type.as_str(),
                    err
                ));
            }
        }
    }

    Ok(PlatformCreated {
        platform,
        instruments: created,
        warnings,
    })
}

/// Update non-identity fields of a platform
pub async fn update_platform(
    pool: &SqlitePool,
    caller: &Caller,
    id: i64,
    update: PlatformUpdate,
) -> Result<Platform> {
    let (_, station) = platform_with_station(pool, id).await?;
    require_station_write(caller, &station)?;

    store::update_platform(pool, id, &update).await?;
    get_platform(pool, id).await
}

/// Delete a platform that has no instruments left
pub async fn delete_platform(pool: &SqlitePool, caller: &Caller, id: i64) -> Result<()> {
    let (platform, station) = platform_with_station(pool, id).await?;
    require_station_write(caller, &station)?;

    let instruments = store::count_instruments(pool, id).await?;
    if instruments > 0 {
        return Err(Error::ConflictState(format!(
            "platform {} still has {} instrument(s); delete them first",
            platform.normalized_name, instruments
        )));
    }

    store::delete_platform(pool, id).await?;
    info!(platform = %platform.normalized_name, "Deleted platform");
    Ok(())
}
