//! Instrument operations
//!
//! Instrument names extend their platform's name with a type code and a
//! per-platform-per-type sequence: `LON_AGR_TWR01_PHE03`.

use crate::db::instruments::{self as store, InstrumentUpdate, NewInstrument};
use crate::db::rois;
use crate::services::creation::create_with_unique_name;
use crate::services::platforms::{get_platform, platform_with_station, require_station_write};
use crate::services::sequence::next_sequence;
use crate::services::stations::get_station;
use serde::Deserialize;
use serde_json::{Map, Value};
use sites_common::db::{Instrument, InstrumentType, Platform, Station};
use sites_common::naming;
use sites_common::{Caller, EntityKind, Error, Result};
use sqlx::SqlitePool;
use tracing::info;

const DEFAULT_STATUS: &str = "Active";

/// Instrument creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInstrumentRequest {
    pub instrument_type: InstrumentType,
    /// Explicit name; skips allocation when present
    #[serde(default)]
    pub normalized_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub specifications: Map<String, Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub viewing_direction: Option<String>,
    #[serde(default)]
    pub azimuth_degrees: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
}

impl CreateInstrumentRequest {
    /// Bare request with every optional field left empty
    pub fn of_type(instrument_type: InstrumentType) -> Self {
        Self {
            instrument_type,
            normalized_name: None,
            display_name: None,
            status: None,
            specifications: Map::new(),
            description: None,
            viewing_direction: None,
            azimuth_degrees: None,
            height_m: None,
        }
    }
}

pub async fn get_instrument(pool: &SqlitePool, id: i64) -> Result<Instrument> {
    store::get_instrument(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("instrument {}", id)))
}

pub async fn list_instruments(pool: &SqlitePool, platform_id: i64) -> Result<Vec<Instrument>> {
    get_platform(pool, platform_id).await?;
    store::list_instruments_for_platform(pool, platform_id).await
}

/// Instrument together with the station that owns it
pub async fn instrument_with_station(pool: &SqlitePool, id: i64) -> Result<(Instrument, Station)> {
    let instrument = get_instrument(pool, id).await?;
    let platform = get_platform(pool, instrument.platform_id).await?;
    let station = get_station(pool, platform.station_id).await?;
    Ok((instrument, station))
}

/// Create an instrument on a platform the caller may write to
pub async fn create_instrument(
    pool: &SqlitePool,
    caller: &Caller,
    platform_id: i64,
    request: CreateInstrumentRequest,
) -> Result<Instrument> {
    let (platform, station) = platform_with_station(pool, platform_id).await?;
    require_station_write(caller, &station)?;
    create_on_platform(pool, &platform, request).await
}

/// Create an instrument on an already loaded platform.
///
/// **Algorithm:**
/// 1. Check the type is allowed on the platform's category (before allocation)
/// 2. Run the creation protocol with the `{PLATFORM}_{TYPE}` allocator
///
/// Shared by explicit creation and platform auto-provisioning.
pub async fn create_on_platform(
    pool: &SqlitePool,
    platform: &Platform,
    request: CreateInstrumentRequest,
) -> Result<Instrument> {
    let instrument_type = request.instrument_type;
    if !platform
        .platform_type
        .allowed_instruments()
        .contains(&instrument_type)
    {
        return Err(Error::Validation(format!(
            "{} instruments cannot be mounted on {} platforms",
            instrument_type.as_str(),
            platform.platform_type.as_str()
        )));
    }

    let prefix = naming::instrument_prefix(&platform.normalized_name, instrument_type.type_code());
    let requested = request
        .normalized_name
        .as_deref()
        .map(|name| validate_requested_name(name, platform))
        .transpose()?;

    create_with_unique_name(
        EntityKind::Instrument,
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
            let new_instrument = NewInstrument {
                platform_id: platform.id,
                display_name: request
                    .display_name
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("{} {}", instrument_type.label(), name)),
                normalized_name: name,
                instrument_type,
                status: request.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
                specifications: request.specifications,
                description: request.description,
                viewing_direction: request.viewing_direction,
                azimuth_degrees: request.azimuth_degrees,
                height_m: request.height_m,
            };
            store::insert_instrument(pool, &new_instrument).await
        },
    )
    .await
}

/// Explicit names must stay inside the platform's namespace
fn validate_requested_name(name: &str, platform: &Platform) -> Result<String> {
    let name = name.trim().to_ascii_uppercase();
    let in_namespace = name
        .strip_prefix(platform.normalized_name.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| !rest.is_empty());
    let well_formed = name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if in_namespace && well_formed {
        Ok(name)
    } else {
        Err(Error::Validation(format!(
            "instrument name '{}' must start with '{}_'",
            name, platform.normalized_name
        )))
    }
}

/// Update non-identity fields of an instrument
pub async fn update_instrument(
    pool: &SqlitePool,
    caller: &Caller,
    id: i64,
    update: InstrumentUpdate,
) -> Result<Instrument> {
    let (_, station) = instrument_with_station(pool, id).await?;
    require_station_write(caller, &station)?;

    store::update_instrument(pool, id, &update).await?;
    get_instrument(pool, id).await
}

/// Delete an instrument.
///
/// Any ROI (active, legacy, or archived) blocks the delete unless `cascade`
/// is set, in which case the ROIs go with it in one transaction.
pub async fn delete_instrument(
    pool: &SqlitePool,
    caller: &Caller,
    id: i64,
    cascade: bool,
) -> Result<()> {
    let (instrument, station) = instrument_with_station(pool, id).await?;
    require_station_write(caller, &station)?;

    let roi_count = rois::count_rois_for_instrument(pool, id).await?;
    if roi_count > 0 && !cascade {
        return Err(Error::ConflictState(format!(
            "instrument {} still has {} ROI(s); delete with cascade=true to remove them",
            instrument.normalized_name, roi_count
        )));
    }

    store::delete_instrument(pool, id, cascade).await?;
    info!(
        instrument = %instrument.normalized_name,
        rois_removed = if cascade { roi_count } else { 0 },
        "Deleted instrument"
    );
    Ok(())
}
