//! Integration tests for hierarchical naming and concurrent entity creation

mod helpers;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use helpers::*;
use sites_common::db::{InstrumentType, PlatformType};
use sites_common::{EntityKind, Error};
use sites_registry::db::instruments as instrument_store;
use sites_registry::db::platforms as platform_store;
use sites_registry::db::stations as station_store;
use sites_registry::ApiError;
use sites_registry::services::{
    create_with_unique_name, instruments, platforms, stations, CreateInstrumentRequest,
    CreateStationRequest, RoiLifecycle,
};
use std::collections::HashSet;
use tokio::task::JoinSet;

// ============================================================================
// Deterministic allocation
// ============================================================================

#[tokio::test]
async fn test_third_phenocam_gets_suffix_03() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;
    let platform = seed_platform(&pool, station.id, "AGR").await;
    assert_eq!(platform.normalized_name, "LON_AGR_TWR01");

    let first = seed_instrument(&pool, platform.id, InstrumentType::Phenocam).await;
    let second = seed_instrument(&pool, platform.id, InstrumentType::Phenocam).await;
    assert_eq!(first.normalized_name, "LON_AGR_TWR01_PHE01");
    assert_eq!(second.normalized_name, "LON_AGR_TWR01_PHE02");

    let third = seed_instrument(&pool, platform.id, InstrumentType::Phenocam).await;
    assert_eq!(third.normalized_name, "LON_AGR_TWR01_PHE03");
    assert_eq!(third.type_code, "PHE");
}

#[tokio::test]
async fn test_sequences_are_scoped_per_type_and_parent() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "SVB").await;
    let forest = seed_platform(&pool, station.id, "FOR").await;
    let mire = seed_platform(&pool, station.id, "MIR").await;
    let forest_two = seed_platform(&pool, station.id, "FOR").await;

    assert_eq!(forest.normalized_name, "SVB_FOR_TWR01");
    assert_eq!(mire.normalized_name, "SVB_MIR_TWR01");
    assert_eq!(forest_two.normalized_name, "SVB_FOR_TWR02");

    let phenocam = seed_instrument(&pool, forest.id, InstrumentType::Phenocam).await;
    let sensor = seed_instrument(&pool, forest.id, InstrumentType::Multispectral).await;
    let other = seed_instrument(&pool, forest_two.id, InstrumentType::Phenocam).await;

    assert_eq!(phenocam.normalized_name, "SVB_FOR_TWR01_PHE01");
    assert_eq!(sensor.normalized_name, "SVB_FOR_TWR01_MS01");
    assert_eq!(other.normalized_name, "SVB_FOR_TWR02_PHE01");
}

#[tokio::test]
async fn test_explicit_name_counts_as_sibling() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;

    let mut request = platform_request(PlatformType::Fixed, "AGR");
    request.normalized_name = Some("lon_agr_twr01".to_string());
    let explicit = platforms::create_platform(&pool, &admin(), station.id, request)
        .await
        .unwrap()
        .platform;
    assert_eq!(explicit.normalized_name, "LON_AGR_TWR01");

    let allocated = seed_platform(&pool, station.id, "AGR").await;
    assert_eq!(allocated.normalized_name, "LON_AGR_TWR02");
}

#[tokio::test]
async fn test_explicit_duplicate_name_already_exists() {
    let (_dir, pool) = create_test_db().await;
    let (_, platform, instrument) = seed_phenocam(&pool).await;

    let mut request = CreateInstrumentRequest::of_type(InstrumentType::Phenocam);
    request.normalized_name = Some(instrument.normalized_name.clone());
    let result = instruments::create_instrument(&pool, &admin(), platform.id, request).await;

    match result {
        Err(Error::AlreadyExists { entity, name }) => {
            assert_eq!(entity, EntityKind::Instrument);
            assert_eq!(name, "LON_AGR_TWR01_PHE01");
        }
        other => panic!("expected AlreadyExists, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_runs_before_allocation() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "ANS").await;

    let missing = platforms::create_platform(
        &pool,
        &admin(),
        9999,
        platform_request(PlatformType::Fixed, "FOR"),
    )
    .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    let bad_ecosystem = platforms::create_platform(
        &pool,
        &admin(),
        station.id,
        platform_request(PlatformType::Fixed, "ZZZ"),
    )
    .await;
    assert!(matches!(bad_ecosystem, Err(Error::Validation(_))));

    let satellite = platforms::create_platform(
        &pool,
        &admin(),
        station.id,
        platform_request(PlatformType::Satellite, "ESA"),
    )
    .await
    .unwrap()
    .platform;
    assert_eq!(satellite.normalized_name, "ANS_ESA_SAT01");

    let incompatible = instruments::create_instrument(
        &pool,
        &admin(),
        satellite.id,
        CreateInstrumentRequest::of_type(InstrumentType::Phenocam),
    )
    .await;
    assert!(matches!(incompatible, Err(Error::Validation(_))));

    let names = platform_store::names_with_prefix(&pool, "ANS_").await.unwrap();
    assert_eq!(names, vec!["ANS_ESA_SAT01".to_string()]);
}

#[tokio::test]
async fn test_prefix_scan_treats_underscore_literally() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;
    seed_platform(&pool, station.id, "AGR").await;

    // Would match `LIKE 'LON_AGR_TWR%'` because `_` is a wildcard there
    platform_store::insert_platform(&pool, &new_platform(station.id, "LONXAGR_TWR07"))
        .await
        .unwrap();

    let names = platform_store::names_with_prefix(&pool, "LON_AGR_TWR").await.unwrap();
    assert_eq!(names, vec!["LON_AGR_TWR01".to_string()]);

    let next = seed_platform(&pool, station.id, "AGR").await;
    assert_eq!(next.normalized_name, "LON_AGR_TWR02");
}

fn new_platform(station_id: i64, name: &str) -> platform_store::NewPlatform {
    platform_store::NewPlatform {
        station_id,
        normalized_name: name.to_string(),
        display_name: name.to_string(),
        platform_type: PlatformType::Fixed,
        ecosystem_code: "AGR".to_string(),
        mount_type_code: "TWR".to_string(),
        description: None,
        latitude: None,
        longitude: None,
        platform_height_m: None,
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_creation_yields_distinct_names() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;
    let platform = seed_platform(&pool, station.id, "AGR").await;

    const REQUESTS: usize = 12;
    let mut join_set = JoinSet::new();
    for _ in 0..REQUESTS {
        let pool = pool.clone();
        let platform_id = platform.id;
        join_set.spawn(async move {
            instruments::create_instrument(
                &pool,
                &admin(),
                platform_id,
                CreateInstrumentRequest::of_type(InstrumentType::Phenocam),
            )
            .await
        });
    }

    let mut created = Vec::new();
    let mut conflicts = 0;
    while let Some(result) = join_set.join_next().await {
        match result.expect("task panicked") {
            Ok(instrument) => created.push(instrument.normalized_name),
            Err(Error::ConcurrentCreationConflict { entity, .. }) => {
                assert_eq!(entity, EntityKind::Instrument);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error under contention: {:?}", other),
        }
    }

    assert_eq!(created.len() + conflicts, REQUESTS);
    let unique: HashSet<_> = created.iter().collect();
    assert_eq!(unique.len(), created.len(), "duplicate names persisted");

    let stored = instruments::list_instruments(&pool, platform.id).await.unwrap();
    assert_eq!(stored.len(), created.len());
}

#[tokio::test]
async fn test_resubmitting_after_conflict_persists_every_request() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;

    const REQUESTS: usize = 8;
    let mut join_set = JoinSet::new();
    for _ in 0..REQUESTS {
        let pool = pool.clone();
        let station_id = station.id;
        join_set.spawn(async move {
            for _ in 0..50 {
                match platforms::create_platform(
                    &pool,
                    &admin(),
                    station_id,
                    platform_request(PlatformType::Fixed, "FOR"),
                )
                .await
                {
                    Ok(created) => return created.platform.normalized_name,
                    Err(err) if err.is_retryable() => continue,
                    Err(err) => panic!("unexpected error: {:?}", err),
                }
            }
            panic!("request never succeeded");
        });
    }

    let mut names = Vec::new();
    while let Some(result) = join_set.join_next().await {
        names.push(result.expect("task panicked"));
    }
    names.sort();

    let expected: Vec<String> = (1..=REQUESTS).map(|n| format!("LON_FOR_TWR{:02}", n)).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_identical_precomputed_name_one_winner() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "LON").await;

    let station_id = station.id;

    let attempt = |pool: sqlx::SqlitePool| async move {
        create_with_unique_name(
            EntityKind::Platform,
            None,
            || async { Ok("LON_AGR_TWR05".to_string()) },
            // Both requests pass the advisory probe before either inserts
            |_| async { Ok(false) },
            |name| {
                let pool = pool.clone();
                async move {
                    platform_store::insert_platform(&pool, &new_platform(station_id, &name)).await
                }
            },
        )
        .await
    };

    let (first, second) = tokio::join!(attempt(pool.clone()), attempt(pool.clone()));
    let outcomes = [first, second];

    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    match loser {
        Error::ConcurrentCreationConflict { entity, name } => {
            assert_eq!(*entity, EntityKind::Platform);
            assert_eq!(name, "LON_AGR_TWR05");
            assert!(loser.is_retryable());
        }
        other => panic!("expected ConcurrentCreationConflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_station_acronym() {
    let (_dir, pool) = create_test_db().await;
    seed_station(&pool, "SVB").await;

    let result = stations::create_station(
        &pool,
        &admin(),
        CreateStationRequest {
            acronym: "svb".to_string(),
            display_name: "Svartberget again".to_string(),
            description: None,
            country: None,
            latitude: None,
            longitude: None,
            elevation_m: None,
        },
    )
    .await;
    assert!(matches!(result, Err(Error::AlreadyExists { entity: EntityKind::Station, .. })));
}

// ============================================================================
// Auto-provisioning
// ============================================================================

#[tokio::test]
async fn test_uav_platform_provisions_default_sensors() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "ASA").await;

    let created = platforms::create_platform(
        &pool,
        &admin(),
        station.id,
        platform_request(PlatformType::Uav, "DJI"),
    )
    .await
    .unwrap();

    assert_eq!(created.platform.normalized_name, "ASA_DJI_UAV01");
    assert!(created.warnings.is_empty());
    let names: Vec<_> = created
        .instruments
        .iter()
        .map(|i| i.normalized_name.as_str())
        .collect();
    assert_eq!(names, vec!["ASA_DJI_UAV01_MS01", "ASA_DJI_UAV01_RGB01"]);
}

#[tokio::test]
async fn test_provisioning_failure_keeps_platform() {
    let (_dir, pool) = create_test_db().await;
    let station = seed_station(&pool, "ASA").await;

    // Make every RGB insert fail so the second auto-provisioned child is lost
    sqlx::query(
        r#"
        CREATE TRIGGER reject_rgb BEFORE INSERT ON instruments
        WHEN NEW.type_code = 'RGB'
        BEGIN
            SELECT RAISE(ABORT, 'rgb rejected');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let created = platforms::create_platform(
        &pool,
        &admin(),
        station.id,
        platform_request(PlatformType::Uav, "DJI"),
    )
    .await
    .unwrap();

    assert_eq!(created.platform.normalized_name, "ASA_DJI_UAV01");
    assert_eq!(created.instruments.len(), 1);
    assert_eq!(created.instruments[0].normalized_name, "ASA_DJI_UAV01_MS01");
    assert_eq!(created.warnings.len(), 1);
    assert!(created.warnings[0].contains("rgb_camera"));

    let stored = platforms::get_platform(&pool, created.platform.id).await.unwrap();
    assert_eq!(stored, created.platform);
}

// ============================================================================
// Guarded deletion
// ============================================================================

#[tokio::test]
async fn test_platform_delete_blocked_by_instruments() {
    let (_dir, pool) = create_test_db().await;
    let (station, platform, instrument) = seed_phenocam(&pool).await;

    let blocked = platforms::delete_platform(&pool, &admin(), platform.id).await;
    assert!(matches!(blocked, Err(Error::ConflictState(_))));

    let station_blocked = stations::delete_station(&pool, &admin(), station.id).await;
    assert!(matches!(station_blocked, Err(Error::ConflictState(_))));

    instruments::delete_instrument(&pool, &admin(), instrument.id, false)
        .await
        .unwrap();
    platforms::delete_platform(&pool, &admin(), platform.id)
        .await
        .unwrap();
    stations::delete_station(&pool, &admin(), station.id)
        .await
        .unwrap();

    assert!(matches!(
        platforms::get_platform(&pool, platform.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_store_delete_with_children_is_conflict_state() {
    // The state a delete sees when a child lands after the emptiness check
    let (_dir, pool) = create_test_db().await;
    let (station, platform, instrument) = seed_phenocam(&pool).await;
    let service = RoiLifecycle::new(pool.clone());
    service
        .create_roi(&admin(), instrument.id, roi_request(square(0.0, 0.0, 10.0)))
        .await
        .unwrap();

    let station_delete = station_store::delete_station(&pool, station.id).await;
    assert!(matches!(station_delete, Err(Error::ConflictState(_))));

    let platform_delete = platform_store::delete_platform(&pool, platform.id).await;
    assert!(matches!(platform_delete, Err(Error::ConflictState(_))));

    let instrument_delete = instrument_store::delete_instrument(&pool, instrument.id, false).await;
    assert!(matches!(instrument_delete, Err(Error::ConflictState(_))));

    let response = ApiError::from(platform_delete.unwrap_err()).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Nothing was removed
    assert!(instruments::get_instrument(&pool, instrument.id).await.is_ok());
}

#[tokio::test]
async fn test_default_display_name_uses_type_label() {
    let (_dir, pool) = create_test_db().await;
    let (_, _, instrument) = seed_phenocam(&pool).await;
    assert_eq!(instrument.display_name, "Phenocam LON_AGR_TWR01_PHE01");
}

#[tokio::test]
async fn test_ownership_scopes_writes() {
    let (_dir, pool) = create_test_db().await;
    let lon = seed_station(&pool, "LON").await;
    let svb = seed_station(&pool, "SVB").await;

    let own = platforms::create_platform(
        &pool,
        &station_admin("LON"),
        lon.id,
        platform_request(PlatformType::Fixed, "AGR"),
    )
    .await;
    assert!(own.is_ok());

    let foreign = platforms::create_platform(
        &pool,
        &station_admin("LON"),
        svb.id,
        platform_request(PlatformType::Fixed, "FOR"),
    )
    .await;
    assert!(matches!(foreign, Err(Error::Forbidden(_))));

    let read_only = platforms::create_platform(
        &pool,
        &readonly(),
        lon.id,
        platform_request(PlatformType::Fixed, "AGR"),
    )
    .await;
    assert!(matches!(read_only, Err(Error::Forbidden(_))));
}
