//! Integration tests for database initialization
//!
//! Covers schema creation, idempotent re-initialization, and the
//! storage-level guards on identity fields.

use sites_common::db::init::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn fresh_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("registry.db");
    let pool = init_database(&db_path).await.expect("init_database failed");
    (temp_dir, pool)
}

async fn seed_instrument(pool: &SqlitePool) -> i64 {
    sqlx::query("INSERT INTO stations (acronym, display_name) VALUES ('LON', 'Lönnstorp')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        r#"
        INSERT INTO platforms (station_id, normalized_name, display_name, platform_type, ecosystem_code, mount_type_code)
        VALUES (1, 'LON_AGR_TWR01', 'Tower 1', 'fixed', 'AGR', 'TWR')
        "#,
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        INSERT INTO instruments (platform_id, normalized_name, display_name, instrument_type, type_code)
        VALUES (1, 'LON_AGR_TWR01_PHE01', 'Phenocam 1', 'phenocam', 'PHE')
        "#,
    )
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("registry.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("registry.db");

    let pool1 = init_database(&db_path).await.unwrap();
    seed_instrument(&pool1).await;
    drop(pool1);

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instruments")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Re-initialization must not drop data");

    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn test_normalized_name_unique_constraint() {
    let (_dir, pool) = fresh_db().await;
    seed_instrument(&pool).await;

    let result = sqlx::query(
        r#"
        INSERT INTO instruments (platform_id, normalized_name, display_name, instrument_type, type_code)
        VALUES (1, 'LON_AGR_TWR01_PHE01', 'Duplicate', 'phenocam', 'PHE')
        "#,
    )
    .execute(&pool)
    .await;

    match result {
        Err(sqlx::Error::Database(db_err)) => assert!(db_err.is_unique_violation()),
        other => panic!("Expected unique violation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_roi_name_unique_per_instrument_only() {
    let (_dir, pool) = fresh_db().await;
    let instrument_id = seed_instrument(&pool).await;
    sqlx::query(
        r#"
        INSERT INTO instruments (platform_id, normalized_name, display_name, instrument_type, type_code)
        VALUES (1, 'LON_AGR_TWR01_PHE02', 'Phenocam 2', 'phenocam', 'PHE')
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let insert = "INSERT INTO instrument_rois (instrument_id, roi_name, points_json) VALUES (?, 'ROI_01', '[]')";
    sqlx::query(insert).bind(instrument_id).execute(&pool).await.unwrap();
    sqlx::query(insert).bind(instrument_id + 1).execute(&pool).await.unwrap();

    let duplicate = sqlx::query(insert).bind(instrument_id).execute(&pool).await;
    assert!(duplicate.is_err(), "Same ROI name on same instrument must be rejected");
}

#[tokio::test]
async fn test_normalized_name_is_immutable() {
    let (_dir, pool) = fresh_db().await;
    seed_instrument(&pool).await;

    let result = sqlx::query("UPDATE instruments SET normalized_name = 'RENAMED' WHERE id = 1")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "Renaming an instrument must be rejected by storage");

    // Non-identity fields stay writable
    sqlx::query("UPDATE instruments SET display_name = 'Renamed display' WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_replaced_by_is_write_once() {
    let (_dir, pool) = fresh_db().await;
    let instrument_id = seed_instrument(&pool).await;

    for name in ["ROI_01", "ROI_02", "ROI_03"] {
        sqlx::query("INSERT INTO instrument_rois (instrument_id, roi_name, points_json) VALUES (?, ?, '[]')")
            .bind(instrument_id)
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
    }

    sqlx::query("UPDATE instrument_rois SET replaced_by_roi_id = 2 WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let reassign = sqlx::query("UPDATE instrument_rois SET replaced_by_roi_id = 3 WHERE id = 1")
        .execute(&pool)
        .await;
    assert!(reassign.is_err(), "replaced_by_roi_id must not be reassigned");

    // Writing the same value again is not a reassignment
    sqlx::query("UPDATE instrument_rois SET replaced_by_roi_id = 2 WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let (_dir, pool) = fresh_db().await;

    let orphan = sqlx::query(
        r#"
        INSERT INTO platforms (station_id, normalized_name, display_name, platform_type, ecosystem_code, mount_type_code)
        VALUES (999, 'XXX_FOR_TWR01', 'Orphan', 'fixed', 'FOR', 'TWR')
        "#,
    )
    .execute(&pool)
    .await;
    assert!(orphan.is_err(), "Platform without station must be rejected");
}
