//! Database access layer for the registry
//!
//! Thin single-statement operations over the shared SQLite pool. Nothing
//! here retries, locks, or caches: name uniqueness is decided by the
//! storage constraints created in `sites_common::db::init`.

pub mod instruments;
pub mod platforms;
pub mod rois;
pub mod stations;

use sites_common::Error;

/// Whether `err` is the storage layer rejecting a duplicate unique key
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Map a delete rejected by a foreign key to `ConflictState`.
///
/// Reached when a child row appears between the caller's emptiness check
/// and the delete; other storage errors pass through.
pub fn classify_parent_delete(err: sqlx::Error, parent: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Error::ConflictState(format!("{} still has dependent records", parent))
        }
        _ => Error::Database(err),
    }
}
