//! Entity creation protocol
//!
//! One algorithm shared by every entity kind with a storage-unique name:
//! allocate (or accept) a name, run an advisory existence pre-check, insert
//! once, and classify a uniqueness violation as a retryable conflict.
//!
//! The storage constraint is the only serialization point. There is no lock
//! keyed by parent and no automatic retry: a conflicting caller resubmits
//! and the allocator recomputes against current sibling state.

use crate::db::is_unique_violation;
use sites_common::{EntityKind, Error, Result};
use std::future::Future;
use tracing::{debug, info, warn};

/// Where the candidate name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// Supplied by the caller; allocation was bypassed
    Requested,
    /// Computed by the sequence allocator
    Allocated,
}

impl NameSource {
    fn as_str(&self) -> &'static str {
        match self {
            NameSource::Requested => "requested",
            NameSource::Allocated => "allocated",
        }
    }
}

/// Run the creation protocol for one entity.
///
/// **Algorithm:**
/// 1. Use `requested` if present, otherwise call `allocate`
/// 2. Pre-check with `exists` (shortens the common failure path only)
/// 3. Call `insert` exactly once
/// 4. Map a uniqueness violation from `insert` to `ConcurrentCreationConflict`
///
/// Parent lookup and type compatibility are the caller's job and must run
/// before this, so a doomed request never allocates.
///
/// **Behavior:**
/// - Pre-check hit on a requested name: `AlreadyExists` (resubmitting will not help)
/// - Pre-check hit on an allocated name: `ConcurrentCreationConflict` (a sibling
///   appeared between the scan and the probe)
/// - Any other error from the closures propagates unchanged
pub async fn create_with_unique_name<T, A, AFut, E, EFut, I, IFut>(
    entity: EntityKind,
    requested: Option<String>,
    allocate: A,
    exists: E,
    insert: I,
) -> Result<T>
where
    A: FnOnce() -> AFut,
    AFut: Future<Output = Result<String>>,
    E: FnOnce(String) -> EFut,
    EFut: Future<Output = Result<bool>>,
    I: FnOnce(String) -> IFut,
    IFut: Future<Output = Result<T>>,
{
    match requested {
        Some(name) => persist_candidate(entity, name, NameSource::Requested, exists, insert).await,
        None => {
            let name = allocate().await?;
            persist_candidate(entity, name, NameSource::Allocated, exists, insert).await
        }
    }
}

/// Creation protocol for entities whose name is always caller-supplied
/// (station acronyms): no allocation step exists.
pub async fn create_with_requested_name<T, E, EFut, I, IFut>(
    entity: EntityKind,
    name: String,
    exists: E,
    insert: I,
) -> Result<T>
where
    E: FnOnce(String) -> EFut,
    EFut: Future<Output = Result<bool>>,
    I: FnOnce(String) -> IFut,
    IFut: Future<Output = Result<T>>,
{
    persist_candidate(entity, name, NameSource::Requested, exists, insert).await
}

async fn persist_candidate<T, E, EFut, I, IFut>(
    entity: EntityKind,
    name: String,
    source: NameSource,
    exists: E,
    insert: I,
) -> Result<T>
where
    E: FnOnce(String) -> EFut,
    EFut: Future<Output = Result<bool>>,
    I: FnOnce(String) -> IFut,
    IFut: Future<Output = Result<T>>,
{
    debug!(
        entity = entity.label(),
        name = %name,
        source = source.as_str(),
        "Candidate name selected"
    );

    if exists(name.clone()).await? {
        return Err(match source {
            NameSource::Requested => Error::AlreadyExists { entity, name },
            NameSource::Allocated => {
                warn!(entity = entity.label(), name = %name, "Allocated name taken before insert");
                Error::ConcurrentCreationConflict { entity, name }
            }
        });
    }

    match insert(name.clone()).await {
        Ok(created) => {
            info!(entity = entity.label(), name = %name, source = source.as_str(), "Created");
            Ok(created)
        }
        Err(err) if is_unique_violation(&err) => {
            warn!(
                entity = entity.label(),
                name = %name,
                "Uniqueness violation on insert; caller must resubmit"
            );
            Err(Error::ConcurrentCreationConflict { entity, name })
        }
        Err(err) => Err(err),
    }
}
