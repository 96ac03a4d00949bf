//! Common error types for the station registry

use thiserror::Error;

/// Common result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Entity kinds that carry a storage-unique name.
///
/// Used to phrase creation conflicts without duplicating the message text
/// per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Station,
    Platform,
    Instrument,
    Roi,
}

impl EntityKind {
    /// Lowercase label used in messages and log fields
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Station => "station",
            EntityKind::Platform => "platform",
            EntityKind::Instrument => "instrument",
            EntityKind::Roi => "ROI",
        }
    }

    /// Name of the unique field for this kind
    pub fn name_field(&self) -> &'static str {
        match self {
            EntityKind::Station => "acronym",
            EntityKind::Platform | EntityKind::Instrument => "normalized name",
            EntityKind::Roi => "ROI name",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Common error types across the registry crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parent or target entity missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input or type/category incompatibility
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage uniqueness violation while inserting a freshly allocated name.
    ///
    /// Always retryable: resubmitting the original request recomputes the
    /// sequence number against current sibling state.
    #[error(
        "Concurrent creation conflict: {entity} {} '{name}' was claimed by another request; resubmit the request to allocate a fresh name",
        .entity.name_field()
    )]
    ConcurrentCreationConflict { entity: EntityKind, name: String },

    /// Caller-supplied name that is already taken
    #[error("{entity} {} '{name}' already exists", .entity.name_field())]
    AlreadyExists { entity: EntityKind, name: String },

    /// Capability check failed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation illegal for the entity's current state
    #[error("Conflicting state: {0}")]
    ConflictState(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether resubmitting the same request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrentCreationConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_invites_retry() {
        let err = Error::ConcurrentCreationConflict {
            entity: EntityKind::Instrument,
            name: "LON_AGR_TWR01_PHE03".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("LON_AGR_TWR01_PHE03"));
        assert!(msg.contains("normalized name"));
        assert!(msg.contains("resubmit"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_already_exists_not_retryable() {
        let err = Error::AlreadyExists {
            entity: EntityKind::Station,
            name: "SVB".to_string(),
        };
        assert_eq!(err.to_string(), "station acronym 'SVB' already exists");
        assert!(!err.is_retryable());
    }
}
