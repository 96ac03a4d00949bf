//! Registry services
//!
//! Validation, authorization, naming, and lifecycle rules on top of the
//! persistence layer. Handlers in `api` only translate HTTP to these calls.

pub mod creation;
pub mod instruments;
pub mod platforms;
pub mod roi_lifecycle;
pub mod sequence;
pub mod stations;

pub use creation::{create_with_requested_name, create_with_unique_name, NameSource};
pub use instruments::CreateInstrumentRequest;
pub use platforms::{CreatePlatformRequest, PlatformCreated};
pub use roi_lifecycle::{
    edit_mode, CreateRoiRequest, EditModeView, LegacyTransition, MarkLegacyRequest,
    ReplacementChain, RoiLifecycle,
};
pub use sequence::next_sequence;
pub use stations::CreateStationRequest;
