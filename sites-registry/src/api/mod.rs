//! HTTP API handlers for sites-registry

pub mod caller;
pub mod health;
pub mod instruments;
pub mod platforms;
pub mod rois;
pub mod stations;

pub use caller::AuthCaller;
pub use health::health_routes;
pub use instruments::instrument_routes;
pub use platforms::platform_routes;
pub use rois::roi_routes;
pub use stations::station_routes;
