//! Database schema and record models

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
