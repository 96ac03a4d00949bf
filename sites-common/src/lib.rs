//! # SITES Station Registry Common Library
//!
//! Shared code for services that read or write the station registry:
//! - Error taxonomy
//! - Bootstrap configuration loading
//! - Database initialization and record models
//! - Hierarchical naming scheme
//! - Caller roles and capability predicates

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod naming;

pub use auth::{Caller, Role};
pub use error::{EntityKind, Error, Result};
