//! Caller roles and capability predicates
//!
//! Authentication happens upstream; by the time a request reaches the
//! registry the caller is a resolved `(username, role, station)` triple.
//!
//! Two capabilities are consulted:
//! - **ROI editor**: the small fixed set of roles allowed to mutate ROI
//!   geometry directly ([`ROI_EDITOR_ROLES`]).
//! - **Station ownership**: station-scoped roles may only write to their own
//!   station. Used for Station/Platform/Instrument records.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    SitesAdmin,
    StationAdmin,
    Station,
    Readonly,
}

/// Roles allowed to edit ROI geometry in place
pub const ROI_EDITOR_ROLES: [Role; 2] = [Role::Admin, Role::SitesAdmin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SitesAdmin => "sites-admin",
            Role::StationAdmin => "station-admin",
            Role::Station => "station",
            Role::Readonly => "readonly",
        }
    }

    /// Network-wide administrative roles (not scoped to a station)
    pub fn is_global_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SitesAdmin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "sites-admin" | "sites_admin" => Ok(Role::SitesAdmin),
            "station-admin" | "station_admin" => Ok(Role::StationAdmin),
            "station" => Ok(Role::Station),
            "readonly" | "read-only" => Ok(Role::Readonly),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub role: Role,
    /// Station acronym the caller is attached to, for station-scoped roles
    pub station: Option<String>,
}

impl Caller {
    pub fn new(username: impl Into<String>, role: Role, station: Option<String>) -> Self {
        Self {
            username: username.into(),
            role,
            station,
        }
    }

    /// Member of the restricted ROI-editor set
    pub fn is_roi_editor(&self) -> bool {
        is_roi_editor(self.role)
    }

    /// Caller is attached to `station_acronym`
    pub fn owns_station(&self, station_acronym: &str) -> bool {
        self.station
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(station_acronym))
    }

    /// May create, update, or delete Station/Platform/Instrument records under the station
    pub fn can_write_station(&self, station_acronym: &str) -> bool {
        match self.role {
            Role::Admin | Role::SitesAdmin => true,
            Role::StationAdmin => self.owns_station(station_acronym),
            Role::Station | Role::Readonly => false,
        }
    }
}

/// Pure predicate over the ROI-editor capability list
pub fn is_roi_editor(role: Role) -> bool {
    ROI_EDITOR_ROLES.contains(&role)
}
