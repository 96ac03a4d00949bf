//! Database models
//!
//! Record shapes shared by every service that reads the registry, plus the
//! catalogues that drive naming (platform categories, instrument types,
//! ecosystem codes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ecosystem codes accepted for ground and water platforms
pub const ECOSYSTEM_CODES: [&str; 14] = [
    "AGR", "ALP", "CEM", "CON", "DEC", "FOR", "GRA", "HEA", "LAK", "MAR", "MIR", "PEA", "SFO",
    "WET",
];

/// Mount type codes a fixed platform may use; the first is the default
pub const FIXED_MOUNT_TYPE_CODES: [&str; 5] = ["TWR", "BLD", "GND", "PL", "MST"];

/// Platform category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Fixed,
    Uav,
    Satellite,
    Mobile,
    Usv,
    Uuv,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Fixed => "fixed",
            PlatformType::Uav => "uav",
            PlatformType::Satellite => "satellite",
            PlatformType::Mobile => "mobile",
            PlatformType::Usv => "usv",
            PlatformType::Uuv => "uuv",
        }
    }

    /// Mount type prefix used when the caller does not pick one
    pub fn default_mount_type_code(&self) -> &'static str {
        match self {
            PlatformType::Fixed => FIXED_MOUNT_TYPE_CODES[0],
            PlatformType::Uav => "UAV",
            PlatformType::Satellite => "SAT",
            PlatformType::Mobile => "MOB",
            PlatformType::Usv => "USV",
            PlatformType::Uuv => "UUV",
        }
    }

    /// Whether `code` is an acceptable mount type prefix for this category
    pub fn accepts_mount_type_code(&self, code: &str) -> bool {
        match self {
            PlatformType::Fixed => FIXED_MOUNT_TYPE_CODES.contains(&code),
            _ => code == self.default_mount_type_code(),
        }
    }

    /// Airborne and spaceborne platforms are named after a vendor or agency
    /// instead of an ecosystem
    pub fn uses_vendor_code(&self) -> bool {
        matches!(self, PlatformType::Uav | PlatformType::Satellite)
    }

    /// Instrument types that may be mounted on this category
    pub fn allowed_instruments(&self) -> &'static [InstrumentType] {
        use InstrumentType::*;
        match self {
            PlatformType::Fixed => &[Phenocam, Multispectral, Par, Ndvi, Pri, Hyperspectral, Thermal],
            PlatformType::Mobile => &[Phenocam, Multispectral, Par, Ndvi, Pri, Hyperspectral, RgbCamera],
            PlatformType::Uav => &[Multispectral, RgbCamera, Thermal, Lidar, Hyperspectral],
            PlatformType::Satellite => &[Multispectral, Hyperspectral, Thermal],
            PlatformType::Usv | PlatformType::Uuv => &[Multispectral, Hyperspectral, RgbCamera],
        }
    }

    /// Instruments created together with a platform of this category
    pub fn auto_provisioned_instruments(&self) -> &'static [InstrumentType] {
        match self {
            PlatformType::Uav => &[InstrumentType::Multispectral, InstrumentType::RgbCamera],
            _ => &[],
        }
    }
}

impl FromStr for PlatformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(PlatformType::Fixed),
            "uav" => Ok(PlatformType::Uav),
            "satellite" => Ok(PlatformType::Satellite),
            "mobile" => Ok(PlatformType::Mobile),
            "usv" => Ok(PlatformType::Usv),
            "uuv" => Ok(PlatformType::Uuv),
            other => Err(format!("unknown platform type '{}'", other)),
        }
    }
}

/// Instrument type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Phenocam,
    Multispectral,
    Par,
    Ndvi,
    Pri,
    Hyperspectral,
    Thermal,
    RgbCamera,
    Lidar,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Phenocam => "phenocam",
            InstrumentType::Multispectral => "multispectral",
            InstrumentType::Par => "par",
            InstrumentType::Ndvi => "ndvi",
            InstrumentType::Pri => "pri",
            InstrumentType::Hyperspectral => "hyperspectral",
            InstrumentType::Thermal => "thermal",
            InstrumentType::RgbCamera => "rgb_camera",
            InstrumentType::Lidar => "lidar",
        }
    }

    /// Code embedded in instrument normalized names
    pub fn type_code(&self) -> &'static str {
        match self {
            InstrumentType::Phenocam => "PHE",
            InstrumentType::Multispectral => "MS",
            InstrumentType::Par => "PAR",
            InstrumentType::Ndvi => "NDVI",
            InstrumentType::Pri => "PRI",
            InstrumentType::Hyperspectral => "HYP",
            InstrumentType::Thermal => "TIR",
            InstrumentType::RgbCamera => "RGB",
            InstrumentType::Lidar => "LID",
        }
    }

    /// Human-readable label; prefixes the default display name
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentType::Phenocam => "Phenocam",
            InstrumentType::Multispectral => "Multispectral Sensor",
            InstrumentType::Par => "PAR Sensor",
            InstrumentType::Ndvi => "NDVI Sensor",
            InstrumentType::Pri => "PRI Sensor",
            InstrumentType::Hyperspectral => "Hyperspectral Sensor",
            InstrumentType::Thermal => "Thermal Camera",
            InstrumentType::RgbCamera => "RGB Camera",
            InstrumentType::Lidar => "Lidar",
        }
    }
}

impl FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phenocam" => Ok(InstrumentType::Phenocam),
            "multispectral" | "multispectral_sensor" => Ok(InstrumentType::Multispectral),
            "par" | "par_sensor" => Ok(InstrumentType::Par),
            "ndvi" | "ndvi_sensor" => Ok(InstrumentType::Ndvi),
            "pri" | "pri_sensor" => Ok(InstrumentType::Pri),
            "hyperspectral" => Ok(InstrumentType::Hyperspectral),
            "thermal" => Ok(InstrumentType::Thermal),
            "rgb_camera" | "rgb" => Ok(InstrumentType::RgbCamera),
            "lidar" => Ok(InstrumentType::Lidar),
            other => Err(format!("unknown instrument type '{}'", other)),
        }
    }
}

/// Monitoring station, root of the hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: i64,
    pub acronym: String,
    pub display_name: String,
    pub description: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_m: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Platform mounted at a station
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Platform {
    pub id: i64,
    pub station_id: i64,
    pub normalized_name: String,
    pub display_name: String,
    pub platform_type: PlatformType,
    /// Ecosystem code, or vendor/agency code for uav and satellite platforms
    pub ecosystem_code: String,
    pub mount_type_code: String,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub platform_height_m: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Instrument mounted on a platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub id: i64,
    pub platform_id: i64,
    pub normalized_name: String,
    pub display_name: String,
    pub instrument_type: InstrumentType,
    pub type_code: String,
    pub status: String,
    /// Free-form attribute map (camera model, wavelengths, serial numbers, ...)
    pub specifications: serde_json::Map<String, serde_json::Value>,
    pub description: Option<String>,
    pub viewing_direction: Option<String>,
    pub azimuth_degrees: Option<f64>,
    pub height_m: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// One vertex of a ROI polygon, serialized as `[x, y]` in image coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeometryPoint(pub f64, pub f64);

/// Display color of a ROI outline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoiColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for RoiColor {
    fn default() -> Self {
        Self { r: 255, g: 0, b: 0 }
    }
}

/// Stored ROI status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiStatus {
    Active,
    Archived,
}

impl FromStr for RoiStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RoiStatus::Active),
            "archived" => Ok(RoiStatus::Archived),
            other => Err(format!("unknown ROI status '{}'", other)),
        }
    }
}

/// Lifecycle state derived from `status` and `is_legacy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiState {
    Active,
    Legacy,
    Archived,
}

/// How a caller may change a ROI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    DirectEdit,
    RequiresLegacyWorkflow,
    ReadOnly,
}

/// Region of interest on an instrument's image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Roi {
    pub id: i64,
    pub instrument_id: i64,
    pub roi_name: String,
    pub description: Option<String>,
    pub points: Vec<GeometryPoint>,
    pub color: RoiColor,
    pub alpha: f64,
    pub thickness: i64,
    pub status: RoiStatus,
    pub is_legacy: bool,
    pub legacy_date: Option<DateTime<Utc>>,
    pub legacy_reason: Option<String>,
    /// Weak forward reference to the ROI that superseded this one
    pub replaced_by_roi_id: Option<i64>,
    /// Advisory: measurements before and after the last geometry change are not comparable
    pub timeseries_broken: bool,
    pub source_image: Option<String>,
    pub auto_generated: bool,
    pub processing_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Roi {
    pub fn state(&self) -> RoiState {
        if self.is_legacy {
            RoiState::Legacy
        } else if self.status == RoiStatus::Archived {
            RoiState::Archived
        } else {
            RoiState::Active
        }
    }
}

/// Check a polygon: at least three finite, non-negative vertices
pub fn validate_geometry(points: &[GeometryPoint]) -> Result<(), String> {
    if points.len() < 3 {
        return Err(format!(
            "ROI geometry needs at least 3 points, got {}",
            points.len()
        ));
    }
    if let Some(bad) = points
        .iter()
        .find(|p| !p.0.is_finite() || !p.1.is_finite() || p.0 < 0.0 || p.1 < 0.0)
    {
        return Err(format!("invalid ROI point [{}, {}]", bad.0, bad.1));
    }
    Ok(())
}

/// Check display style values
pub fn validate_style(alpha: f64, thickness: i64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(format!("alpha must be within 0.0..=1.0, got {}", alpha));
    }
    if !(1..=50).contains(&thickness) {
        return Err(format!("thickness must be within 1..=50, got {}", thickness));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_type_codes() {
        assert_eq!(PlatformType::Fixed.default_mount_type_code(), "TWR");
        assert!(PlatformType::Fixed.accepts_mount_type_code("BLD"));
        assert!(!PlatformType::Fixed.accepts_mount_type_code("UAV"));
        assert!(PlatformType::Uav.accepts_mount_type_code("UAV"));
        assert!(!PlatformType::Uav.accepts_mount_type_code("TWR"));
    }

    #[test]
    fn test_compatibility_table() {
        assert!(PlatformType::Fixed.allowed_instruments().contains(&InstrumentType::Phenocam));
        assert!(!PlatformType::Satellite.allowed_instruments().contains(&InstrumentType::Phenocam));
        for t in PlatformType::Uav.auto_provisioned_instruments() {
            assert!(PlatformType::Uav.allowed_instruments().contains(t));
        }
    }

    #[test]
    fn test_roi_state_derivation() {
        let mut roi = Roi {
            id: 1,
            instrument_id: 1,
            roi_name: "ROI_01".to_string(),
            description: None,
            points: vec![GeometryPoint(0.0, 0.0), GeometryPoint(1.0, 0.0), GeometryPoint(1.0, 1.0)],
            color: RoiColor::default(),
            alpha: 0.3,
            thickness: 7,
            status: RoiStatus::Active,
            is_legacy: false,
            legacy_date: None,
            legacy_reason: None,
            replaced_by_roi_id: None,
            timeseries_broken: false,
            source_image: None,
            auto_generated: false,
            processing_enabled: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(roi.state(), RoiState::Active);
        roi.status = RoiStatus::Archived;
        assert_eq!(roi.state(), RoiState::Archived);
        roi.is_legacy = true;
        assert_eq!(roi.state(), RoiState::Legacy);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(validate_geometry(&[GeometryPoint(0.0, 0.0), GeometryPoint(1.0, 1.0)]).is_err());
        assert!(validate_geometry(&[
            GeometryPoint(0.0, 0.0),
            GeometryPoint(10.0, 0.0),
            GeometryPoint(-1.0, 5.0)
        ])
        .is_err());
        assert!(validate_style(0.5, 7).is_ok());
        assert!(validate_style(1.5, 7).is_err());
        assert!(validate_style(0.5, 0).is_err());
    }
}
