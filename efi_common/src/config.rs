//! Configuration loading traits and types.
//!
//! Standardized TOML configuration loading shared by every EFI workspace
//! binary, plus the engine-specific configuration consumed by
//! `efi_engine_core` and `efi_planner`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use efi_common::config::{ConfigLoader, EngineConfig};
//! use std::path::Path;
//!
//! let cfg = EngineConfig::load(Path::new("engine.toml")).expect("load engine config");
//! cfg.validate().expect("valid engine config");
//! ```

use crate::consts;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Log level for configuration (replaces `log::Level`).
///
/// Serializes to lowercase strings: "trace", "debug", "info", "warn", "error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("configuration file not found")]
    FileNotFound,

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns [`ConfigError::FileNotFound`] if the file does not exist.
/// - Returns [`ConfigError::ParseError`] if TOML syntax is invalid.
/// - Does **not** validate; callers must call `validate()` separately.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Common configuration fields shared across all EFI workspace binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    pub service_name: String,
}

impl SharedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Engine configuration ───────────────────────────────────────────

fn default_tooth_count() -> u8 {
    consts::TOOTH_COUNT_DEFAULT
}

fn default_gap_teeth() -> u8 {
    consts::GAP_TEETH_DEFAULT
}

fn default_min_rpm() -> u32 {
    consts::RPM_MIN_DEFAULT
}

fn default_max_rpm() -> u32 {
    consts::RPM_MAX_DEFAULT
}

/// Crank decoder / synchronizer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_tooth_count")]
    pub tooth_count: u8,
    #[serde(default = "default_gap_teeth")]
    pub gap_teeth: u8,
    #[serde(default)]
    pub enable_cam_phase: bool,
    #[serde(default = "default_min_rpm")]
    pub min_rpm: u32,
    #[serde(default = "default_max_rpm")]
    pub max_rpm: u32,
    /// Angular distance from the missing-tooth gap to cylinder 1 TDC, degrees.
    #[serde(default)]
    pub tdc_offset_deg: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tooth_count: default_tooth_count(),
            gap_teeth: default_gap_teeth(),
            enable_cam_phase: true,
            min_rpm: default_min_rpm(),
            max_rpm: default_max_rpm(),
            tdc_offset_deg: 0.0,
        }
    }
}

/// Ignition-path configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IgnitionConfig {
    #[serde(default = "default_dwell_min")]
    pub dwell_us_min: u32,
    #[serde(default = "default_dwell_max")]
    pub dwell_us_max: u32,
    #[serde(default)]
    pub min_advance_deg: f64,
    #[serde(default = "default_max_advance")]
    pub max_advance_deg: f64,
}

fn default_dwell_min() -> u32 {
    consts::IGN_DWELL_US_MIN
}

fn default_dwell_max() -> u32 {
    consts::IGN_DWELL_US_MAX
}

fn default_max_advance() -> f64 {
    45.0
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            dwell_us_min: default_dwell_min(),
            dwell_us_max: default_dwell_max(),
            min_advance_deg: -10.0,
            max_advance_deg: default_max_advance(),
        }
    }
}

/// Injection-path configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InjectionConfig {
    #[serde(default = "default_pw_min")]
    pub pulsewidth_us_min: u32,
    #[serde(default = "default_pw_ceiling")]
    pub pulsewidth_us_ceiling: u32,
    /// End-of-injection angle, degrees after cylinder-1 TDC.
    #[serde(default = "default_eoi")]
    pub eoi_angle_deg: f64,
}

fn default_pw_min() -> u32 {
    500
}

fn default_pw_ceiling() -> u32 {
    consts::INJECTOR_PULSEWIDTH_CEILING_US
}

fn default_eoi() -> f64 {
    280.0
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            pulsewidth_us_min: default_pw_min(),
            pulsewidth_us_ceiling: default_pw_ceiling(),
            eoi_angle_deg: default_eoi(),
        }
    }
}

/// Root engine configuration loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ignition: IgnitionConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    /// Per-cylinder TDC angle, degrees within the 720° cycle.
    #[serde(default = "default_cylinder_tdc_deg")]
    pub cylinder_tdc_deg: [f64; consts::CYLINDER_COUNT],
}

fn default_cylinder_tdc_deg() -> [f64; consts::CYLINDER_COUNT] {
    [0.0, 180.0, 360.0, 540.0]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "efi_ecu".to_string(),
            },
            sync: SyncConfig::default(),
            ignition: IgnitionConfig::default(),
            injection: InjectionConfig::default(),
            cylinder_tdc_deg: default_cylinder_tdc_deg(),
        }
    }
}

impl EngineConfig {
    /// Validate cross-field invariants not expressible through serde alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for any out-of-range or
    /// internally inconsistent field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.sync.tooth_count == 0 || self.sync.tooth_count <= self.sync.gap_teeth {
            return Err(ConfigError::ValidationError(
                "tooth_count must exceed gap_teeth".to_string(),
            ));
        }
        if self.sync.min_rpm >= self.sync.max_rpm {
            return Err(ConfigError::ValidationError(
                "min_rpm must be less than max_rpm".to_string(),
            ));
        }
        if self.ignition.dwell_us_min >= self.ignition.dwell_us_max {
            return Err(ConfigError::ValidationError(
                "dwell_us_min must be less than dwell_us_max".to_string(),
            ));
        }
        if self.injection.pulsewidth_us_min >= self.injection.pulsewidth_us_ceiling {
            return Err(ConfigError::ValidationError(
                "pulsewidth_us_min must be less than pulsewidth_us_ceiling".to_string(),
            ));
        }
        for (i, tdc) in self.cylinder_tdc_deg.iter().enumerate() {
            if !(0.0..720.0).contains(tdc) {
                return Err(ConfigError::ValidationError(format!(
                    "cylinder_tdc_deg[{i}] must be within [0, 720)"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: String::new(),
        }
    }
}
