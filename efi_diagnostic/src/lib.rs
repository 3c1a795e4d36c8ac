//! # Persisted configuration store
//!
//! Key-value layout for configuration the core reads at startup and the
//! diagnostic/tuning surfaces write back: one entry per key, each with a
//! fixed byte size and a version number the reader checks before trusting
//! the payload. Encode/decode only — no file or flash I/O, matching the
//! teacher's interface-only bridges.

use efi_common::config::{IgnitionConfig, InjectionConfig, SyncConfig};
use efi_engine_core::precision::PrecisionTier;
use thiserror::Error;

/// One persisted configuration key, each with its own fixed size and
/// current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SyncConfig,
    IgnitionConfig,
    InjectionConfig,
    EoitCalibration,
    EoitMap16x16,
    PrecisionTiers,
}

impl ConfigKey {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SyncConfig => "sync_config",
            Self::IgnitionConfig => "ignition_config",
            Self::InjectionConfig => "injection_config",
            Self::EoitCalibration => "eoit_calibration",
            Self::EoitMap16x16 => "eoit_map_16x16",
            Self::PrecisionTiers => "precision_tiers",
        }
    }

    pub const fn from_name(name: &str) -> Option<Self> {
        match name.as_bytes() {
            b"sync_config" => Some(Self::SyncConfig),
            b"ignition_config" => Some(Self::IgnitionConfig),
            b"injection_config" => Some(Self::InjectionConfig),
            b"eoit_calibration" => Some(Self::EoitCalibration),
            b"eoit_map_16x16" => Some(Self::EoitMap16x16),
            b"precision_tiers" => Some(Self::PrecisionTiers),
            _ => None,
        }
    }

    /// Current on-disk version for this key. Bumped whenever the encoded
    /// layout changes incompatibly.
    pub const fn version(&self) -> u8 {
        1
    }

    /// Fixed encoded payload size for this key.
    pub const fn size(&self) -> usize {
        match self {
            Self::SyncConfig => SYNC_CONFIG_LEN,
            Self::IgnitionConfig => IGNITION_CONFIG_LEN,
            Self::InjectionConfig => INJECTION_CONFIG_LEN,
            Self::EoitCalibration => EOIT_CALIBRATION_LEN,
            Self::EoitMap16x16 => EOIT_MAP_16X16_LEN,
            Self::PrecisionTiers => PRECISION_TIERS_LEN,
        }
    }

    /// Keys the core treats as optional: their absence from the store is
    /// not a load failure, unlike a missing required key.
    pub const fn optional(&self) -> bool {
        matches!(self, Self::PrecisionTiers)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
    #[error("key '{key}' expects {expected} bytes, got {actual}")]
    SizeMismatch { key: &'static str, expected: usize, actual: usize },
    #[error("key '{key}' version {got} is newer than the reader's supported version {supported}")]
    UnsupportedVersion { key: &'static str, got: u8, supported: u8 },
}

/// One on-disk entry: key, version, and encoded payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEntry {
    pub key: ConfigKey,
    pub version: u8,
    pub data: Vec<u8>,
}

impl PersistedEntry {
    pub fn new(key: ConfigKey, data: Vec<u8>) -> Result<Self, StoreError> {
        if data.len() != key.size() {
            return Err(StoreError::SizeMismatch { key: key.name(), expected: key.size(), actual: data.len() });
        }
        Ok(Self { key, version: key.version(), data })
    }

    /// Validate this entry is the size and version the reader expects.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.data.len() != self.key.size() {
            return Err(StoreError::SizeMismatch {
                key: self.key.name(),
                expected: self.key.size(),
                actual: self.data.len(),
            });
        }
        if self.version > self.key.version() {
            return Err(StoreError::UnsupportedVersion {
                key: self.key.name(),
                got: self.version,
                supported: self.key.version(),
            });
        }
        Ok(())
    }
}

// ─── sync_config ────────────────────────────────────────────────────

pub const SYNC_CONFIG_LEN: usize = 1 + 1 + 1 + 4 + 4 + 8;

pub fn encode_sync_config(cfg: &SyncConfig) -> [u8; SYNC_CONFIG_LEN] {
    let mut out = [0u8; SYNC_CONFIG_LEN];
    out[0] = cfg.tooth_count;
    out[1] = cfg.gap_teeth;
    out[2] = cfg.enable_cam_phase as u8;
    out[3..7].copy_from_slice(&cfg.min_rpm.to_be_bytes());
    out[7..11].copy_from_slice(&cfg.max_rpm.to_be_bytes());
    out[11..19].copy_from_slice(&cfg.tdc_offset_deg.to_be_bytes());
    out
}

pub fn decode_sync_config(bytes: &[u8]) -> Result<SyncConfig, StoreError> {
    expect_len(bytes, SYNC_CONFIG_LEN, "sync_config")?;
    Ok(SyncConfig {
        tooth_count: bytes[0],
        gap_teeth: bytes[1],
        enable_cam_phase: bytes[2] != 0,
        min_rpm: u32::from_be_bytes(bytes[3..7].try_into().unwrap()),
        max_rpm: u32::from_be_bytes(bytes[7..11].try_into().unwrap()),
        tdc_offset_deg: f64::from_be_bytes(bytes[11..19].try_into().unwrap()),
    })
}

// ─── ignition_config ────────────────────────────────────────────────

pub const IGNITION_CONFIG_LEN: usize = 4 + 4 + 8 + 8;

pub fn encode_ignition_config(cfg: &IgnitionConfig) -> [u8; IGNITION_CONFIG_LEN] {
    let mut out = [0u8; IGNITION_CONFIG_LEN];
    out[0..4].copy_from_slice(&cfg.dwell_us_min.to_be_bytes());
    out[4..8].copy_from_slice(&cfg.dwell_us_max.to_be_bytes());
    out[8..16].copy_from_slice(&cfg.min_advance_deg.to_be_bytes());
    out[16..24].copy_from_slice(&cfg.max_advance_deg.to_be_bytes());
    out
}

pub fn decode_ignition_config(bytes: &[u8]) -> Result<IgnitionConfig, StoreError> {
    expect_len(bytes, IGNITION_CONFIG_LEN, "ignition_config")?;
    Ok(IgnitionConfig {
        dwell_us_min: u32::from_be_bytes(bytes[0..4].try_into().unwrap()),
        dwell_us_max: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
        min_advance_deg: f64::from_be_bytes(bytes[8..16].try_into().unwrap()),
        max_advance_deg: f64::from_be_bytes(bytes[16..24].try_into().unwrap()),
    })
}

// ─── injection_config ───────────────────────────────────────────────

pub const INJECTION_CONFIG_LEN: usize = 4 + 4 + 8;

pub fn encode_injection_config(cfg: &InjectionConfig) -> [u8; INJECTION_CONFIG_LEN] {
    let mut out = [0u8; INJECTION_CONFIG_LEN];
    out[0..4].copy_from_slice(&cfg.pulsewidth_us_min.to_be_bytes());
    out[4..8].copy_from_slice(&cfg.pulsewidth_us_ceiling.to_be_bytes());
    out[8..16].copy_from_slice(&cfg.eoi_angle_deg.to_be_bytes());
    out
}

pub fn decode_injection_config(bytes: &[u8]) -> Result<InjectionConfig, StoreError> {
    expect_len(bytes, INJECTION_CONFIG_LEN, "injection_config")?;
    Ok(InjectionConfig {
        pulsewidth_us_min: u32::from_be_bytes(bytes[0..4].try_into().unwrap()),
        pulsewidth_us_ceiling: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
        eoi_angle_deg: f64::from_be_bytes(bytes[8..16].try_into().unwrap()),
    })
}

// ─── eoit_calibration ───────────────────────────────────────────────

pub const EOIT_CALIBRATION_LEN: usize = 2 + 2 + 2;

/// End-of-ion-trace (EOIT) knock-window calibration, each field scaled ×100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EoitCalibration {
    pub boundary_x100: i16,
    pub normal_x100: i16,
    pub fallback_x100: i16,
}

pub fn encode_eoit_calibration(cal: &EoitCalibration) -> [u8; EOIT_CALIBRATION_LEN] {
    let mut out = [0u8; EOIT_CALIBRATION_LEN];
    out[0..2].copy_from_slice(&cal.boundary_x100.to_be_bytes());
    out[2..4].copy_from_slice(&cal.normal_x100.to_be_bytes());
    out[4..6].copy_from_slice(&cal.fallback_x100.to_be_bytes());
    out
}

pub fn decode_eoit_calibration(bytes: &[u8]) -> Result<EoitCalibration, StoreError> {
    expect_len(bytes, EOIT_CALIBRATION_LEN, "eoit_calibration")?;
    Ok(EoitCalibration {
        boundary_x100: i16::from_be_bytes(bytes[0..2].try_into().unwrap()),
        normal_x100: i16::from_be_bytes(bytes[2..4].try_into().unwrap()),
        fallback_x100: i16::from_be_bytes(bytes[4..6].try_into().unwrap()),
    })
}

// ─── eoit_map_16x16 ─────────────────────────────────────────────────

pub const EOIT_MAP_DIM: usize = 16;
pub const EOIT_MAP_16X16_LEN: usize = EOIT_MAP_DIM * EOIT_MAP_DIM * 2;

pub fn encode_eoit_map(map: &[[i16; EOIT_MAP_DIM]; EOIT_MAP_DIM]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EOIT_MAP_16X16_LEN);
    for row in map {
        for cell in row {
            out.extend_from_slice(&cell.to_be_bytes());
        }
    }
    out
}

pub fn decode_eoit_map(bytes: &[u8]) -> Result<[[i16; EOIT_MAP_DIM]; EOIT_MAP_DIM], StoreError> {
    expect_len(bytes, EOIT_MAP_16X16_LEN, "eoit_map_16x16")?;
    let mut map = [[0i16; EOIT_MAP_DIM]; EOIT_MAP_DIM];
    for (rpm_idx, row) in map.iter_mut().enumerate() {
        for (load_idx, cell) in row.iter_mut().enumerate() {
            let offset = (rpm_idx * EOIT_MAP_DIM + load_idx) * 2;
            *cell = i16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap());
        }
    }
    Ok(map)
}

// ─── precision_tiers (optional) ────────────────────────────────────

pub const PRECISION_TIERS_COUNT: usize = 4;
pub const PRECISION_TIERS_LEN: usize = PRECISION_TIERS_COUNT * (4 + 4 + 4);

pub fn encode_precision_tiers(tiers: &[PrecisionTier; PRECISION_TIERS_COUNT]) -> [u8; PRECISION_TIERS_LEN] {
    let mut out = [0u8; PRECISION_TIERS_LEN];
    for (i, tier) in tiers.iter().enumerate() {
        let base = i * 12;
        out[base..base + 4].copy_from_slice(&tier.rpm_threshold.to_be_bytes());
        out[base + 4..base + 8].copy_from_slice(&tier.timer_resolution_hz.to_be_bytes());
        out[base + 8..base + 12].copy_from_slice(&tier.angular_tolerance_mdeg.to_be_bytes());
    }
    out
}

pub fn decode_precision_tiers(bytes: &[u8]) -> Result<[PrecisionTier; PRECISION_TIERS_COUNT], StoreError> {
    expect_len(bytes, PRECISION_TIERS_LEN, "precision_tiers")?;
    Ok(std::array::from_fn(|i| {
        let base = i * 12;
        PrecisionTier {
            rpm_threshold: u32::from_be_bytes(bytes[base..base + 4].try_into().unwrap()),
            timer_resolution_hz: u32::from_be_bytes(bytes[base + 4..base + 8].try_into().unwrap()),
            angular_tolerance_mdeg: u32::from_be_bytes(bytes[base + 8..base + 12].try_into().unwrap()),
        }
    }))
}

fn expect_len(bytes: &[u8], expected: usize, key: &'static str) -> Result<(), StoreError> {
    if bytes.len() != expected {
        return Err(StoreError::SizeMismatch { key, expected, actual: bytes.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in [
            ConfigKey::SyncConfig,
            ConfigKey::IgnitionConfig,
            ConfigKey::InjectionConfig,
            ConfigKey::EoitCalibration,
            ConfigKey::EoitMap16x16,
            ConfigKey::PrecisionTiers,
        ] {
            assert_eq!(ConfigKey::from_name(key.name()), Some(key));
        }
        assert_eq!(ConfigKey::from_name("nonexistent"), None);
    }

    #[test]
    fn only_precision_tiers_is_optional() {
        assert!(ConfigKey::PrecisionTiers.optional());
        assert!(!ConfigKey::SyncConfig.optional());
    }

    #[test]
    fn sync_config_round_trips() {
        let cfg = SyncConfig {
            tooth_count: 60,
            gap_teeth: 2,
            enable_cam_phase: true,
            min_rpm: 150,
            max_rpm: 9000,
            tdc_offset_deg: 12.5,
        };
        let bytes = encode_sync_config(&cfg);
        let decoded = decode_sync_config(&bytes).unwrap();
        assert_eq!(decoded.tooth_count, cfg.tooth_count);
        assert_eq!(decoded.enable_cam_phase, cfg.enable_cam_phase);
        assert!((decoded.tdc_offset_deg - cfg.tdc_offset_deg).abs() < 1e-12);
    }

    #[test]
    fn ignition_config_round_trips() {
        let cfg = IgnitionConfig {
            dwell_us_min: 1500,
            dwell_us_max: 5000,
            min_advance_deg: -10.0,
            max_advance_deg: 45.0,
        };
        let decoded = decode_ignition_config(&encode_ignition_config(&cfg)).unwrap();
        assert_eq!(decoded.dwell_us_min, cfg.dwell_us_min);
        assert!((decoded.max_advance_deg - cfg.max_advance_deg).abs() < 1e-12);
    }

    #[test]
    fn eoit_calibration_round_trips() {
        let cal = EoitCalibration { boundary_x100: 150, normal_x100: 200, fallback_x100: 50 };
        let decoded = decode_eoit_calibration(&encode_eoit_calibration(&cal)).unwrap();
        assert_eq!(decoded, cal);
    }

    #[test]
    fn eoit_map_round_trips_every_cell() {
        let mut map = [[0i16; EOIT_MAP_DIM]; EOIT_MAP_DIM];
        for (r, row) in map.iter_mut().enumerate() {
            for (l, cell) in row.iter_mut().enumerate() {
                *cell = (r as i16) * 100 - (l as i16);
            }
        }
        let bytes = encode_eoit_map(&map);
        assert_eq!(bytes.len(), EOIT_MAP_16X16_LEN);
        let decoded = decode_eoit_map(&bytes).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn precision_tiers_round_trip() {
        let tiers: [PrecisionTier; PRECISION_TIERS_COUNT] = std::array::from_fn(|i| PrecisionTier {
            rpm_threshold: (i as u32 + 1) * 1000,
            timer_resolution_hz: 1_000_000,
            angular_tolerance_mdeg: 200 + i as u32 * 100,
        });
        let decoded = decode_precision_tiers(&encode_precision_tiers(&tiers)).unwrap();
        assert_eq!(decoded, tiers);
    }

    #[test]
    fn persisted_entry_rejects_wrong_size() {
        let err = PersistedEntry::new(ConfigKey::EoitCalibration, vec![0u8; 3]).unwrap_err();
        assert!(matches!(err, StoreError::SizeMismatch { .. }));
    }

    #[test]
    fn persisted_entry_rejects_future_version() {
        let mut entry = PersistedEntry::new(ConfigKey::EoitCalibration, vec![0u8; EOIT_CALIBRATION_LEN]).unwrap();
        entry.version = ConfigKey::EoitCalibration.version() + 1;
        assert!(matches!(entry.validate(), Err(StoreError::UnsupportedVersion { .. })));
    }
}
