//! Prelude module for common re-exports.
//!
//! Lets consumers do `use efi_common::prelude::*;` and get the most
//! frequently used types without listing individual paths.

// ─── Angle arithmetic ───────────────────────────────────────────────
pub use crate::angle::{angle_distance_to_delay_us, Angle, CYCLE_DEG};

// ─── Timing ─────────────────────────────────────────────────────────
pub use crate::timing::{deadline_passed, elapsed_us, now_us, RunningStats};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, EngineConfig, LogLevel, SharedConfig};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::EngineError;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYLINDER_COUNT, EVENT_QUEUE_CAPACITY};
