//! EFI Common Library
//!
//! Shared angle arithmetic, timing primitives, constants, configuration
//! loading, and error types used by every crate in the EFI workspace.
//!
//! # Module Structure
//!
//! - [`angle`] - Q16.16 crank-angle arithmetic, normalized modulo 720°
//! - [`timing`] - monotonic microsecond clock and running statistics
//! - [`consts`] - system-wide numeric constants
//! - [`config`] - TOML configuration loading and validation
//! - [`error`] - shared error taxonomy
//! - [`prelude`] - common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! efi = { package = "efi_common", path = "../efi_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use efi_common::prelude::*;
//! ```

pub mod angle;
pub mod config;
pub mod consts;
pub mod error;
pub mod prelude;
pub mod timing;
