//! # EFI HAL
//!
//! Hardware abstraction for the output stage: a small absolute-compare
//! timer capability trait, a deterministic host-side simulation driver,
//! and a constructor-injected registry for swapping backends.
//!
//! # Module Structure
//!
//! - [`driver`] - `OutputChannelDriver` trait and `HalError`
//! - [`simulation`] - deterministic test/host backend
//! - [`registry`] - driver-factory registry

pub mod driver;
pub mod registry;
pub mod simulation;

pub use driver::{ChannelDriverFactory, HalError, OutputChannelDriver};
pub use registry::ChannelRegistry;
pub use simulation::SimulationChannel;
