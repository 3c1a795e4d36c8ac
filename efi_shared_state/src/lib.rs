//! Cross-core shared state for the EFI engine-control core.
//!
//! This crate is the single boundary where Core 0 (tooth-edge ISR and
//! scheduler scan) and Core 1 (planner and non-real-time collaborators)
//! touch the same memory. Everything here follows one of two disciplines:
//!
//! - **Single-writer snapshot** ([`snapshot::SnapshotCell`]): the decoder
//!   publishes, everyone else reads a consistent copy.
//! - **Short critical section** ([`queue::EventQueue`]): both cores may
//!   write, but only ever while holding the queue's lock for one bounded
//!   linear scan.
//!
//! On the real dual-core target this crate's lock would be backed by a
//! hardware spinlock or an interrupt-disable critical section instead of
//! [`parking_lot::Mutex`]; call sites do not need to know the difference.

pub mod counters;
pub mod queue;
pub mod snapshot;

pub use counters::{FaultCounters, FaultCountersSnapshot};
pub use queue::{EngineEvent, EventQueue, EventType};
pub use snapshot::{SnapshotCell, SyncSnapshot};

/// Initialize tracing for RT-adjacent logging (planner/telemetry side only
/// — Core 0 code never logs directly, see [`counters`]).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
