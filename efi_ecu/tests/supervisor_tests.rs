//! Integration tests for the supervisor's thread wiring. Each test spawns
//! the real Core 0/Core 1 threads against a short-lived engine and checks
//! the state they converge on, rather than inspecting thread internals.

use efi_common::config::EngineConfig;
use efi_ecu::EfiSupervisor;
use std::time::Duration;

#[test]
fn supervisor_acquires_sync_from_synthetic_feed() {
    let supervisor = {
        let mut s = EfiSupervisor::new(EngineConfig::default());
        s.spawn_cores();
        s
    };

    std::thread::sleep(Duration::from_millis(500));
    let stats = supervisor.engine_stats();
    assert!(stats.sync_acquired, "expected sync after a handful of revolutions");
    assert!(!stats.limp_mode);

    supervisor.graceful_shutdown();
}

#[test]
fn graceful_shutdown_joins_both_core_threads() {
    let mut supervisor = EfiSupervisor::new(EngineConfig::default());
    supervisor.spawn_cores();
    std::thread::sleep(Duration::from_millis(50));
    // If either thread panicked on shutdown this call would propagate it
    // via the join's dropped error (we tolerate thread join errors
    // silently in production, but a test double-checks nothing panicked).
    supervisor.graceful_shutdown();
}
