//! # Engine control unit supervisor
//!
//! Process entry point: builds the engine core, spawns the Core 0 and
//! Core 1 threads, logs a periodic heartbeat, and on a shutdown signal
//! brings the engine down (cancel all pending events, force every
//! output channel low) before exiting.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use efi_common::config::{ConfigLoader, EngineConfig};
use efi_ecu::EfiSupervisor;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "efi_ecu")]
#[command(author = "RTS007")]
#[command(version)]
struct Args {
    /// Path to the engine configuration TOML file.
    #[arg(short, long, default_value = efi_common::consts::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Heartbeat log interval, in seconds.
    #[arg(long, default_value_t = 5)]
    heartbeat_secs: u64,
}

#[tokio::main]
async fn main() {
    efi_shared_state::init_tracing();

    let args = Args::parse();
    info!("starting EFI engine control unit supervisor");

    let config = EngineConfig::load(&args.config).unwrap_or_else(|e| {
        info!("falling back to default engine configuration: {e}");
        EngineConfig::default()
    });
    if let Err(e) = config.validate() {
        info!("configuration invalid, using defaults instead: {e}");
    }

    let mut supervisor = EfiSupervisor::new(config);
    supervisor.spawn_cores();
    info!("core 0 (decoder/scheduler) and core 1 (planner) threads running");

    let mut heartbeat = tokio::time::interval(Duration::from_secs(args.heartbeat_secs));
    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let stats = supervisor.engine_stats();
                info!(
                    "heartbeat: rpm={} sync_acquired={} limp_mode={} sync_losses={} tooth_period_us={} gap_period_us={} cam_seen={} latency_us={}",
                    stats.rpm,
                    stats.sync_acquired,
                    stats.limp_mode,
                    stats.counters.sync_loss,
                    stats.sync_snapshot.tooth_period_us,
                    stats.sync_snapshot.gap_period_us,
                    stats.sync_snapshot.cam_seen,
                    stats.sync_snapshot.latency_estimate_us,
                );
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("received shutdown signal"),
                    Err(err) => error!("unable to listen for shutdown signal: {err}"),
                }
                break;
            }
        }
    }

    let stats = supervisor.engine_stats();
    info!(
        "final stats: rpm={} sync_acquired={} limp_mode={} sync_losses={} queue_full={} dwell_guard_skips={} over_ceiling_skips={} noise_rejected={}",
        stats.rpm,
        stats.sync_acquired,
        stats.limp_mode,
        stats.counters.sync_loss,
        stats.counters.queue_full,
        stats.counters.skip_dwell_guard,
        stats.counters.skip_over_ceiling,
        stats.counters.tooth_noise_rejected,
    );

    supervisor.graceful_shutdown();
    info!("supervisor shutdown complete");
}
