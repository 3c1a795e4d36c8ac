//! # Supervision telemetry bridge
//!
//! Builds one [`EngineStatusPayload`] frame from a freshly constructed
//! engine core and logs its encoded size. The real bridge would instead
//! read a live core snapshot every 100 ms and hand the encoded bytes to a
//! socket or serial link — that transport is out of scope here, matching
//! the teacher's thin bridge binaries that attach/create their endpoints
//! and stop short of the actual I/O loop.

use efi_common::config::EngineConfig;
use efi_common::consts::CYLINDER_COUNT;
use efi_engine_core::output::OutputStage;
use efi_engine_core::EngineCore;
use efi_hal::{OutputChannelDriver, SimulationChannel};
use efi_telemetry::{EngineStatusPayload, Frame, FrameFlags, MessageType};
use tracing::info;

fn main() {
    tracing_subscriber::fmt().compact().init();
    info!("EFI telemetry bridge starting...");

    let config = EngineConfig::default();
    let injectors: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let ignition: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let output = OutputStage::new(
        injectors,
        ignition,
        efi_engine_core::default_latency_model(),
        config.ignition,
        config.injection,
    );
    let engine = EngineCore::new(config, output);

    let status = EngineStatusPayload {
        rpm: engine.rpm().min(u16::MAX as u32) as u16,
        map_kpa_x10: 0,
        clt_c_x10: 0,
        iat_c_x10: 0,
        tps_pct_x10: 0,
        vbat_mv: 0,
        sync_status: engine.sync_valid() as u8,
        limp_mode: engine.limp_mode_active() as u8,
        advance_deg_x10: 0,
        pw_us: 0,
        lambda_target_x1000: 1000,
        lambda_measured_x1000: 1000,
        timestamp_ms: 0,
    };

    let frame = Frame::new(
        MessageType::EngineStatus,
        0,
        FrameFlags::empty(),
        status.to_bytes().to_vec(),
    )
    .expect("engine-status payload always fits within MAX_PAYLOAD_LEN");
    let bytes = frame.to_bytes();

    info!("encoded engine-status frame: {} bytes (10 Hz cadence)", bytes.len());
    info!("telemetry bridge initialized — placeholder (no transport loop)");
}
