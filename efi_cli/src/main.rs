//! # Serial maintenance CLI bridge
//!
//! Parses one sample command line and renders one sample stream row. The
//! real bridge would instead read lines from a serial device and dispatch
//! them against live engine state — out of scope here, matching the
//! teacher's dashboard binary that stops at endpoint construction.

use efi_cli::{parse_line, StreamSample, STREAM_CSV_HEADER};
use tracing::info;

fn main() {
    tracing_subscriber::fmt().compact().init();
    info!("EFI serial CLI starting...");

    match parse_line("sensors watch") {
        Ok(cmd) => info!("parsed sample command: {cmd:?}"),
        Err(e) => info!("parse failed: {e}"),
    }

    info!("default stream header: {STREAM_CSV_HEADER}");
    let sample = StreamSample {
        time_s: 0.0,
        rpm: 800,
        map_kpa: 40.0,
        tps_pct: 0.0,
        clt_c: 85,
        iat_c: 25,
        advance_deg: 18.0,
        pw_us: 3100,
        lambda: 1.0,
    };
    info!("sample stream row: {}", sample.to_csv_row());

    info!("CLI bridge initialized — placeholder (no serial I/O loop)");
}
