//! # Tuning session bridge
//!
//! Builds the handshake frames a tuning host would exchange with the core
//! (`Hello` → `Hello-Ack` → `Auth` → `Auth-Ack`) and logs their encoded
//! size, without opening a socket or serial port. A real bridge terminates
//! the handshake, validates the auth response, and forwards parameter and
//! table messages onward — out of scope here, the way the teacher's
//! gateway binaries stop at endpoint construction.

use efi_tuning::{StreamFraming, StreamStartMessage, TuningFrame, TuningMessageType};
use tracing::info;

fn main() {
    tracing_subscriber::fmt().compact().init();
    info!("EFI tuning bridge starting...");

    let hello = TuningFrame::new(TuningMessageType::Hello, vec![]);
    info!("Hello frame: {} bytes", hello.to_bytes().len());

    let challenge = TuningFrame::new(TuningMessageType::HelloAck, vec![0xAB; 8]);
    info!("Hello-Ack frame: {} bytes", challenge.to_bytes().len());

    let stream = StreamStartMessage { interval_ms: 100, framing: StreamFraming::Csv };
    let stream_frame = TuningFrame::new(TuningMessageType::StreamStart, stream.to_bytes().to_vec());
    info!(
        "default stream request: {} ms interval, {} bytes",
        stream.interval_ms,
        stream_frame.to_bytes().len()
    );

    info!("tuning bridge initialized — placeholder (no session loop)");
}
