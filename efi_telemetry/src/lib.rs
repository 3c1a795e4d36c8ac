//! # Supervision telemetry wire protocol
//!
//! Byte-exact frame and message definitions for the link between the core
//! and an external supervision host. This crate defines the wire format
//! only — encode, decode, and checksum — the way the teacher's SHM segment
//! modules pin an exact byte layout and round-trip it in tests. There is no
//! socket or serial I/O loop here; a collaborator owning the transport
//! builds frames with [`Frame::new`] and hands the encoded bytes to
//! whatever link it manages.
//!
//! Frame layout (8-byte header + payload, big-endian multi-byte fields):
//!
//! | Field          | Type | Notes                               |
//! |----------------|------|--------------------------------------|
//! | `msg_type`     | u8   | see [`MessageType`]                  |
//! | `version`      | u8   | always 1                             |
//! | `msg_id`       | u16  | sender-assigned, opaque here          |
//! | `payload_len`  | u16  | length of the payload that follows    |
//! | `flags`        | u8   | see [`FrameFlags`]                    |
//! | `xor_checksum` | u8   | XOR of header+payload, this byte = 0  |

use bitflags::bitflags;
use thiserror::Error;

/// Header size in bytes: msg_type + version + msg_id + payload_len + flags + checksum.
pub const HEADER_LEN: usize = 8;

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_LEN: usize = 232;

pub const PROTOCOL_VERSION: u8 = 1;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        const ACK_REQUIRED = 0b0000_0001;
        const HIGH_PRIORITY = 0b0000_0010;
        const ENCRYPTED = 0b0000_0100;
    }
}

/// Supervision message kinds carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    EngineStatus = 0x01,
    SensorData = 0x02,
    Diagnostic = 0x03,
    ConfigRequest = 0x10,
    ConfigResponse = 0x11,
    TableUpdate = 0x12,
    ParamSet = 0x13,
    Ack = 0xFF,
}

impl MessageType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::EngineStatus),
            0x02 => Some(Self::SensorData),
            0x03 => Some(Self::Diagnostic),
            0x10 => Some(Self::ConfigRequest),
            0x11 => Some(Self::ConfigResponse),
            0x12 => Some(Self::TableUpdate),
            0x13 => Some(Self::ParamSet),
            0xFF => Some(Self::Ack),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },
    #[error("payload_len {declared} does not match {actual} bytes available")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("payload of {len} bytes exceeds MAX_PAYLOAD_LEN ({MAX_PAYLOAD_LEN})")]
    PayloadTooLarge { len: usize },
    #[error("checksum mismatch: frame declares {declared:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { declared: u8, computed: u8 },
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),
}

/// A decoded frame header plus its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub version: u8,
    pub msg_id: u16,
    pub flags: FrameFlags,
    pub payload: Vec<u8>,
}

fn xor_checksum(header_without_checksum: &[u8; HEADER_LEN - 1], payload: &[u8]) -> u8 {
    let mut acc = 0u8;
    for b in header_without_checksum {
        acc ^= b;
    }
    for b in payload {
        acc ^= b;
    }
    acc
}

impl Frame {
    pub fn new(msg_type: MessageType, msg_id: u16, flags: FrameFlags, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge { len: payload.len() });
        }
        Ok(Self {
            msg_type: msg_type as u8,
            version: PROTOCOL_VERSION,
            msg_id,
            flags,
            payload,
        })
    }

    /// Encode to wire bytes: header (checksum computed) followed by payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u16;
        let mut head = [0u8; HEADER_LEN - 1];
        head[0] = self.msg_type;
        head[1] = self.version;
        head[2..4].copy_from_slice(&self.msg_id.to_be_bytes());
        head[4..6].copy_from_slice(&payload_len.to_be_bytes());
        head[6] = self.flags.bits();

        let checksum = xor_checksum(&head, &self.payload);

        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&head);
        out.push(checksum);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::TooShort { need: HEADER_LEN, got: bytes.len() });
        }
        let msg_type = bytes[0];
        let version = bytes[1];
        let msg_id = u16::from_be_bytes([bytes[2], bytes[3]]);
        let payload_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        let flags = FrameFlags::from_bits_truncate(bytes[6]);
        let declared_checksum = bytes[7];

        let payload = &bytes[HEADER_LEN..];
        if payload.len() != payload_len {
            return Err(FrameError::LengthMismatch { declared: payload_len, actual: payload.len() });
        }
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge { len: payload_len });
        }

        let mut head = [0u8; HEADER_LEN - 1];
        head.copy_from_slice(&bytes[..HEADER_LEN - 1]);
        let computed = xor_checksum(&head, payload);
        if computed != declared_checksum {
            return Err(FrameError::ChecksumMismatch { declared: declared_checksum, computed });
        }

        Ok(Self {
            msg_type,
            version,
            msg_id,
            flags,
            payload: payload.to_vec(),
        })
    }

    pub fn message_type(&self) -> Result<MessageType, FrameError> {
        MessageType::from_u8(self.msg_type).ok_or(FrameError::UnknownMessageType(self.msg_type))
    }
}

/// Fixed-layout engine-status payload, emitted at 10 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatusPayload {
    pub rpm: u16,
    pub map_kpa_x10: u16,
    pub clt_c_x10: i16,
    pub iat_c_x10: i16,
    pub tps_pct_x10: u16,
    pub vbat_mv: u16,
    pub sync_status: u8,
    pub limp_mode: u8,
    pub advance_deg_x10: u16,
    pub pw_us: u16,
    pub lambda_target_x1000: u16,
    pub lambda_measured_x1000: u16,
    pub timestamp_ms: u32,
}

/// Encoded size of [`EngineStatusPayload`] in bytes.
pub const ENGINE_STATUS_PAYLOAD_LEN: usize = 26;

impl EngineStatusPayload {
    pub fn to_bytes(&self) -> [u8; ENGINE_STATUS_PAYLOAD_LEN] {
        let mut out = [0u8; ENGINE_STATUS_PAYLOAD_LEN];
        out[0..2].copy_from_slice(&self.rpm.to_be_bytes());
        out[2..4].copy_from_slice(&self.map_kpa_x10.to_be_bytes());
        out[4..6].copy_from_slice(&self.clt_c_x10.to_be_bytes());
        out[6..8].copy_from_slice(&self.iat_c_x10.to_be_bytes());
        out[8..10].copy_from_slice(&self.tps_pct_x10.to_be_bytes());
        out[10..12].copy_from_slice(&self.vbat_mv.to_be_bytes());
        out[12] = self.sync_status;
        out[13] = self.limp_mode;
        out[14..16].copy_from_slice(&self.advance_deg_x10.to_be_bytes());
        out[16..18].copy_from_slice(&self.pw_us.to_be_bytes());
        out[18..20].copy_from_slice(&self.lambda_target_x1000.to_be_bytes());
        out[20..22].copy_from_slice(&self.lambda_measured_x1000.to_be_bytes());
        out[22..26].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != ENGINE_STATUS_PAYLOAD_LEN {
            return Err(FrameError::LengthMismatch {
                declared: ENGINE_STATUS_PAYLOAD_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            rpm: u16::from_be_bytes([bytes[0], bytes[1]]),
            map_kpa_x10: u16::from_be_bytes([bytes[2], bytes[3]]),
            clt_c_x10: i16::from_be_bytes([bytes[4], bytes[5]]),
            iat_c_x10: i16::from_be_bytes([bytes[6], bytes[7]]),
            tps_pct_x10: u16::from_be_bytes([bytes[8], bytes[9]]),
            vbat_mv: u16::from_be_bytes([bytes[10], bytes[11]]),
            sync_status: bytes[12],
            limp_mode: bytes[13],
            advance_deg_x10: u16::from_be_bytes([bytes[14], bytes[15]]),
            pw_us: u16::from_be_bytes([bytes[16], bytes[17]]),
            lambda_target_x1000: u16::from_be_bytes([bytes[18], bytes[19]]),
            lambda_measured_x1000: u16::from_be_bytes([bytes[20], bytes[21]]),
            timestamp_ms: u32::from_be_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]),
        })
    }
}
