//! # Wideband-lambda CAN client
//!
//! Decodes `(can_id, dlc, bytes)` CAN frames from a wideband lambda
//! controller into a lambda reading, and encodes/decodes the in-band
//! tuning commands the same bus carries. Frame types and decode logic
//! only — no socket/CAN adapter I/O, matching the teacher's other
//! interface-only bridges.

use thiserror::Error;

/// One of the three wideband protocols this client recognizes, detected by
/// `(can_id, dlc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidebandProtocol {
    AemX,
    Innovate,
    Haltech,
}

struct ProtocolSpec {
    protocol: WidebandProtocol,
    can_id: u16,
    dlc: u8,
    afr_offset: usize,
    status_offset: usize,
}

const PROTOCOL_TABLE: [ProtocolSpec; 3] = [
    ProtocolSpec { protocol: WidebandProtocol::AemX, can_id: 0x180, dlc: 8, afr_offset: 0, status_offset: 2 },
    ProtocolSpec { protocol: WidebandProtocol::Innovate, can_id: 0x3E8, dlc: 8, afr_offset: 4, status_offset: 6 },
    ProtocolSpec { protocol: WidebandProtocol::Haltech, can_id: 0x430, dlc: 6, afr_offset: 0, status_offset: 5 },
];

/// Divisor converting raw AFR counts into lambda (gasoline stoichiometric AFR).
pub const STOICH_AFR: f64 = 14.7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanError {
    #[error("no known wideband protocol matches can_id {can_id:#05x} dlc {dlc}")]
    UnrecognizedProtocol { can_id: u16, dlc: u8 },
    #[error("frame too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },
    #[error("status byte indicates sensor not ready")]
    NotReady,
}

/// A decoded wideband lambda sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaReading {
    pub protocol: WidebandProtocol,
    pub afr_raw: u16,
    pub lambda: f64,
    pub captured_at_us: u64,
}

/// Detect which wideband protocol, if any, matches `(can_id, dlc)`.
pub fn detect_protocol(can_id: u16, dlc: u8) -> Option<WidebandProtocol> {
    PROTOCOL_TABLE
        .iter()
        .find(|spec| spec.can_id == can_id && spec.dlc == dlc)
        .map(|spec| spec.protocol)
}

/// Decode a wideband-lambda CAN frame captured at `now_us`.
pub fn decode_lambda_frame(can_id: u16, dlc: u8, data: &[u8], now_us: u64) -> Result<LambdaReading, CanError> {
    let spec = PROTOCOL_TABLE
        .iter()
        .find(|spec| spec.can_id == can_id && spec.dlc == dlc)
        .ok_or(CanError::UnrecognizedProtocol { can_id, dlc })?;

    let need = (spec.afr_offset + 2).max(spec.status_offset + 1);
    if data.len() < need {
        return Err(CanError::TooShort { need, got: data.len() });
    }

    let status = data[spec.status_offset];
    if status & 0x01 == 0 {
        return Err(CanError::NotReady);
    }

    let afr_raw = u16::from_be_bytes([data[spec.afr_offset], data[spec.afr_offset + 1]]);
    let lambda = afr_raw as f64 / STOICH_AFR;

    Ok(LambdaReading {
        protocol: spec.protocol,
        afr_raw,
        lambda,
        captured_at_us: now_us,
    })
}

/// In-band tuning commands carried on a reserved request CAN id, with
/// responses on the matching response id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuningCommand {
    SetEoitCalibration { boundary_x100: i16, normal_x100: i16, fallback_x100: i16 },
    EnableMapTable,
    DisableMapTable,
    SetMapCell { rpm_idx: u8, load_idx: u8, normal_value: i16 },
    GetDiagnostic,
    GetCalibration,
}

const CMD_SET_EOIT_CALIBRATION: u8 = 0x01;
const CMD_ENABLE_MAP_TABLE: u8 = 0x02;
const CMD_DISABLE_MAP_TABLE: u8 = 0x03;
const CMD_SET_MAP_CELL: u8 = 0x04;
const CMD_GET_DIAGNOSTIC: u8 = 0x05;
const CMD_GET_CALIBRATION: u8 = 0x06;

impl TuningCommand {
    fn opcode(&self) -> u8 {
        match self {
            Self::SetEoitCalibration { .. } => CMD_SET_EOIT_CALIBRATION,
            Self::EnableMapTable => CMD_ENABLE_MAP_TABLE,
            Self::DisableMapTable => CMD_DISABLE_MAP_TABLE,
            Self::SetMapCell { .. } => CMD_SET_MAP_CELL,
            Self::GetDiagnostic => CMD_GET_DIAGNOSTIC,
            Self::GetCalibration => CMD_GET_CALIBRATION,
        }
    }

    /// Encode to an 8-byte CAN payload, command byte first.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.opcode();
        match self {
            Self::SetEoitCalibration { boundary_x100, normal_x100, fallback_x100 } => {
                out[1..3].copy_from_slice(&boundary_x100.to_be_bytes());
                out[3..5].copy_from_slice(&normal_x100.to_be_bytes());
                out[5..7].copy_from_slice(&fallback_x100.to_be_bytes());
            }
            Self::SetMapCell { rpm_idx, load_idx, normal_value } => {
                out[1] = *rpm_idx;
                out[2] = *load_idx;
                out[3..5].copy_from_slice(&normal_value.to_be_bytes());
            }
            Self::EnableMapTable | Self::DisableMapTable | Self::GetDiagnostic | Self::GetCalibration => {}
        }
        out
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        match data[0] {
            CMD_SET_EOIT_CALIBRATION if data.len() >= 7 => Some(Self::SetEoitCalibration {
                boundary_x100: i16::from_be_bytes([data[1], data[2]]),
                normal_x100: i16::from_be_bytes([data[3], data[4]]),
                fallback_x100: i16::from_be_bytes([data[5], data[6]]),
            }),
            CMD_ENABLE_MAP_TABLE => Some(Self::EnableMapTable),
            CMD_DISABLE_MAP_TABLE => Some(Self::DisableMapTable),
            CMD_SET_MAP_CELL if data.len() >= 5 => Some(Self::SetMapCell {
                rpm_idx: data[1],
                load_idx: data[2],
                normal_value: i16::from_be_bytes([data[3], data[4]]),
            }),
            CMD_GET_DIAGNOSTIC => Some(Self::GetDiagnostic),
            CMD_GET_CALIBRATION => Some(Self::GetCalibration),
            _ => None,
        }
    }
}

/// Status byte carried in every response, regardless of command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Ok = 0,
    Rejected = 1,
    OutOfRange = 2,
}

/// A command response: echoes the command byte, carries a status byte and
/// a protocol-defined payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningResponse {
    pub command_echo: u8,
    pub status: ResponseStatus,
    pub payload: Vec<u8>,
}

impl TuningResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.payload.len());
        out.push(self.command_echo);
        out.push(self.status as u8);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }
        let status = match data[1] {
            0 => ResponseStatus::Ok,
            1 => ResponseStatus::Rejected,
            2 => ResponseStatus::OutOfRange,
            _ => return None,
        };
        Some(Self {
            command_echo: data[0],
            status,
            payload: data[2..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_registered_protocol() {
        assert_eq!(detect_protocol(0x180, 8), Some(WidebandProtocol::AemX));
        assert_eq!(detect_protocol(0x3E8, 8), Some(WidebandProtocol::Innovate));
        assert_eq!(detect_protocol(0x430, 6), Some(WidebandProtocol::Haltech));
        assert_eq!(detect_protocol(0x999, 8), None);
    }

    #[test]
    fn decodes_aemx_lambda_at_stoich() {
        let mut data = [0u8; 8];
        let afr = (STOICH_AFR * 100.0) as u16; // raw counts = afr*100 for this fixture
        data[0..2].copy_from_slice(&afr.to_be_bytes());
        data[2] = 0x01; // ready
        let reading = decode_lambda_frame(0x180, 8, &data, 42).unwrap();
        assert_eq!(reading.protocol, WidebandProtocol::AemX);
        assert!((reading.lambda - 100.0).abs() < 1e-9);
        assert_eq!(reading.captured_at_us, 42);
    }

    #[test]
    fn not_ready_status_bit_is_rejected() {
        let mut data = [0u8; 8];
        data[2] = 0x00;
        let err = decode_lambda_frame(0x180, 8, &data, 0).unwrap_err();
        assert_eq!(err, CanError::NotReady);
    }

    #[test]
    fn unrecognized_id_dlc_pair_is_rejected() {
        let data = [0u8; 8];
        let err = decode_lambda_frame(0x7FF, 8, &data, 0).unwrap_err();
        assert!(matches!(err, CanError::UnrecognizedProtocol { .. }));
    }

    #[test]
    fn short_haltech_frame_is_rejected() {
        let data = [0u8; 3];
        let err = decode_lambda_frame(0x430, 6, &data, 0).unwrap_err();
        assert!(matches!(err, CanError::TooShort { .. }));
    }

    #[test]
    fn eoit_calibration_command_round_trips() {
        let cmd = TuningCommand::SetEoitCalibration { boundary_x100: 150, normal_x100: 200, fallback_x100: 50 };
        let bytes = cmd.to_bytes();
        let decoded = TuningCommand::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn map_cell_command_round_trips() {
        let cmd = TuningCommand::SetMapCell { rpm_idx: 4, load_idx: 9, normal_value: -120 };
        let decoded = TuningCommand::from_bytes(&cmd.to_bytes()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn response_round_trips_with_payload() {
        let resp = TuningResponse {
            command_echo: CMD_GET_CALIBRATION,
            status: ResponseStatus::Ok,
            payload: vec![1, 2, 3, 4],
        };
        let decoded = TuningResponse::from_bytes(&resp.to_bytes()).unwrap();
        assert_eq!(decoded, resp);
    }
}
