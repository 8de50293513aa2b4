use std::fmt;

use super::crc::{crc16_modbus, verify_frame_crc};
use crate::utils::error::ModbusError;

pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const EXCEPTION_BIT: u8 = 0x80;

pub const MIN_SLAVE_ID: u8 = 1;
pub const MAX_SLAVE_ID: u8 = 247;
pub const MAX_READ_REGISTERS: u16 = 125;

/// Address + function + exception code + CRC.
pub const EXCEPTION_FRAME_LEN: usize = 5;
/// Address + function, enough to tell a data reply from an exception.
pub const HEADER_LEN: usize = 2;

/// A validated "read holding registers" (0x03) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHoldingRegisters {
    slave_id: u8,
    start_address: u16,
    count: u16,
}

impl ReadHoldingRegisters {
    pub fn new(slave_id: u8, start_address: u16, count: u16) -> Result<Self, ModbusError> {
        if !(MIN_SLAVE_ID..=MAX_SLAVE_ID).contains(&slave_id) {
            return Err(ModbusError::InvalidArgument(format!(
                "slave id {} out of range {}-{}",
                slave_id, MIN_SLAVE_ID, MAX_SLAVE_ID
            )));
        }

        if !(1..=MAX_READ_REGISTERS).contains(&count) {
            return Err(ModbusError::InvalidArgument(format!(
                "register count {} out of range 1-{}",
                count, MAX_READ_REGISTERS
            )));
        }

        if start_address as u32 + count as u32 > 0x1_0000 {
            return Err(ModbusError::InvalidArgument(format!(
                "registers {}..{} exceed the 16-bit address space",
                start_address,
                start_address as u32 + count as u32
            )));
        }

        Ok(Self {
            slave_id,
            start_address,
            count,
        })
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// Encodes the request as a complete RTU frame, CRC included.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(8);
        frame.push(self.slave_id);
        frame.push(FC_READ_HOLDING_REGISTERS);
        frame.extend_from_slice(&self.start_address.to_be_bytes());
        frame.extend_from_slice(&self.count.to_be_bytes());

        let crc = crc16_modbus(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    /// Total length of a successful reply: address, function, byte count,
    /// two bytes per register and the CRC.
    pub fn expected_response_len(&self) -> usize {
        5 + self.count as usize * 2
    }

    /// Length of the reply given its first [`HEADER_LEN`] bytes.
    pub fn response_len_for_header(&self, header: &[u8]) -> usize {
        match header.get(1) {
            Some(function) if function & EXCEPTION_BIT != 0 => EXCEPTION_FRAME_LEN,
            _ => self.expected_response_len(),
        }
    }

    /// Validates a complete reply frame and decodes its registers.
    ///
    /// The CRC is checked first so that line corruption anywhere in the frame
    /// is reported as such rather than as a bogus field value.
    pub fn parse_response(&self, frame: &[u8]) -> Result<Vec<u16>, ModbusError> {
        if frame.len() < EXCEPTION_FRAME_LEN {
            return Err(ModbusError::InvalidResponse(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }

        verify_frame_crc(frame)
            .map_err(|(expected, received)| ModbusError::CrcError { expected, received })?;

        if frame[0] != self.slave_id {
            return Err(ModbusError::InvalidResponse(format!(
                "slave id mismatch: expected {}, got {}",
                self.slave_id, frame[0]
            )));
        }

        if frame[1] == FC_READ_HOLDING_REGISTERS | EXCEPTION_BIT {
            return Err(ModbusError::Exception(ExceptionCode::from(frame[2])));
        }

        if frame[1] != FC_READ_HOLDING_REGISTERS {
            return Err(ModbusError::InvalidResponse(format!(
                "unexpected function code 0x{:02x}",
                frame[1]
            )));
        }

        let byte_count = frame[2] as usize;
        let expected_bytes = self.count as usize * 2;
        if byte_count != expected_bytes || frame.len() != self.expected_response_len() {
            return Err(ModbusError::InvalidResponse(format!(
                "expected {} data bytes, got {}",
                expected_bytes, byte_count
            )));
        }

        Ok(frame[3..3 + byte_count]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

/// Exception codes a slave may return in place of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Other(u8),
}

impl ExceptionCode {
    pub fn code(&self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerDeviceBusy => 0x06,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetFailedToRespond => 0x0B,
            ExceptionCode::Other(code) => *code,
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Other(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExceptionCode::IllegalFunction => "Illegal function",
            ExceptionCode::IllegalDataAddress => "Illegal data address",
            ExceptionCode::IllegalDataValue => "Illegal data value",
            ExceptionCode::ServerDeviceFailure => "Slave device or server failure",
            ExceptionCode::Acknowledge => "Acknowledge",
            ExceptionCode::ServerDeviceBusy => "Slave device or server is busy",
            ExceptionCode::MemoryParityError => "Memory parity error",
            ExceptionCode::GatewayPathUnavailable => "Gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "Target device failed to respond",
            ExceptionCode::Other(_) => "Unknown exception",
        };
        write!(f, "{} (0x{:02x})", text, self.code())
    }
}
