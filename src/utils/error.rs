use std::time::Duration;
use thiserror::Error;

use crate::modbus::protocol::ExceptionCode;

#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Response timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("CRC checksum mismatch (calculated 0x{expected:04x}, received 0x{received:04x})")]
    CrcError { expected: u16, received: u16 },

    #[error("Slave exception: {0}")]
    Exception(ExceptionCode),

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    #[error("Lock acquisition failed")]
    LockError,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Coarse classification of [`ModbusError`], used by callers to decide
/// whether a transaction is worth repeating and how to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Transport,
    Timeout,
    Checksum,
    Protocol,
    Config,
}

impl ModbusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModbusError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ModbusError::ConnectionError(_)
            | ModbusError::CommunicationError(_)
            | ModbusError::LockError => ErrorKind::Transport,
            ModbusError::Timeout(_) => ErrorKind::Timeout,
            ModbusError::CrcError { .. } => ErrorKind::Checksum,
            ModbusError::Exception(_) | ModbusError::InvalidResponse(_) => ErrorKind::Protocol,
            ModbusError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Line noise and a missed reply may clear up on a second attempt; a bad
    /// request or a slave exception will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::Checksum
        )
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::CommunicationError(format!("IO error: {}", err))
    }
}

impl From<serialport::Error> for ModbusError {
    fn from(err: serialport::Error) -> Self {
        ModbusError::ConnectionError(err.to_string())
    }
}

impl From<toml::de::Error> for ModbusError {
    fn from(err: toml::de::Error) -> Self {
        ModbusError::ConfigError(format!("TOML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ModbusError::InvalidArgument("count".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            ModbusError::Timeout(Duration::from_millis(10)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ModbusError::CrcError { expected: 1, received: 2 }.kind(),
            ErrorKind::Checksum
        );
        assert_eq!(
            ModbusError::Exception(ExceptionCode::IllegalDataAddress).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(ModbusError::LockError.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_retry_policy() {
        assert!(ModbusError::Timeout(Duration::from_millis(10)).is_retryable());
        assert!(ModbusError::CrcError { expected: 1, received: 2 }.is_retryable());
        assert!(!ModbusError::InvalidArgument("slave".into()).is_retryable());
        assert!(!ModbusError::Exception(ExceptionCode::ServerDeviceBusy).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ModbusError::CrcError { expected: 0x1234, received: 0xabcd };
        assert_eq!(
            err.to_string(),
            "CRC checksum mismatch (calculated 0x1234, received 0xabcd)"
        );
        let err = ModbusError::Timeout(Duration::from_millis(500));
        assert_eq!(err.to_string(), "Response timed out after 500 ms");
    }
}
