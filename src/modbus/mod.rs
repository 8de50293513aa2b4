pub mod client;
pub mod crc;
pub mod protocol;
pub mod shared;
pub mod transport;

pub use client::{ModbusClient, RegisterReader};
pub use crc::crc16_modbus;
pub use protocol::{ExceptionCode, ReadHoldingRegisters};
pub use shared::SharedModbusClient;
pub use transport::Transport;
