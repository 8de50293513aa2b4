//! Modbus RTU register reader
//!
//! A small, synchronous Modbus RTU master that reads holding registers from a
//! slave on an RS-485 line, plus the configuration and output layers used by
//! the `read485` command line tool.

pub mod cli;
pub mod config;
pub mod modbus;
pub mod output;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, SerialConfig};
pub use modbus::{ModbusClient, RegisterReader, SharedModbusClient, Transport};
pub use output::{DataFormatter, OutputFormat, RegisterReading};
pub use utils::error::{ErrorKind, ModbusError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
