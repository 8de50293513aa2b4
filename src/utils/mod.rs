pub mod error;

pub use error::{ErrorKind, ModbusError};
