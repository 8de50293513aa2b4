pub mod args;
pub mod commands;

pub use args::{build_cli, ReadTarget};
pub use commands::{exit_code_for, list_serial_ports, read_registers, read_with_retries};
