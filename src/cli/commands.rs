use log::{info, warn};
use std::thread;

use super::args::ReadTarget;
use crate::config::Config;
use crate::modbus::client::{ModbusClient, RegisterReader};
use crate::modbus::protocol::ReadHoldingRegisters;
use crate::output::RegisterReading;
use crate::utils::error::{ErrorKind, ModbusError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
/// The historical `return -1` of this tool, as seen by the shell.
pub const EXIT_FAILURE: i32 = 255;

/// Maps an error to the process exit status.
pub fn exit_code_for(err: &ModbusError) -> i32 {
    match err.kind() {
        ErrorKind::InvalidArgument | ErrorKind::Config => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

/// Performs one read, repeating it on transient failures according to the
/// configured retry policy.
pub fn read_with_retries<R: RegisterReader>(
    reader: &mut R,
    target: &ReadTarget,
    config: &Config,
) -> Result<Vec<u16>, ModbusError> {
    let mut attempt = 0;
    loop {
        match reader.read_holding_registers(target.slave_id, target.start_address, target.count) {
            Ok(values) => return Ok(values),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    "Attempt {}/{} failed: {}",
                    attempt,
                    config.max_retries + 1,
                    e
                );
                thread::sleep(config.retry_delay());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Opens the configured device, reads `target` and renders it in the
/// configured format. The connection is closed on every path.
pub fn read_registers(config: &Config, target: &ReadTarget) -> Result<String, ModbusError> {
    // Reject a bad register range before the device is touched.
    ReadHoldingRegisters::new(target.slave_id, target.start_address, target.count)?;

    let mut client = ModbusClient::open(&config.serial, config.response_timeout())?;
    let result = read_with_retries(&mut client, target, config);
    client.close();

    let values = result?;
    info!("✅ Read {} registers from device {}", values.len(), target.slave_id);

    let reading = RegisterReading::new(target.slave_id, target.start_address, values);
    Ok(config.format.formatter().format(&reading))
}

pub fn list_serial_ports() -> Result<String, ModbusError> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        return Ok("No serial ports found\n".to_string());
    }

    let mut output = String::new();
    for port in ports {
        output.push_str(&port.port_name);
        if let serialport::SerialPortType::UsbPort(usb_info) = &port.port_type {
            output.push_str(&format!(" (USB {:04x}:{:04x}", usb_info.vid, usb_info.pid));
            if let Some(manufacturer) = &usb_info.manufacturer {
                output.push_str(&format!(", {}", manufacturer));
            }
            if let Some(serial_number) = &usb_info.serial_number {
                output.push_str(&format!(", serial {}", serial_number));
            }
            output.push(')');
        }
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedReader {
        results: VecDeque<Result<Vec<u16>, ModbusError>>,
        calls: usize,
    }

    impl ScriptedReader {
        fn new(results: Vec<Result<Vec<u16>, ModbusError>>) -> Self {
            Self {
                results: results.into(),
                calls: 0,
            }
        }
    }

    impl RegisterReader for ScriptedReader {
        fn read_holding_registers(
            &mut self,
            _slave_id: u8,
            _start_addr: u16,
            _count: u16,
        ) -> Result<Vec<u16>, ModbusError> {
            self.calls += 1;
            self.results.pop_front().expect("unexpected extra call")
        }
    }

    fn target() -> ReadTarget {
        ReadTarget {
            slave_id: 1,
            start_address: 0,
            count: 1,
        }
    }

    fn config(max_retries: u32) -> Config {
        Config {
            max_retries,
            retry_delay_ms: 0,
            ..Config::default()
        }
    }

    fn timeout() -> ModbusError {
        ModbusError::Timeout(Duration::from_millis(1))
    }

    #[test]
    fn test_no_retries_by_default() {
        let mut reader = ScriptedReader::new(vec![Err(timeout())]);
        let result = read_with_retries(&mut reader, &target(), &config(0));
        assert!(matches!(result, Err(ModbusError::Timeout(_))));
        assert_eq!(reader.calls, 1);
    }

    #[test]
    fn test_retries_transient_errors() {
        let mut reader = ScriptedReader::new(vec![
            Err(timeout()),
            Err(ModbusError::CrcError { expected: 1, received: 2 }),
            Ok(vec![42]),
        ]);
        let result = read_with_retries(&mut reader, &target(), &config(2));
        assert_eq!(result.unwrap(), vec![42]);
        assert_eq!(reader.calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut reader = ScriptedReader::new(vec![Err(timeout()), Err(timeout())]);
        let result = read_with_retries(&mut reader, &target(), &config(1));
        assert!(result.is_err());
        assert_eq!(reader.calls, 2);
    }

    #[test]
    fn test_exception_is_not_retried() {
        let mut reader = ScriptedReader::new(vec![Err(ModbusError::Exception(
            crate::modbus::ExceptionCode::IllegalDataAddress,
        ))]);
        let result = read_with_retries(&mut reader, &target(), &config(5));
        assert!(matches!(result, Err(ModbusError::Exception(_))));
        assert_eq!(reader.calls, 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&ModbusError::InvalidArgument("x".into())), EXIT_USAGE);
        assert_eq!(exit_code_for(&ModbusError::ConfigError("x".into())), EXIT_USAGE);
        assert_eq!(exit_code_for(&timeout()), EXIT_FAILURE);
        assert_eq!(
            exit_code_for(&ModbusError::ConnectionError("no such device".into())),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_open_missing_device_is_transport_error() {
        let mut config = config(0);
        config.serial.port = "/dev/read485-does-not-exist".to_string();
        let err = read_registers(&config, &target()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_range_past_last_register_is_usage_error_without_opening() {
        let mut config = config(0);
        config.serial.port = "/dev/read485-does-not-exist".to_string();
        let target = ReadTarget {
            slave_id: 1,
            start_address: 0xFFFF,
            count: 2,
        };

        let err = read_registers(&config, &target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(exit_code_for(&err), EXIT_USAGE);
    }
}
