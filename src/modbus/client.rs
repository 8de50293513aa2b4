use log::{debug, info, warn};
use serialport::SerialPort;
use std::io::ErrorKind as IoErrorKind;
use std::time::{Duration, Instant};

use super::protocol::{ReadHoldingRegisters, HEADER_LEN};
use super::transport::Transport;
use crate::config::settings::SerialConfig;
use crate::utils::error::ModbusError;

/// Anything that can serve a "read holding registers" transaction.
pub trait RegisterReader {
    fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError>;
}

/// Modbus RTU master over a single owned transport.
///
/// Transactions take `&mut self`, so one is always fully resolved before the
/// next request goes out.
pub struct ModbusClient<T: Transport> {
    transport: T,
    response_timeout: Duration,
}

impl ModbusClient<Box<dyn SerialPort>> {
    /// Opens the serial device described by `config`.
    pub fn open(config: &SerialConfig, response_timeout: Duration) -> Result<Self, ModbusError> {
        info!("🔌 Connecting to Modbus RTU port: {}", config.port);
        info!(
            "⚙️  Configuration: {} baud, {} data bits, parity {:?}, {} stop bit(s)",
            config.baud_rate, config.data_bits, config.parity, config.stop_bits
        );

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(response_timeout)
            .data_bits(config.serial_data_bits()?)
            .stop_bits(config.serial_stop_bits()?)
            .parity(config.parity.into())
            .open()
            .map_err(|e| {
                ModbusError::ConnectionError(format!("Failed to open port {}: {}", config.port, e))
            })?;

        info!("Modbus RTU connection established");
        Ok(Self::with_transport(port, response_timeout))
    }
}

impl<T: Transport> ModbusClient<T> {
    pub fn with_transport(transport: T, response_timeout: Duration) -> Self {
        Self {
            transport,
            response_timeout,
        }
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    /// Releases the connection. Dropping the client has the same effect.
    pub fn close(self) {
        debug!("Closing Modbus RTU connection");
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), ModbusError> {
        // Leftovers from an earlier, abandoned reply would be taken for ours.
        if let Err(e) = self.transport.discard_input() {
            warn!("Could not discard pending input: {}", e);
        }

        debug!("📤 TX {}", hex::encode(frame));
        self.transport
            .write_all(frame)
            .map_err(|e| ModbusError::CommunicationError(format!("Write failed: {}", e)))?;
        self.transport
            .flush()
            .map_err(|e| ModbusError::CommunicationError(format!("Flush failed: {}", e)))
    }

    /// Reads into `buf` until it is full or `deadline` passes.
    fn fill(&mut self, buf: &mut Vec<u8>, len: usize, deadline: Instant) -> Result<(), ModbusError> {
        let mut chunk = [0u8; 256];

        while buf.len() < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ModbusError::Timeout(self.response_timeout));
            }
            self.transport.set_read_timeout(remaining)?;

            let want = (len - buf.len()).min(chunk.len());
            match self.transport.read(&mut chunk[..want]) {
                Ok(0) => {
                    return Err(ModbusError::CommunicationError(
                        "Read failed: device closed the connection".to_string(),
                    ))
                }
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(ref e)
                    if matches!(
                        e.kind(),
                        IoErrorKind::TimedOut | IoErrorKind::WouldBlock | IoErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    return Err(ModbusError::CommunicationError(format!("Read failed: {}", e)))
                }
            }
        }
        Ok(())
    }

    fn receive(&mut self, request: &ReadHoldingRegisters) -> Result<Vec<u8>, ModbusError> {
        let deadline = Instant::now() + self.response_timeout;
        let mut response = Vec::with_capacity(request.expected_response_len());

        self.fill(&mut response, HEADER_LEN, deadline)?;
        let total = request.response_len_for_header(&response);
        self.fill(&mut response, total, deadline)?;

        debug!("📥 RX {}", hex::encode(&response));
        Ok(response)
    }

    fn transact(&mut self, request: &ReadHoldingRegisters) -> Result<Vec<u16>, ModbusError> {
        self.send(&request.to_frame())?;

        let response = match self.receive(request) {
            Ok(response) => response,
            Err(e) => {
                let _ = self.transport.discard_input();
                return Err(e);
            }
        };

        request.parse_response(&response).map_err(|e| {
            if matches!(e, ModbusError::CrcError { .. } | ModbusError::InvalidResponse(_)) {
                let _ = self.transport.discard_input();
            }
            e
        })
    }
}

impl<T: Transport> RegisterReader for ModbusClient<T> {
    fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        let request = ReadHoldingRegisters::new(slave_id, start_addr, count)?;
        info!(
            "📊 Reading {} registers from device {} starting at address {}",
            count, slave_id, start_addr
        );

        let registers = self.transact(&request)?;
        debug!("Decoded {} registers from device {}", registers.len(), slave_id);
        Ok(registers)
    }
}
