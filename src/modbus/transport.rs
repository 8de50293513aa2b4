use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Byte stream the transaction engine talks through.
///
/// The line itself (baud rate, parity, framing) is configured by whoever
/// opened the handle; the engine only reads and writes bytes.
pub trait Transport: Read + Write {
    /// Upper bound for the next blocking `read`.
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    /// Drops whatever is already sitting in the input buffer.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
