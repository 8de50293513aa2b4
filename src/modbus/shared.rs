use std::sync::{Arc, Mutex};

use super::client::{ModbusClient, RegisterReader};
use super::transport::Transport;
use crate::utils::error::ModbusError;

/// Cloneable handle that lets several callers share one connection.
///
/// The lock is held for the whole write/read cycle, so concurrent callers
/// are served strictly one transaction at a time.
pub struct SharedModbusClient<T: Transport> {
    inner: Arc<Mutex<ModbusClient<T>>>,
}

impl<T: Transport> SharedModbusClient<T> {
    pub fn new(client: ModbusClient<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Runs `f` with exclusive access to the underlying client.
    pub fn with_client<R>(
        &self,
        f: impl FnOnce(&mut ModbusClient<T>) -> Result<R, ModbusError>,
    ) -> Result<R, ModbusError> {
        let mut client = self.inner.lock().map_err(|_| ModbusError::LockError)?;
        f(&mut client)
    }
}

impl<T: Transport> Clone for SharedModbusClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> RegisterReader for SharedModbusClient<T> {
    fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        self.with_client(|client| client.read_holding_registers(slave_id, start_addr, count))
    }
}
