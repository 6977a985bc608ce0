use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::params::ConnectionParams;
use crate::tcp::READ_CHUNK_SIZE;
use crate::traits::Transport;

/// Serial line transport (8 data bits, no parity, 1 stop bit).
pub struct SerialTransport {
    params: ConnectionParams,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params, port: None }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self.params.destination, self.params.baud_rate)
            .timeout(self.params.connect_timeout)
            .open()
            .map_err(|err| TransportError::Connect {
                target: self.params.target(),
                source: err.into(),
            })?;

        info!(
            device = %self.params.destination,
            baud_rate = self.params.baud_rate,
            "opened serial transport"
        );
        self.port = Some(port);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        if timeout.is_zero() {
            return Err(TransportError::Timeout(timeout));
        }
        port.set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match port.read(&mut chunk) {
                Ok(n) => return Ok(Bytes::copy_from_slice(&chunk[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(TransportError::Timeout(timeout));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(device = %self.params.destination, "closed serial transport");
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn name(&self) -> &'static str {
        "serial"
    }

    fn discard_input(&mut self) -> Result<()> {
        if let Some(port) = self.port.as_ref() {
            port.clear(ClearBuffer::Input)
                .map_err(|err| TransportError::Io(err.into()))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device", &self.params.destination)
            .field("baud_rate", &self.params.baud_rate)
            .field("connected", &self.port.is_some())
            .finish()
    }
}
