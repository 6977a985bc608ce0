use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::params::ConnectionParams;
use crate::traits::Transport;

pub(crate) const READ_CHUNK_SIZE: usize = 1024;

/// Modbus TCP transport over a blocking `TcpStream`.
///
/// The socket is created through `socket2` so an optional source address can
/// be bound before connecting.
pub struct TcpTransport {
    params: ConnectionParams,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            stream: None,
        }
    }

    /// Remote address of the live connection.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    /// Local address of the live connection.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn connect_addr(&self, addr: SocketAddr) -> Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

        if let Some(source) = self.params.source_address {
            socket
                .bind(&SockAddr::from(source))
                .map_err(|source_err| TransportError::Bind {
                    addr: source,
                    source: source_err,
                })?;
        }

        socket
            .connect_timeout(&SockAddr::from(addr), self.params.connect_timeout)
            .map_err(|source| TransportError::Connect {
                target: addr.to_string(),
                source,
            })?;

        let stream: TcpStream = socket.into();
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mut last_err = None;
        for addr in self.params.resolve()? {
            match self.connect_addr(addr) {
                Ok(stream) => {
                    info!(%addr, "connected tcp transport");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(err) => {
                    debug!(%addr, error = %err, "tcp connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Connect {
            target: self.params.target(),
            source: std::io::Error::from(ErrorKind::AddrNotAvailable),
        }))
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        if timeout.is_zero() {
            return Err(TransportError::Timeout(timeout));
        }
        stream.set_read_timeout(Some(timeout))?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match stream.read(&mut chunk) {
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
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(target_addr = %self.params.target(), "closed tcp transport");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &'static str {
        "tcp"
    }

    fn is_stream(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("target", &self.params.target())
            .field("connected", &self.stream.is_some())
            .finish()
    }
}
