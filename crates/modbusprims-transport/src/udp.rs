use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::params::ConnectionParams;
use crate::traits::Transport;

// Largest Modbus ADU is 260 bytes; leave headroom for oversized replies.
const DATAGRAM_SIZE: usize = 1024;

/// Modbus UDP transport over a connected `UdpSocket`.
///
/// Each `receive` returns at most one datagram.
pub struct UdpTransport {
    params: ConnectionParams,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            socket: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn bind_addr(&self, remote: SocketAddr) -> SocketAddr {
        match self.params.source_address {
            Some(source) => source,
            None if remote.is_ipv4() => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            None => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        }
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        let remote = self.params.resolve()?[0];
        let local = self.bind_addr(remote);
        let socket = UdpSocket::bind(local).map_err(|source| TransportError::Bind {
            addr: local,
            source,
        })?;
        socket
            .connect(remote)
            .map_err(|source| TransportError::Connect {
                target: remote.to_string(),
                source,
            })?;

        info!(%remote, "connected udp transport");
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        let sent = socket.send(data)?;
        if sent != data.len() {
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::WriteZero,
                format!("datagram truncated ({sent} of {} bytes)", data.len()),
            )));
        }
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        if timeout.is_zero() {
            return Err(TransportError::Timeout(timeout));
        }
        socket.set_read_timeout(Some(timeout))?;

        let mut datagram = [0u8; DATAGRAM_SIZE];
        loop {
            match socket.recv(&mut datagram) {
                Ok(n) => return Ok(Bytes::copy_from_slice(&datagram[..n])),
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
        if self.socket.take().is_some() {
            debug!(target_addr = %self.params.target(), "closed udp transport");
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn name(&self) -> &'static str {
        "udp"
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("target", &self.params.target())
            .field("connected", &self.socket.is_some())
            .finish()
    }
}
