use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// Standard Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default serial line speed.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Which kind of byte channel to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
    Serial,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Udp => "udp",
            TransportKind::Serial => "serial",
        };
        f.write_str(name)
    }
}

/// Where and how to connect. Fixed once a client has been built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Host name, IP address, or serial device path.
    pub destination: String,
    /// Remote port (ignored for serial).
    pub port: u16,
    pub kind: TransportKind,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Local address to bind before connecting (TCP/UDP only).
    pub source_address: Option<SocketAddr>,
    /// Line speed (serial only).
    pub baud_rate: u32,
}

impl ConnectionParams {
    /// Parameters for a Modbus TCP connection.
    pub fn tcp(destination: impl Into<String>, port: u16) -> Self {
        Self::new(destination, port, TransportKind::Tcp)
    }

    /// Parameters for a Modbus UDP connection.
    pub fn udp(destination: impl Into<String>, port: u16) -> Self {
        Self::new(destination, port, TransportKind::Udp)
    }

    /// Parameters for a serial line.
    pub fn serial(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::new(device, 0, TransportKind::Serial)
        }
    }

    pub fn new(destination: impl Into<String>, port: u16, kind: TransportKind) -> Self {
        Self {
            destination: destination.into(),
            port,
            kind,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            source_address: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_source_address(mut self, addr: SocketAddr) -> Self {
        self.source_address = Some(addr);
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Human-readable target, e.g. `127.0.0.1:502` or `/dev/ttyUSB0`.
    pub fn target(&self) -> String {
        match self.kind {
            TransportKind::Serial => self.destination.clone(),
            TransportKind::Tcp | TransportKind::Udp => {
                format!("{}:{}", self.destination, self.port)
            }
        }
    }

    /// Resolve the destination to socket addresses (TCP/UDP).
    ///
    /// When a source address is configured, only addresses of the same family
    /// are returned.
    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let target = self.target();
        let addrs: Vec<SocketAddr> = (self.destination.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                target: target.clone(),
                source,
            })?
            .filter(|addr| match self.source_address {
                Some(source) => source.is_ipv4() == addr.is_ipv4(),
                None => true,
            })
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Connect {
                target,
                source: std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "no usable address for destination",
                ),
            });
        }
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_defaults() {
        let params = ConnectionParams::tcp("127.0.0.1", DEFAULT_PORT);
        assert_eq!(params.kind, TransportKind::Tcp);
        assert_eq!(params.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(params.source_address.is_none());
        assert_eq!(params.target(), "127.0.0.1:502");
    }

    #[test]
    fn serial_target_is_device_path() {
        let params = ConnectionParams::serial("/dev/ttyUSB0", 9600);
        assert_eq!(params.kind, TransportKind::Serial);
        assert_eq!(params.baud_rate, 9600);
        assert_eq!(params.target(), "/dev/ttyUSB0");
    }

    #[test]
    fn resolve_filters_by_source_family() {
        let source: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let params = ConnectionParams::tcp("127.0.0.1", 5020).with_source_address(source);
        let addrs = params.resolve().unwrap();
        assert!(addrs.iter().all(SocketAddr::is_ipv4));
    }

    #[test]
    fn resolve_rejects_family_mismatch() {
        let source: SocketAddr = "[::1]:0".parse().unwrap();
        let params = ConnectionParams::tcp("127.0.0.1", 5020).with_source_address(source);
        assert!(matches!(
            params.resolve(),
            Err(TransportError::Connect { .. })
        ));
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&TransportKind::Udp).unwrap();
        assert_eq!(json, "\"udp\"");
    }
}
