//! Byte-stream transports for Modbus clients.
//!
//! Provides a single [`Transport`] trait over the links a Modbus master talks on:
//! - TCP sockets (optionally bound to a local source address)
//! - UDP datagrams
//! - Serial lines (behind the `serial` feature)
//!
//! This is the lowest layer of modbusprims. Transports move bytes only; framing
//! and transaction matching live in the layers above.

pub mod error;
pub mod params;
pub mod tcp;
pub mod traits;
pub mod udp;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use params::{
    ConnectionParams, TransportKind, DEFAULT_BAUD_RATE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
};
pub use tcp::TcpTransport;
pub use traits::Transport;
pub use udp::UdpTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

/// Build an unconnected transport for `params.kind`.
pub fn open(params: ConnectionParams) -> Result<Box<dyn Transport>> {
    match params.kind {
        TransportKind::Tcp => Ok(Box::new(TcpTransport::new(params))),
        TransportKind::Udp => Ok(Box::new(UdpTransport::new(params))),
        #[cfg(feature = "serial")]
        TransportKind::Serial => Ok(Box::new(SerialTransport::new(params))),
        #[cfg(not(feature = "serial"))]
        TransportKind::Serial => Err(TransportError::Unsupported(
            "serial transport requires the `serial` feature".to_string(),
        )),
    }
}
