use modbusprims_frame::FrameError;
use modbusprims_transport::TransportError;

use crate::client::ConnectionState;
use crate::response::ExceptionCode;

/// Errors surfaced by the transaction client.
///
/// Every failure path of a transaction is a distinct variant; nothing is
/// swallowed inside the client.
#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    /// Local validation failed; no I/O was attempted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport could not be connected.
    #[error("connect failed: {0}")]
    Connect(#[source] TransportError),

    /// A send or receive failed mid-transaction. The client is now
    /// disconnected and must be reconnected explicitly.
    #[error("connection lost: {0}")]
    ConnectionLost(#[source] TransportError),

    /// The client is not in the connected state.
    #[error("client not connected (state: {0})")]
    NotConnected(ConnectionState),

    /// The client was closed; it cannot be reconnected.
    #[error("client closed")]
    Closed,

    /// No matching frame arrived within the retry budget.
    #[error("no response after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// The device answered with zero bytes.
    #[error("empty response from device")]
    EmptyResponse,

    /// The device answered with a well-formed exception response.
    #[error("device exception for function {function:#04x}: {exception}")]
    DeviceError {
        function: u8,
        exception: ExceptionCode,
    },

    /// Every attempt ended in a frame that failed its checksum or layout checks.
    #[error("corrupt frame after {attempts} attempt(s): {source}")]
    CorruptFrame { attempts: u32, source: FrameError },

    /// A matching frame arrived but its content does not answer the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ModbusError {
    /// Exception code carried by a `DeviceError`.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            ModbusError::DeviceError { exception, .. } => Some(exception.code()),
            _ => None,
        }
    }

    /// True when the connection is still usable after this error.
    ///
    /// `EmptyResponse` from a stream transport is the exception: the peer
    /// hung up, so the client has already dropped the connection.
    pub fn keeps_connection(&self) -> bool {
        !matches!(
            self,
            ModbusError::Connect(_)
                | ModbusError::ConnectionLost(_)
                | ModbusError::NotConnected(_)
                | ModbusError::Closed
        )
    }
}

pub type Result<T> = std::result::Result<T, ModbusError>;
