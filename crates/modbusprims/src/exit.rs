use std::fmt;
use std::io;

use modbusprims_client::ModbusError;
use modbusprims_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DEVICE_EXCEPTION: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::Unsupported(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn modbus_error(context: &str, err: ModbusError) -> CliError {
    match err {
        ModbusError::Connect(err) | ModbusError::ConnectionLost(err) => {
            transport_error(context, err)
        }
        ModbusError::InvalidRequest(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ModbusError::Timeout { .. } | ModbusError::EmptyResponse => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ModbusError::DeviceError { .. } => {
            CliError::new(DEVICE_EXCEPTION, format!("{context}: {err}"))
        }
        ModbusError::CorruptFrame { .. } | ModbusError::UnexpectedResponse(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        ModbusError::NotConnected(_) | ModbusError::Closed => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use modbusprims_client::ExceptionCode;

    use super::*;

    #[test]
    fn device_exception_maps_to_its_own_code() {
        let err = modbus_error(
            "read-coils failed",
            ModbusError::DeviceError {
                function: 0x01,
                exception: ExceptionCode::IllegalDataAddress,
            },
        );
        assert_eq!(err.code, DEVICE_EXCEPTION);
        assert!(err.message.starts_with("read-coils failed: "));
    }

    #[test]
    fn refused_connect_is_transport_error() {
        let err = modbus_error(
            "connect failed",
            ModbusError::Connect(TransportError::Connect {
                target: "127.0.0.1:1".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn exhausted_retries_is_timeout() {
        let err = modbus_error("read", ModbusError::Timeout { attempts: 4 });
        assert_eq!(err.code, TIMEOUT);
        assert_eq!(modbus_error("read", ModbusError::EmptyResponse).code, TIMEOUT);
    }

    #[test]
    fn invalid_request_is_usage() {
        let err = modbus_error("read", ModbusError::InvalidRequest("count".into()));
        assert_eq!(err.code, USAGE);
    }
}
