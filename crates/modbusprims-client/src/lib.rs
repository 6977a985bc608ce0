//! Synchronous Modbus transaction client.
//!
//! [`ModbusClient`] owns one transport and runs one request at a time:
//! validate, assign a transaction id, encode, send, then wait for the frame
//! whose transaction id and unit id match, retrying on timeouts and corrupt
//! frames according to [`ClientConfig`].
//!
//! ```no_run
//! use modbusprims_client::connect;
//! use modbusprims_transport::ConnectionParams;
//!
//! let mut client = connect(ConnectionParams::tcp("127.0.0.1", 5020))?;
//! client.write_coil(0, true, 1)?;
//! assert_eq!(client.read_coils(0, 1, 1)?, vec![true]);
//! client.close();
//! # Ok::<(), modbusprims_client::ModbusError>(())
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod request;
pub mod response;
pub mod shared;

pub use client::{ConnectionState, ModbusClient};
pub use config::{inter_frame_delay, ClientConfig, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
pub use connector::{connect, connect_with_config, DynClient};
pub use error::{ModbusError, Result};
pub use request::{Request, RequestPdu, DEFAULT_UNIT_ID};
pub use response::{pack_bits, unpack_bits, ExceptionCode, Response};
pub use shared::SharedClient;
