//! Modbus application data unit framing.
//!
//! Every PDU (function code + data) is wrapped for one of four framing modes:
//! - Socket: 7-byte MBAP header with transaction id, no checksum (TCP/UDP)
//! - RTU: unit id + PDU + CRC-16
//! - ASCII: ':' + hex text + LRC + CR LF
//! - Binary: '{' + escaped bytes + CRC-16 + '}'
//!
//! Decoding is a pure function over an accumulated buffer: it never blocks and
//! reports "need more bytes" as `Ok(None)`.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod function;
pub mod reader;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use checksum::{crc16, lrc};
pub use codec::{
    decode_frame, decode_request, decode_response, encode_frame, Direction, Frame, FramingMode,
    MAX_PDU_SIZE, SOCKET_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use function::{exception_of, function_name, is_exception, EXCEPTION_FLAG};
pub use reader::{FrameBuffer, FrameReader};

#[cfg(feature = "async")]
pub use tokio_codec::ModbusCodec;
