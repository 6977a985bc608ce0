/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Socket header carries a protocol id other than Modbus (0).
    #[error("invalid protocol id {0:#06x} (expected 0x0000)")]
    InvalidProtocolId(u16),

    /// A length field or frame body has an impossible size.
    #[error("invalid frame length {0}")]
    InvalidLength(usize),

    /// CRC or LRC does not validate the preceding bytes.
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Bytes between the delimiters are not valid for the framing mode.
    #[error("invalid frame encoding: {0}")]
    InvalidEncoding(String),

    /// The PDU exceeds the Modbus maximum of 253 bytes.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading frames from a stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors that mean the received bytes are damaged.
    ///
    /// A corrupt frame is a transient condition: the client drops its buffer
    /// and retries instead of failing the connection.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidProtocolId(_)
                | FrameError::InvalidLength(_)
                | FrameError::ChecksumMismatch { .. }
                | FrameError::InvalidEncoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
