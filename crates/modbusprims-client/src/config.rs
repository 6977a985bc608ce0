use std::time::Duration;

use modbusprims_frame::FramingMode;
use modbusprims_transport::{ConnectionParams, TransportKind};
use serde::Serialize;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RETRIES: u32 = 3;

/// Silent interval used above 19200 baud or when the baud rate is unknown.
pub const FIXED_INTER_FRAME_DELAY: Duration = Duration::from_micros(1750);

/// Bits per RTU character: start + 8 data + parity/stop + stop.
const BITS_PER_CHAR: u64 = 11;

/// Per-client transaction policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    /// Framing used on the wire, fixed for the client's lifetime.
    pub framing: FramingMode,
    /// How long one attempt waits for a matching reply.
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Treat a zero-byte reply as a timeout instead of failing immediately.
    pub retry_on_empty: bool,
    /// Keep the RTU silent interval between frames and drop stale input.
    pub strict: bool,
    /// Silent interval applied when `strict` is set on RTU framing.
    pub inter_frame_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::Socket,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_on_empty: false,
            strict: true,
            inter_frame_delay: FIXED_INTER_FRAME_DELAY,
        }
    }
}

impl ClientConfig {
    /// Defaults matched to a connection: socket framing for TCP/UDP, RTU for
    /// serial lines with the silent interval derived from the baud rate.
    pub fn for_connection(params: &ConnectionParams) -> Self {
        match params.kind {
            TransportKind::Tcp | TransportKind::Udp => Self::default(),
            TransportKind::Serial => Self {
                framing: FramingMode::Rtu,
                inter_frame_delay: inter_frame_delay(Some(params.baud_rate)),
                ..Self::default()
            },
        }
    }

    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_on_empty(mut self, retry_on_empty: bool) -> Self {
        self.retry_on_empty = retry_on_empty;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Total send attempts per request.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// True when the client must enforce the RTU silent interval.
    pub fn enforces_silent_interval(&self) -> bool {
        self.strict && self.framing == FramingMode::Rtu
    }
}

/// 3.5 character times at `baud_rate`, fixed above 19200 baud.
pub fn inter_frame_delay(baud_rate: Option<u32>) -> Duration {
    match baud_rate {
        Some(baud) if baud > 0 && baud <= 19_200 => {
            Duration::from_micros(BITS_PER_CHAR * 3_500_000 / baud as u64)
        }
        _ => FIXED_INTER_FRAME_DELAY,
    }
}
