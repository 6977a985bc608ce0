use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A duplex byte channel to a Modbus device.
///
/// Transports move raw bytes only. They know nothing about frames: `receive`
/// hands back whatever is currently available, which may be part of a frame,
/// exactly one frame, or several.
pub trait Transport: Send {
    /// Open the underlying handle. Calling it on a connected transport is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Write all of `data` to the channel.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Wait at most `timeout` for bytes to arrive.
    ///
    /// Returns `Ok` with an empty buffer when the peer signalled end of stream
    /// (zero bytes read), and `TransportError::Timeout` when nothing arrived.
    fn receive(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Release the underlying handle. Safe to call from any state, any number of times.
    fn close(&mut self);

    /// Whether a handle is currently held.
    fn is_connected(&self) -> bool;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;

    /// Drop any bytes already buffered by the OS but not yet read.
    fn discard_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether an empty `receive` means the peer closed the stream for good.
    fn is_stream(&self) -> bool {
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        (**self).receive(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn is_stream(&self) -> bool {
        (**self).is_stream()
    }
}
