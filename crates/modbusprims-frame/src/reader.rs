use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, Direction, Frame, FramingMode};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 512;

/// Accumulates received bytes and yields complete frames.
///
/// Pure buffer bookkeeping: bytes are pushed in by whoever owns the I/O, so
/// the same type serves a blocking client, a test double, or a device simulator.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    mode: FramingMode,
    direction: Direction,
}

impl FrameBuffer {
    pub fn new(mode: FramingMode, direction: Direction) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            mode,
            direction,
        }
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Decode the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        decode_frame(&mut self.buf, self.mode, self.direction)
    }

    /// Drop everything buffered (after a corrupt frame or between transactions).
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }
}

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    frames: FrameBuffer,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T, mode: FramingMode, direction: Direction) -> Self {
        Self {
            inner,
            frames: FrameBuffer::new(mode, direction),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.frames.extend(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
