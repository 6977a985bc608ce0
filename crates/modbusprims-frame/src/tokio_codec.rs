use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Direction, Frame, FramingMode};
use crate::error::FrameError;

/// `tokio_util` codec over the pure Modbus frame functions.
///
/// Wrap a stream with `Framed::new(stream, ModbusCodec::client(mode))` to get a
/// `Stream` of response frames and a `Sink` of request frames.
#[derive(Debug, Clone, Copy)]
pub struct ModbusCodec {
    mode: FramingMode,
    direction: Direction,
}

impl ModbusCodec {
    /// Codec for the master side: decodes responses.
    pub fn client(mode: FramingMode) -> Self {
        Self {
            mode,
            direction: Direction::Response,
        }
    }

    /// Codec for the device side: decodes requests.
    pub fn device(mode: FramingMode) -> Self {
        Self {
            mode,
            direction: Direction::Request,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }
}

impl Decoder for ModbusCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.mode, self.direction)
    }
}

impl Encoder<Frame> for ModbusCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(self.mode, &item, dst)
    }
}

impl Encoder<&Frame> for ModbusCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(self.mode, item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::READ_COILS;

    #[test]
    fn device_and_client_codecs_interoperate() {
        let mut client = ModbusCodec::client(FramingMode::Rtu);
        let mut device = ModbusCodec::device(FramingMode::Rtu);

        let request = Frame::new(4, READ_COILS, vec![0x00, 0x00, 0x00, 0x03]);
        let mut wire = BytesMut::new();
        client.encode(&request, &mut wire).unwrap();
        assert_eq!(device.decode(&mut wire).unwrap(), Some(request));

        let response = Frame::new(4, READ_COILS, vec![0x01, 0x05]);
        device.encode(response.clone(), &mut wire).unwrap();
        assert_eq!(client.decode(&mut wire).unwrap(), Some(response));
        assert!(client.decode(&mut wire).unwrap().is_none());
    }
}
