use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::checksum::{crc16, crc_matches, lrc};
use crate::error::{FrameError, Result};
use crate::function::{self, is_exception};

/// Socket (MBAP) header: transaction id (2) + protocol id (2) + length (2) + unit id (1).
pub const SOCKET_HEADER_SIZE: usize = 7;

/// Protocol id carried by every Modbus socket frame.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Maximum PDU (function code + data) size.
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum RTU ADU: unit id + PDU + CRC.
pub const MAX_RTU_FRAME_SIZE: usize = MAX_PDU_SIZE + 3;

/// Maximum ASCII frame: ':' + hex(unit + PDU + LRC) + CR LF.
pub const MAX_ASCII_FRAME_SIZE: usize = 1 + (MAX_PDU_SIZE + 2) * 2 + 2;

const MIN_RTU_FRAME_SIZE: usize = 4;
const ASCII_START: u8 = b':';
const ASCII_END: [u8; 2] = [b'\r', b'\n'];
const BINARY_START: u8 = b'{';
const BINARY_END: u8 = b'}';

/// How a PDU is wrapped on the wire. Selected once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// MBAP header, no checksum (TCP/UDP).
    Socket,
    /// Unit id + PDU + CRC-16, delimited by line silence.
    Rtu,
    /// ':' + hex text + LRC + CR LF.
    Ascii,
    /// '{' + escaped bytes + CRC-16 + '}'.
    Binary,
}

impl FramingMode {
    /// Socket framing is the only mode that correlates replies by transaction id.
    pub fn uses_transaction_id(self) -> bool {
        matches!(self, FramingMode::Socket)
    }

    pub fn name(self) -> &'static str {
        match self {
            FramingMode::Socket => "socket",
            FramingMode::Rtu => "rtu",
            FramingMode::Ascii => "ascii",
            FramingMode::Binary => "binary",
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side produced the bytes being decoded.
///
/// Only RTU needs this: it has no length field, so the frame size is inferred
/// from the function code, and requests and responses are laid out differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// One decoded application data unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transaction id (socket framing only).
    pub transaction_id: Option<u16>,
    /// Addressed downstream device.
    pub unit_id: u8,
    /// Function code, with the high bit set for exception responses.
    pub function: u8,
    /// PDU data following the function code.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(unit_id: u8, function: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            transaction_id: None,
            unit_id,
            function,
            payload: payload.into(),
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: u16) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Function code plus payload.
    pub fn pdu_len(&self) -> usize {
        1 + self.payload.len()
    }

    pub fn is_exception(&self) -> bool {
        is_exception(self.function)
    }

    /// The exception code carried by an exception response.
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.payload.first().copied()
        } else {
            None
        }
    }
}

/// Encode a frame into the wire format for `mode`.
///
/// Wire formats:
/// ```text
/// socket: │ txn id (2B BE) │ proto 0 (2B) │ len (2B BE) │ unit │ fc │ data │
/// rtu:    │ unit │ fc │ data │ crc (2B LE) │
/// ascii:  │ ':' │ hex(unit fc data lrc) │ CR LF │
/// binary: │ '{' │ escaped(unit fc data crc) │ '}' │
/// ```
/// `len` counts the unit id, function code and data.
pub fn encode_frame(mode: FramingMode, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.pdu_len() > MAX_PDU_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: frame.pdu_len(),
            max: MAX_PDU_SIZE,
        });
    }

    match mode {
        FramingMode::Socket => {
            dst.reserve(SOCKET_HEADER_SIZE + frame.pdu_len());
            dst.put_u16(frame.transaction_id.unwrap_or(0));
            dst.put_u16(MODBUS_PROTOCOL_ID);
            dst.put_u16((1 + frame.pdu_len()) as u16);
            dst.put_u8(frame.unit_id);
            dst.put_u8(frame.function);
            dst.put_slice(&frame.payload);
        }
        FramingMode::Rtu => {
            let body = serial_body(frame);
            dst.reserve(body.len() + 2);
            dst.put_slice(&body);
            dst.put_u16_le(crc16(&body));
        }
        FramingMode::Ascii => {
            let mut body = serial_body(frame);
            body.push(lrc(&body));
            dst.reserve(body.len() * 2 + 3);
            dst.put_u8(ASCII_START);
            dst.put_slice(hex::encode_upper(&body).as_bytes());
            dst.put_slice(&ASCII_END);
        }
        FramingMode::Binary => {
            let mut body = serial_body(frame);
            let crc = crc16(&body);
            body.extend_from_slice(&crc.to_le_bytes());
            dst.reserve(body.len() * 2 + 2);
            dst.put_u8(BINARY_START);
            for byte in body {
                dst.put_u8(byte);
                if byte == BINARY_START || byte == BINARY_END {
                    dst.put_u8(byte);
                }
            }
            dst.put_u8(BINARY_END);
        }
    }
    Ok(())
}

/// Decode a frame from an accumulated buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes (and any noise skipped to find it).
/// On error the buffer is left as-is; callers discard it. Never blocks.
pub fn decode_frame(
    src: &mut BytesMut,
    mode: FramingMode,
    direction: Direction,
) -> Result<Option<Frame>> {
    match mode {
        FramingMode::Socket => decode_socket(src),
        FramingMode::Rtu => decode_rtu(src, direction),
        FramingMode::Ascii => decode_ascii(src),
        FramingMode::Binary => decode_binary(src, direction),
    }
}

/// Decode a response frame (client side).
pub fn decode_response(src: &mut BytesMut, mode: FramingMode) -> Result<Option<Frame>> {
    decode_frame(src, mode, Direction::Response)
}

/// Decode a request frame (device side).
pub fn decode_request(src: &mut BytesMut, mode: FramingMode) -> Result<Option<Frame>> {
    decode_frame(src, mode, Direction::Request)
}

fn serial_body(frame: &Frame) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + frame.payload.len());
    body.push(frame.unit_id);
    body.push(frame.function);
    body.extend_from_slice(&frame.payload);
    body
}

fn frame_from_body(body: &[u8]) -> Frame {
    Frame::new(body[0], body[1], Bytes::copy_from_slice(&body[2..]))
}

fn decode_socket(src: &mut BytesMut) -> Result<Option<Frame>> {
    if src.len() < SOCKET_HEADER_SIZE {
        return Ok(None);
    }

    let transaction_id = u16::from_be_bytes([src[0], src[1]]);
    let protocol_id = u16::from_be_bytes([src[2], src[3]]);
    let length = u16::from_be_bytes([src[4], src[5]]) as usize;

    if protocol_id != MODBUS_PROTOCOL_ID {
        return Err(FrameError::InvalidProtocolId(protocol_id));
    }
    // Unit id + at least a function code, at most a full PDU.
    if !(2..=MAX_PDU_SIZE + 1).contains(&length) {
        return Err(FrameError::InvalidLength(length));
    }

    let total = SOCKET_HEADER_SIZE - 1 + length;
    if src.len() < total {
        return Ok(None);
    }

    let unit_id = src[6];
    let function = src[7];
    src.advance(SOCKET_HEADER_SIZE + 1);
    let payload = src.split_to(length - 2).freeze();

    Ok(Some(Frame {
        transaction_id: Some(transaction_id),
        unit_id,
        function,
        payload,
    }))
}

enum RtuLength {
    Known(usize),
    NeedMore,
    Unknown,
}

/// Expected RTU frame size (including CRC) for the bytes at the head of `buf`.
fn rtu_frame_len(buf: &[u8], direction: Direction) -> RtuLength {
    let Some(&code) = buf.get(1) else {
        return RtuLength::NeedMore;
    };
    let counted = |count_at: usize, fixed: usize| match buf.get(count_at) {
        Some(&count) => RtuLength::Known(fixed + count as usize + 2),
        None => RtuLength::NeedMore,
    };

    match direction {
        Direction::Response => match code {
            code if is_exception(code) => RtuLength::Known(5),
            function::READ_COILS
            | function::READ_DISCRETE_INPUTS
            | function::READ_HOLDING_REGISTERS
            | function::READ_INPUT_REGISTERS
            | function::GET_COMM_EVENT_LOG
            | function::REPORT_SERVER_ID
            | function::READ_FILE_RECORD
            | function::WRITE_FILE_RECORD
            | function::READ_WRITE_MULTIPLE_REGISTERS => counted(2, 3),
            function::WRITE_SINGLE_COIL
            | function::WRITE_SINGLE_REGISTER
            | function::GET_COMM_EVENT_COUNTER
            | function::WRITE_MULTIPLE_COILS
            | function::WRITE_MULTIPLE_REGISTERS => RtuLength::Known(8),
            function::READ_EXCEPTION_STATUS => RtuLength::Known(5),
            function::MASK_WRITE_REGISTER => RtuLength::Known(10),
            _ => RtuLength::Unknown,
        },
        Direction::Request => match code {
            function::READ_COILS
            | function::READ_DISCRETE_INPUTS
            | function::READ_HOLDING_REGISTERS
            | function::READ_INPUT_REGISTERS
            | function::WRITE_SINGLE_COIL
            | function::WRITE_SINGLE_REGISTER => RtuLength::Known(8),
            function::READ_EXCEPTION_STATUS
            | function::GET_COMM_EVENT_COUNTER
            | function::GET_COMM_EVENT_LOG
            | function::REPORT_SERVER_ID => RtuLength::Known(4),
            function::WRITE_MULTIPLE_COILS | function::WRITE_MULTIPLE_REGISTERS => counted(6, 7),
            function::READ_FILE_RECORD | function::WRITE_FILE_RECORD => counted(2, 3),
            function::MASK_WRITE_REGISTER => RtuLength::Known(10),
            function::READ_WRITE_MULTIPLE_REGISTERS => counted(10, 11),
            _ => RtuLength::Unknown,
        },
    }
}

fn decode_rtu(src: &mut BytesMut, direction: Direction) -> Result<Option<Frame>> {
    match rtu_frame_len(src, direction) {
        RtuLength::NeedMore => Ok(None),
        RtuLength::Known(len) if len > MAX_RTU_FRAME_SIZE => Err(FrameError::InvalidLength(len)),
        RtuLength::Known(len) if src.len() < len => Ok(None),
        RtuLength::Known(len) => {
            if crc_matches(&src[..len]) {
                return Ok(Some(take_rtu_frame(src, 0, len)));
            }
            match resync_rtu(src, direction) {
                Some((start, len)) => Ok(Some(take_rtu_frame(src, start, len))),
                None => Err(crc_mismatch(&src[..len])),
            }
        }
        RtuLength::Unknown => {
            let limit = src.len().min(MAX_RTU_FRAME_SIZE);
            if let Some(len) = (MIN_RTU_FRAME_SIZE..=limit).find(|&len| crc_matches(&src[..len])) {
                return Ok(Some(take_rtu_frame(src, 0, len)));
            }
            if src.len() >= MAX_RTU_FRAME_SIZE {
                return Err(crc_mismatch(&src[..MAX_RTU_FRAME_SIZE]));
            }
            Ok(None)
        }
    }
}

/// Look past a damaged head for a later offset where a whole frame validates.
fn resync_rtu(src: &[u8], direction: Direction) -> Option<(usize, usize)> {
    (1..src.len()).find_map(|start| match rtu_frame_len(&src[start..], direction) {
        RtuLength::Known(len)
            if len <= MAX_RTU_FRAME_SIZE
                && start + len <= src.len()
                && crc_matches(&src[start..start + len]) =>
        {
            Some((start, len))
        }
        _ => None,
    })
}

fn take_rtu_frame(src: &mut BytesMut, start: usize, len: usize) -> Frame {
    if start > 0 {
        tracing::debug!(skipped = start, "skipped noise before rtu frame");
        src.advance(start);
    }
    let raw = src.split_to(len);
    frame_from_body(&raw[..len - 2])
}

fn crc_mismatch(frame: &[u8]) -> FrameError {
    let (body, tail) = frame.split_at(frame.len() - 2);
    FrameError::ChecksumMismatch {
        expected: crc16(body),
        actual: u16::from_le_bytes([tail[0], tail[1]]),
    }
}

fn decode_ascii(src: &mut BytesMut) -> Result<Option<Frame>> {
    match src.iter().position(|&b| b == ASCII_START) {
        Some(0) => {}
        Some(start) => src.advance(start),
        None => {
            src.clear();
            return Ok(None);
        }
    }

    let Some(end) = src.windows(2).position(|w| w == ASCII_END.as_slice()) else {
        if src.len() > MAX_ASCII_FRAME_SIZE {
            return Err(FrameError::InvalidLength(src.len()));
        }
        return Ok(None);
    };

    let text = &src[1..end];
    if text.len() % 2 != 0 || text.len() < 6 {
        return Err(FrameError::InvalidLength(text.len()));
    }
    let body = hex::decode(text).map_err(|err| FrameError::InvalidEncoding(err.to_string()))?;
    let (data, checksum) = body.split_at(body.len() - 1);
    let expected = lrc(data);
    if expected != checksum[0] {
        return Err(FrameError::ChecksumMismatch {
            expected: expected.into(),
            actual: checksum[0].into(),
        });
    }

    let frame = frame_from_body(data);
    src.advance(end + ASCII_END.len());
    Ok(Some(frame))
}

fn decode_binary(src: &mut BytesMut, direction: Direction) -> Result<Option<Frame>> {
    match src.iter().position(|&b| b == BINARY_START) {
        Some(0) => {}
        Some(start) => src.advance(start),
        None => {
            src.clear();
            return Ok(None);
        }
    }

    let mut body = Vec::with_capacity(src.len());
    let mut i = 1;
    let end = loop {
        let Some(&byte) = src.get(i) else {
            if src.len() > 2 * MAX_RTU_FRAME_SIZE + 2 {
                return Err(FrameError::InvalidLength(src.len()));
            }
            return Ok(None);
        };
        let next = src.get(i + 1).copied();
        match (byte, next) {
            (BINARY_START, Some(BINARY_START)) | (BINARY_END, Some(BINARY_END)) => {
                body.push(byte);
                i += 2;
            }
            (BINARY_START, None) => return Ok(None),
            (BINARY_START, Some(_)) => {
                return Err(FrameError::InvalidEncoding(
                    "unescaped start byte inside binary frame".to_string(),
                ));
            }
            // A trailing '}' may be the first half of an escaped pair while the
            // body is still short of the length its function code implies.
            (BINARY_END, None)
                if !crc_matches(&body) && binary_body_incomplete(&body, direction) =>
            {
                return Ok(None);
            }
            (BINARY_END, _) => break i,
            (other, _) => {
                body.push(other);
                i += 1;
            }
        }
    };

    if body.len() < MIN_RTU_FRAME_SIZE {
        return Err(FrameError::InvalidLength(body.len()));
    }
    if !crc_matches(&body) {
        return Err(crc_mismatch(&body));
    }

    let frame = frame_from_body(&body[..body.len() - 2]);
    src.advance(end + 1);
    Ok(Some(frame))
}

fn binary_body_incomplete(body: &[u8], direction: Direction) -> bool {
    if body.len() < MIN_RTU_FRAME_SIZE {
        return true;
    }
    match rtu_frame_len(body, direction) {
        RtuLength::Known(len) => body.len() < len,
        RtuLength::NeedMore => true,
        RtuLength::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{READ_COILS, WRITE_MULTIPLE_COILS, WRITE_SINGLE_COIL};

    const ALL_MODES: [FramingMode; 4] = [
        FramingMode::Socket,
        FramingMode::Rtu,
        FramingMode::Ascii,
        FramingMode::Binary,
    ];

    fn read_coils_request() -> Frame {
        Frame::new(0x01, READ_COILS, vec![0x00, 0x00, 0x00, 0x01]).with_transaction_id(7)
    }

    fn encoded(mode: FramingMode, frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(mode, frame, &mut buf).unwrap();
        buf
    }

    #[test]
    fn socket_wire_layout() {
        let buf = encoded(FramingMode::Socket, &read_coils_request());
        assert_eq!(
            buf.as_ref(),
            &[0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn rtu_wire_layout() {
        let buf = encoded(FramingMode::Rtu, &read_coils_request());
        assert_eq!(
            buf.as_ref(),
            &[0x01, 0x01, 0x00, 0x00, 0x00, 0x01, 0xFD, 0xCA]
        );
    }

    #[test]
    fn ascii_wire_layout() {
        let buf = encoded(FramingMode::Ascii, &read_coils_request());
        assert_eq!(buf.as_ref(), b":010100000001FD\r\n");
    }

    #[test]
    fn binary_escapes_delimiters() {
        let frame = Frame::new(0x7B, WRITE_SINGLE_COIL, vec![0x00, 0x7D, 0xFF, 0x00]);
        let buf = encoded(FramingMode::Binary, &frame);
        assert_eq!(buf[0], BINARY_START);
        assert_eq!(&buf[1..3], &[0x7B, 0x7B]);
        assert_eq!(&buf[4..7], &[0x00, 0x7D, 0x7D]);
        assert_eq!(buf[buf.len() - 1], BINARY_END);

        let mut wire = buf.clone();
        let decoded = decode_request(&mut wire, FramingMode::Binary)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
        assert!(wire.is_empty());
    }

    #[test]
    fn roundtrip_preserves_unit_function_and_payload() {
        let frame = Frame::new(
            0x11,
            WRITE_MULTIPLE_COILS,
            vec![0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01],
        );
        for mode in ALL_MODES {
            let frame = if mode.uses_transaction_id() {
                frame.clone().with_transaction_id(0xBEEF)
            } else {
                frame.clone()
            };
            let mut wire = encoded(mode, &frame);
            let decoded = decode_request(&mut wire, mode).unwrap().unwrap();
            assert_eq!(decoded, frame, "mode {mode}");
            assert!(wire.is_empty(), "mode {mode}");
        }
    }

    #[test]
    fn partial_frames_need_more_data() {
        for mode in ALL_MODES {
            let full = encoded(mode, &read_coils_request());
            for cut in 0..full.len() {
                let mut partial = BytesMut::from(&full[..cut]);
                let result = decode_request(&mut partial, mode).unwrap();
                assert!(result.is_none(), "mode {mode} cut {cut}");
            }
        }
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let first = Frame::new(1, READ_COILS, vec![0x01, 0x01]);
        let second = Frame::new(2, READ_COILS, vec![0x01, 0x00]);
        for mode in ALL_MODES {
            let mut wire = encoded(mode, &first);
            wire.extend_from_slice(&encoded(mode, &second));

            let a = decode_response(&mut wire, mode).unwrap().unwrap();
            let b = decode_response(&mut wire, mode).unwrap().unwrap();
            assert_eq!(a.unit_id, 1, "mode {mode}");
            assert_eq!(b.unit_id, 2, "mode {mode}");
            assert!(wire.is_empty(), "mode {mode}");
        }
    }

    #[test]
    fn socket_rejects_foreign_protocol_id() {
        let mut wire = BytesMut::from(&[0x00, 0x01, 0x00, 0x05, 0x00, 0x02, 0x01, 0x01][..]);
        let err = decode_response(&mut wire, FramingMode::Socket).unwrap_err();
        assert!(matches!(err, FrameError::InvalidProtocolId(5)));
        assert!(err.is_corrupt());
    }

    #[test]
    fn socket_rejects_impossible_length() {
        let mut wire = BytesMut::from(&[0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01][..]);
        let err = decode_response(&mut wire, FramingMode::Socket).unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength(256)));
    }

    #[test]
    fn socket_exception_response() {
        let frame = Frame::new(1, 0x81, vec![0x02]).with_transaction_id(3);
        let mut wire = encoded(FramingMode::Socket, &frame);
        let decoded = decode_response(&mut wire, FramingMode::Socket)
            .unwrap()
            .unwrap();
        assert!(decoded.is_exception());
        assert_eq!(decoded.exception_code(), Some(0x02));
    }

    #[test]
    fn rtu_exception_response_is_five_bytes() {
        let frame = Frame::new(1, 0x81, vec![0x02]);
        let mut wire = encoded(FramingMode::Rtu, &frame);
        assert_eq!(wire.len(), 5);
        wire.extend_from_slice(&[0xAA]);
        let decoded = decode_response(&mut wire, FramingMode::Rtu)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.exception_code(), Some(0x02));
        assert_eq!(wire.as_ref(), &[0xAA]);
    }

    #[test]
    fn rtu_bad_crc_is_corrupt() {
        let mut wire = encoded(FramingMode::Rtu, &Frame::new(1, READ_COILS, vec![0x01, 0x01]));
        let last = wire.len() - 1;
        wire[last] ^= 0x55;
        let err = decode_response(&mut wire, FramingMode::Rtu).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn rtu_resyncs_past_leading_noise() {
        let frame = Frame::new(1, READ_COILS, vec![0x01, 0x01]);
        let mut wire = BytesMut::from(&[0x00, 0x03][..]);
        wire.extend_from_slice(&encoded(FramingMode::Rtu, &frame));
        wire.extend_from_slice(&[0x00; 8]);

        let decoded = decode_response(&mut wire, FramingMode::Rtu)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rtu_unknown_function_scans_for_crc() {
        let frame = Frame::new(9, 0x41, vec![0x10, 0x20, 0x30]);
        let mut wire = encoded(FramingMode::Rtu, &frame);
        let decoded = decode_response(&mut wire, FramingMode::Rtu)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn ascii_bad_lrc_is_corrupt() {
        let mut wire = BytesMut::from(&b":010100000001FA\r\n"[..]);
        let err = decode_request(&mut wire, FramingMode::Ascii).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                expected: 0xFD,
                actual: 0xFA
            }
        ));
    }

    #[test]
    fn ascii_rejects_non_hex() {
        let mut wire = BytesMut::from(&b":01010000000ZFD\r\n"[..]);
        let err = decode_request(&mut wire, FramingMode::Ascii).unwrap_err();
        assert!(matches!(err, FrameError::InvalidEncoding(_)));
    }

    #[test]
    fn ascii_skips_noise_before_start() {
        let mut wire = BytesMut::from(&b"\r\nxx:010100000001FD\r\n"[..]);
        let frame = decode_request(&mut wire, FramingMode::Ascii)
            .unwrap()
            .unwrap();
        assert_eq!(frame.unit_id, 1);
        assert_eq!(frame.function, READ_COILS);
        assert!(wire.is_empty());
    }

    #[test]
    fn binary_bad_crc_is_corrupt() {
        let mut wire = encoded(FramingMode::Binary, &read_coils_request());
        let n = wire.len();
        wire[n - 2] ^= 0x01;
        wire.extend_from_slice(b"{");
        let err = decode_request(&mut wire, FramingMode::Binary).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn binary_bad_crc_at_end_of_buffer_is_corrupt() {
        let mut wire = encoded(FramingMode::Binary, &read_coils_request());
        let n = wire.len();
        wire[n - 2] ^= 0x01;
        let err = decode_request(&mut wire, FramingMode::Binary).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn binary_escaped_end_split_across_reads_waits() {
        let frame = Frame::new(0x01, WRITE_SINGLE_COIL, vec![0x00, 0x01, 0x7D, 0x00]);
        let full = encoded(FramingMode::Binary, &frame);
        let split = full.iter().position(|&b| b == BINARY_END).unwrap() + 1;

        let mut wire = BytesMut::from(&full[..split]);
        assert!(decode_request(&mut wire, FramingMode::Binary).unwrap().is_none());
        wire.extend_from_slice(&full[split..]);
        let decoded = decode_request(&mut wire, FramingMode::Binary)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn oversized_pdu_is_rejected() {
        let frame = Frame::new(1, 0x10, vec![0u8; MAX_PDU_SIZE]);
        for mode in ALL_MODES {
            let mut buf = BytesMut::new();
            let err = encode_frame(mode, &frame, &mut buf).unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
            assert!(!err.is_corrupt());
        }
    }

    #[test]
    fn framing_mode_names() {
        assert!(FramingMode::Socket.uses_transaction_id());
        assert!(!FramingMode::Rtu.uses_transaction_id());
        assert_eq!(FramingMode::Ascii.to_string(), "ascii");
    }
}
