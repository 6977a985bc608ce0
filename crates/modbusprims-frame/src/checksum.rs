use crc::{Crc, CRC_16_MODBUS};

const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC-16/MODBUS (reflected polynomial 0xA001, initial value 0xFFFF).
///
/// Goes on the wire low byte first.
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Longitudinal redundancy check: two's complement of the byte sum.
pub fn lrc(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |acc, &byte| acc.wrapping_add(byte))
        .wrapping_neg()
}

/// Returns true if the trailing two bytes of `frame` are the CRC of the rest.
pub(crate) fn crc_matches(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    crc16(body) == u16::from_le_bytes([tail[0], tail[1]])
}
