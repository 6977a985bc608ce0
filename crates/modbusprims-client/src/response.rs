use std::fmt;

use bytes::Buf;
use modbusprims_frame::{function, Frame};
use serde::Serialize;

use crate::error::{ModbusError, Result};
use crate::request::{Request, RequestPdu, COIL_OFF, COIL_ON};

/// Exception codes a device may return in an exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Other(u8),
}

impl ExceptionCode {
    pub fn code(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerDeviceBusy => 0x06,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetFailedToRespond => 0x0B,
            ExceptionCode::Other(code) => code,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "gateway target failed to respond",
            ExceptionCode::Other(_) => "unknown exception",
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Other(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.description(), self.code())
    }
}

/// Decoded, request-validated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Response {
    Coils(Vec<bool>),
    DiscreteInputs(Vec<bool>),
    HoldingRegisters(Vec<u16>),
    InputRegisters(Vec<u16>),
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, count: u16 },
    WriteMultipleRegisters { address: u16, count: u16 },
}

impl Response {
    /// Decode a matched, non-exception frame as the answer to `request`.
    pub fn decode(request: &Request, frame: &Frame) -> Result<Self> {
        let expected = request.function_code();
        if frame.function != expected {
            return Err(unexpected(format!(
                "function {:#04x} does not answer {:#04x}",
                frame.function, expected
            )));
        }

        let payload = &frame.payload[..];
        match &request.pdu {
            RequestPdu::ReadCoils { count, .. } => {
                decode_bits(payload, *count).map(Response::Coils)
            }
            RequestPdu::ReadDiscreteInputs { count, .. } => {
                decode_bits(payload, *count).map(Response::DiscreteInputs)
            }
            RequestPdu::ReadHoldingRegisters { count, .. } => {
                decode_registers(payload, *count).map(Response::HoldingRegisters)
            }
            RequestPdu::ReadInputRegisters { count, .. } => {
                decode_registers(payload, *count).map(Response::InputRegisters)
            }
            RequestPdu::WriteSingleCoil { address, value } => {
                let (echo_address, raw) = decode_echo(payload)?;
                let echo_value = match raw {
                    COIL_ON => true,
                    COIL_OFF => false,
                    other => return Err(unexpected(format!("invalid coil value {other:#06x}"))),
                };
                check_echo("address", *address, echo_address)?;
                if echo_value != *value {
                    return Err(unexpected(format!(
                        "coil echo {echo_value} does not match written {value}"
                    )));
                }
                Ok(Response::WriteSingleCoil {
                    address: echo_address,
                    value: echo_value,
                })
            }
            RequestPdu::WriteSingleRegister { address, value } => {
                let (echo_address, echo_value) = decode_echo(payload)?;
                check_echo("address", *address, echo_address)?;
                check_echo("value", *value, echo_value)?;
                Ok(Response::WriteSingleRegister {
                    address: echo_address,
                    value: echo_value,
                })
            }
            RequestPdu::WriteMultipleCoils { address, values } => {
                let (echo_address, echo_count) = decode_echo(payload)?;
                check_echo("address", *address, echo_address)?;
                check_echo("quantity", values.len() as u16, echo_count)?;
                Ok(Response::WriteMultipleCoils {
                    address: echo_address,
                    count: echo_count,
                })
            }
            RequestPdu::WriteMultipleRegisters { address, values } => {
                let (echo_address, echo_count) = decode_echo(payload)?;
                check_echo("address", *address, echo_address)?;
                check_echo("quantity", values.len() as u16, echo_count)?;
                Ok(Response::WriteMultipleRegisters {
                    address: echo_address,
                    count: echo_count,
                })
            }
        }
    }

    pub fn function_code(&self) -> u8 {
        match self {
            Response::Coils(_) => function::READ_COILS,
            Response::DiscreteInputs(_) => function::READ_DISCRETE_INPUTS,
            Response::HoldingRegisters(_) => function::READ_HOLDING_REGISTERS,
            Response::InputRegisters(_) => function::READ_INPUT_REGISTERS,
            Response::WriteSingleCoil { .. } => function::WRITE_SINGLE_COIL,
            Response::WriteSingleRegister { .. } => function::WRITE_SINGLE_REGISTER,
            Response::WriteMultipleCoils { .. } => function::WRITE_MULTIPLE_COILS,
            Response::WriteMultipleRegisters { .. } => function::WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Bit values for coil and discrete-input reads.
    pub fn bits(&self) -> Option<&[bool]> {
        match self {
            Response::Coils(bits) | Response::DiscreteInputs(bits) => Some(bits),
            _ => None,
        }
    }

    /// Register values for holding- and input-register reads.
    pub fn registers(&self) -> Option<&[u16]> {
        match self {
            Response::HoldingRegisters(regs) | Response::InputRegisters(regs) => Some(regs),
            _ => None,
        }
    }
}

/// Pack booleans LSB-first into bytes, the way coil values travel on the wire.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpack exactly `count` booleans, ignoring padding bits in the last byte.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes.get(i / 8).is_some_and(|b| b & (1 << (i % 8)) != 0))
        .collect()
}

fn unexpected(message: String) -> ModbusError {
    ModbusError::UnexpectedResponse(message)
}

fn byte_counted(payload: &[u8], expected: usize) -> Result<&[u8]> {
    let Some((&byte_count, data)) = payload.split_first() else {
        return Err(unexpected("missing byte count".to_string()));
    };
    if byte_count as usize != expected || data.len() != expected {
        return Err(unexpected(format!(
            "byte count {byte_count} with {} data bytes, expected {expected}",
            data.len()
        )));
    }
    Ok(data)
}

fn decode_bits(payload: &[u8], count: u16) -> Result<Vec<bool>> {
    let count = count as usize;
    let data = byte_counted(payload, count.div_ceil(8))?;
    Ok(unpack_bits(data, count))
}

fn decode_registers(payload: &[u8], count: u16) -> Result<Vec<u16>> {
    let mut data = byte_counted(payload, count as usize * 2)?;
    let mut registers = Vec::with_capacity(count as usize);
    while data.has_remaining() {
        registers.push(data.get_u16());
    }
    Ok(registers)
}

fn decode_echo(payload: &[u8]) -> Result<(u16, u16)> {
    if payload.len() != 4 {
        return Err(unexpected(format!(
            "write echo must be 4 bytes, got {}",
            payload.len()
        )));
    }
    let mut data = payload;
    Ok((data.get_u16(), data.get_u16()))
}

fn check_echo(field: &str, sent: u16, echoed: u16) -> Result<()> {
    if sent != echoed {
        return Err(unexpected(format!(
            "echoed {field} {echoed} does not match request {sent}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: u8, payload: Vec<u8>) -> Frame {
        Frame::new(1, function, payload)
    }

    #[test]
    fn exception_code_mapping() {
        assert_eq!(ExceptionCode::from(0x02), ExceptionCode::IllegalDataAddress);
        assert_eq!(ExceptionCode::from(0x0B).code(), 0x0B);
        assert_eq!(ExceptionCode::from(0x07), ExceptionCode::Other(0x07));
        assert_eq!(
            ExceptionCode::IllegalFunction.to_string(),
            "illegal function (0x01)"
        );
    }

    #[test]
    fn coils_drop_padding_bits() {
        let request = Request::read_coils(0, 10).unwrap();
        let response =
            Response::decode(&request, &frame(function::READ_COILS, vec![2, 0xFF, 0xFF])).unwrap();
        assert_eq!(response.bits().unwrap(), &[true; 10]);
    }

    #[test]
    fn coils_in_address_order() {
        let request = Request::read_coils(0, 3).unwrap();
        let response =
            Response::decode(&request, &frame(function::READ_COILS, vec![1, 0b101])).unwrap();
        assert_eq!(response, Response::Coils(vec![true, false, true]));
    }

    #[test]
    fn coil_count_exact_for_full_range() {
        for count in [1u16, 7, 8, 9, 2000] {
            let bits: Vec<bool> = (0..count).map(|i| i % 3 == 0).collect();
            let mut payload = vec![count.div_ceil(8) as u8];
            payload.extend(pack_bits(&bits));
            let request = Request::read_coils(0, count).unwrap();
            let response =
                Response::decode(&request, &frame(function::READ_COILS, payload)).unwrap();
            assert_eq!(response.bits().unwrap(), bits.as_slice());
        }
    }

    #[test]
    fn wrong_byte_count_rejected() {
        let request = Request::read_coils(0, 9).unwrap();
        let err = Response::decode(&request, &frame(function::READ_COILS, vec![1, 0xFF]))
            .unwrap_err();
        assert!(matches!(err, ModbusError::UnexpectedResponse(_)));
    }

    #[test]
    fn registers_are_big_endian() {
        let request = Request::read_holding_registers(0, 2).unwrap();
        let response = Response::decode(
            &request,
            &frame(
                function::READ_HOLDING_REGISTERS,
                vec![4, 0x12, 0x34, 0x00, 0x01],
            ),
        )
        .unwrap();
        assert_eq!(response.registers().unwrap(), &[0x1234, 0x0001]);
    }

    #[test]
    fn write_coil_echo_checked() {
        let request = Request::write_coil(5, true);
        let ok = Response::decode(
            &request,
            &frame(function::WRITE_SINGLE_COIL, vec![0, 5, 0xFF, 0]),
        )
        .unwrap();
        assert_eq!(
            ok,
            Response::WriteSingleCoil {
                address: 5,
                value: true
            }
        );

        let mismatched = Response::decode(
            &request,
            &frame(function::WRITE_SINGLE_COIL, vec![0, 5, 0, 0]),
        );
        assert!(matches!(
            mismatched,
            Err(ModbusError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn function_mismatch_rejected() {
        let request = Request::read_coils(0, 1).unwrap();
        let err = Response::decode(&request, &frame(function::READ_DISCRETE_INPUTS, vec![1, 1]))
            .unwrap_err();
        assert!(matches!(err, ModbusError::UnexpectedResponse(_)));
    }

    #[test]
    fn write_multiple_quantity_checked() {
        let request = Request::write_registers(10, &[1, 2, 3]).unwrap();
        let ok = Response::decode(
            &request,
            &frame(function::WRITE_MULTIPLE_REGISTERS, vec![0, 10, 0, 3]),
        )
        .unwrap();
        assert_eq!(
            ok,
            Response::WriteMultipleRegisters {
                address: 10,
                count: 3
            }
        );
    }

    #[test]
    fn pack_bits_lsb_first() {
        assert_eq!(pack_bits(&[true, false, false, true]), vec![0b1001]);
        assert_eq!(pack_bits(&[false; 9]), vec![0, 0]);
    }
}
