use bytes::{BufMut, BytesMut};
use modbusprims_frame::{function, Frame, MAX_PDU_SIZE};
use serde::Serialize;

use crate::error::{ModbusError, Result};
use crate::response::pack_bits;

/// Unit id used when a request does not name one.
pub const DEFAULT_UNIT_ID: u8 = 0x00;

/// Wire value of an energised coil in a single-coil write.
pub const COIL_ON: u16 = 0xFF00;
/// Wire value of a de-energised coil in a single-coil write.
pub const COIL_OFF: u16 = 0x0000;

pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_BITS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

const ADDRESS_SPACE: u32 = 0x1_0000;

/// Function-specific request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPdu {
    ReadCoils { address: u16, count: u16 },
    ReadDiscreteInputs { address: u16, count: u16 },
    ReadHoldingRegisters { address: u16, count: u16 },
    ReadInputRegisters { address: u16, count: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, values: Vec<bool> },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
}

/// A validated request addressed to one unit.
///
/// Built through the constructors below, which reject out-of-range
/// quantities before anything touches the wire. The transaction id is not
/// part of the request; the client assigns it when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub unit_id: u8,
    pub pdu: RequestPdu,
}

impl Request {
    fn build(pdu: RequestPdu) -> Result<Self> {
        let request = Self {
            unit_id: DEFAULT_UNIT_ID,
            pdu,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn read_coils(address: u16, count: u16) -> Result<Self> {
        Self::build(RequestPdu::ReadCoils { address, count })
    }

    pub fn read_discrete_inputs(address: u16, count: u16) -> Result<Self> {
        Self::build(RequestPdu::ReadDiscreteInputs { address, count })
    }

    pub fn read_holding_registers(address: u16, count: u16) -> Result<Self> {
        Self::build(RequestPdu::ReadHoldingRegisters { address, count })
    }

    pub fn read_input_registers(address: u16, count: u16) -> Result<Self> {
        Self::build(RequestPdu::ReadInputRegisters { address, count })
    }

    /// Single-coil write. Every address and boolean is encodable.
    pub fn write_coil(address: u16, value: bool) -> Self {
        Self {
            unit_id: DEFAULT_UNIT_ID,
            pdu: RequestPdu::WriteSingleCoil { address, value },
        }
    }

    pub fn write_register(address: u16, value: u16) -> Self {
        Self {
            unit_id: DEFAULT_UNIT_ID,
            pdu: RequestPdu::WriteSingleRegister { address, value },
        }
    }

    pub fn write_coils(address: u16, values: &[bool]) -> Result<Self> {
        Self::build(RequestPdu::WriteMultipleCoils {
            address,
            values: values.to_vec(),
        })
    }

    pub fn write_registers(address: u16, values: &[u16]) -> Result<Self> {
        Self::build(RequestPdu::WriteMultipleRegisters {
            address,
            values: values.to_vec(),
        })
    }

    /// Address the request to `unit_id`.
    pub fn with_unit(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    pub fn function_code(&self) -> u8 {
        match &self.pdu {
            RequestPdu::ReadCoils { .. } => function::READ_COILS,
            RequestPdu::ReadDiscreteInputs { .. } => function::READ_DISCRETE_INPUTS,
            RequestPdu::ReadHoldingRegisters { .. } => function::READ_HOLDING_REGISTERS,
            RequestPdu::ReadInputRegisters { .. } => function::READ_INPUT_REGISTERS,
            RequestPdu::WriteSingleCoil { .. } => function::WRITE_SINGLE_COIL,
            RequestPdu::WriteSingleRegister { .. } => function::WRITE_SINGLE_REGISTER,
            RequestPdu::WriteMultipleCoils { .. } => function::WRITE_MULTIPLE_COILS,
            RequestPdu::WriteMultipleRegisters { .. } => function::WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Check quantity limits and that the addressed range fits in 16 bits.
    pub fn validate(&self) -> Result<()> {
        match &self.pdu {
            RequestPdu::ReadCoils { address, count }
            | RequestPdu::ReadDiscreteInputs { address, count } => {
                check_range(*address, *count as usize, MAX_READ_BITS)
            }
            RequestPdu::ReadHoldingRegisters { address, count }
            | RequestPdu::ReadInputRegisters { address, count } => {
                check_range(*address, *count as usize, MAX_READ_REGISTERS)
            }
            RequestPdu::WriteSingleCoil { .. } | RequestPdu::WriteSingleRegister { .. } => Ok(()),
            RequestPdu::WriteMultipleCoils { address, values } => {
                check_range(*address, values.len(), MAX_WRITE_BITS)
            }
            RequestPdu::WriteMultipleRegisters { address, values } => {
                check_range(*address, values.len(), MAX_WRITE_REGISTERS)
            }
        }
    }

    /// Encode the request body (everything after the function code).
    pub fn encode_payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(MAX_PDU_SIZE);
        match &self.pdu {
            RequestPdu::ReadCoils { address, count }
            | RequestPdu::ReadDiscreteInputs { address, count }
            | RequestPdu::ReadHoldingRegisters { address, count }
            | RequestPdu::ReadInputRegisters { address, count } => {
                buf.put_u16(*address);
                buf.put_u16(*count);
            }
            RequestPdu::WriteSingleCoil { address, value } => {
                buf.put_u16(*address);
                buf.put_u16(if *value { COIL_ON } else { COIL_OFF });
            }
            RequestPdu::WriteSingleRegister { address, value } => {
                buf.put_u16(*address);
                buf.put_u16(*value);
            }
            RequestPdu::WriteMultipleCoils { address, values } => {
                let packed = pack_bits(values);
                buf.put_u16(*address);
                buf.put_u16(values.len() as u16);
                buf.put_u8(packed.len() as u8);
                buf.put_slice(&packed);
            }
            RequestPdu::WriteMultipleRegisters { address, values } => {
                buf.put_u16(*address);
                buf.put_u16(values.len() as u16);
                buf.put_u8((values.len() * 2) as u8);
                for value in values {
                    buf.put_u16(*value);
                }
            }
        }
        buf
    }

    /// Build the wire frame. `transaction_id` is only carried by socket framing.
    pub fn to_frame(&self, transaction_id: Option<u16>) -> Frame {
        let frame = Frame::new(
            self.unit_id,
            self.function_code(),
            self.encode_payload().freeze(),
        );
        match transaction_id {
            Some(tid) => frame.with_transaction_id(tid),
            None => frame,
        }
    }
}

fn check_range(address: u16, count: usize, max: u16) -> Result<()> {
    if count == 0 || count > max as usize {
        return Err(ModbusError::InvalidRequest(format!(
            "quantity {count} outside 1..={max}"
        )));
    }
    if address as u32 + count as u32 > ADDRESS_SPACE {
        return Err(ModbusError::InvalidRequest(format!(
            "address {address} + quantity {count} exceeds 65536"
        )));
    }
    Ok(())
}
