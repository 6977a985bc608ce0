//! Modbus function codes.
//!
//! Codes 0x01-0x7F are requests. A response with the high bit set
//! (`code | 0x80`) is an exception reply to `code`.

pub const READ_COILS: u8 = 0x01;
pub const READ_DISCRETE_INPUTS: u8 = 0x02;
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;
pub const WRITE_SINGLE_COIL: u8 = 0x05;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const READ_EXCEPTION_STATUS: u8 = 0x07;
pub const GET_COMM_EVENT_COUNTER: u8 = 0x0B;
pub const GET_COMM_EVENT_LOG: u8 = 0x0C;
pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const REPORT_SERVER_ID: u8 = 0x11;
pub const READ_FILE_RECORD: u8 = 0x14;
pub const WRITE_FILE_RECORD: u8 = 0x15;
pub const MASK_WRITE_REGISTER: u8 = 0x16;
pub const READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;

/// High bit marking an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Returns a human-readable name for a function code.
pub fn function_name(code: u8) -> &'static str {
    match code {
        READ_COILS => "READ_COILS",
        READ_DISCRETE_INPUTS => "READ_DISCRETE_INPUTS",
        READ_HOLDING_REGISTERS => "READ_HOLDING_REGISTERS",
        READ_INPUT_REGISTERS => "READ_INPUT_REGISTERS",
        WRITE_SINGLE_COIL => "WRITE_SINGLE_COIL",
        WRITE_SINGLE_REGISTER => "WRITE_SINGLE_REGISTER",
        READ_EXCEPTION_STATUS => "READ_EXCEPTION_STATUS",
        GET_COMM_EVENT_COUNTER => "GET_COMM_EVENT_COUNTER",
        GET_COMM_EVENT_LOG => "GET_COMM_EVENT_LOG",
        WRITE_MULTIPLE_COILS => "WRITE_MULTIPLE_COILS",
        WRITE_MULTIPLE_REGISTERS => "WRITE_MULTIPLE_REGISTERS",
        REPORT_SERVER_ID => "REPORT_SERVER_ID",
        READ_FILE_RECORD => "READ_FILE_RECORD",
        WRITE_FILE_RECORD => "WRITE_FILE_RECORD",
        MASK_WRITE_REGISTER => "MASK_WRITE_REGISTER",
        READ_WRITE_MULTIPLE_REGISTERS => "READ_WRITE_MULTIPLE_REGISTERS",
        code if is_exception(code) => "EXCEPTION",
        _ => "UNKNOWN",
    }
}

/// Returns true if the function code signals an exception response.
pub fn is_exception(code: u8) -> bool {
    code & EXCEPTION_FLAG != 0
}

/// The exception function code a device answers with when `code` fails.
pub fn exception_of(code: u8) -> u8 {
    code | EXCEPTION_FLAG
}
