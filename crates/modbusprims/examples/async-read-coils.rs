//! Read coils over Modbus TCP with tokio and the frame codec.
//!
//! Run with:
//!   cargo run --example async-read-coils --features async -- 127.0.0.1:5020

use bytes::BytesMut;
use modbusprims::frame::{function, Frame, FramingMode, ModbusCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5020".to_string());
    let mut stream = TcpStream::connect(&addr).await?;
    let mut codec = ModbusCodec::client(FramingMode::Socket);

    let request = Frame::new(1, function::READ_COILS, vec![0x00, 0x00, 0x00, 0x08])
        .with_transaction_id(1);
    let mut out = BytesMut::new();
    codec.encode(&request, &mut out)?;
    stream.write_all(&out).await?;

    let mut buf = BytesMut::with_capacity(256);
    let reply = loop {
        if let Some(frame) = codec.decode(&mut buf)? {
            break frame;
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err("device closed the connection".into());
        }
    };

    match reply.exception_code() {
        Some(code) => eprintln!("device exception {code:#04x}"),
        None => println!("coils 0..8: {:08b}", reply.payload.get(1).copied().unwrap_or(0)),
    }
    Ok(())
}
