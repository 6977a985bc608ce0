//! Write coil 0 and read it back on units 1..=5 of a Modbus TCP device.
//!
//! Run with:
//!   cargo run --example coil-loop -- 127.0.0.1 5020

use modbusprims::client::connect;
use modbusprims::transport::ConnectionParams;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(5020);

    let mut client = connect(ConnectionParams::tcp(host, port))?;
    for unit in 1..=5 {
        if let Err(err) = client.write_coil(0, true, unit) {
            eprintln!("unit {unit}: write failed: {err}");
            continue;
        }
        match client.read_coils(0, 1, unit) {
            Ok(values) => println!("unit {unit}: coil 0 = {values:?}"),
            Err(err) => eprintln!("unit {unit}: read failed: {err}"),
        }
    }
    client.close();
    Ok(())
}
