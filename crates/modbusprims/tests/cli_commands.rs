#![cfg(feature = "cli")]

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::BytesMut;
use modbusprims_frame::{encode_frame, function, Direction, Frame, FrameReader, FramingMode};

const COIL_COUNT: usize = 16;

/// Loopback coil device serving Modbus TCP until the test process exits.
fn spawn_device() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("device should bind");
    let port = listener.local_addr().expect("bound address").port();
    let coils = Arc::new(Mutex::new([false; COIL_COUNT]));

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let coils = Arc::clone(&coils);
            thread::spawn(move || serve(stream, &coils));
        }
    });
    port
}

fn serve(stream: TcpStream, coils: &Mutex<[bool; COIL_COUNT]>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = FrameReader::new(stream, FramingMode::Socket, Direction::Request);
    while let Ok(request) = reader.read_frame() {
        let reply = handle(&request, coils);
        let mut wire = BytesMut::new();
        encode_frame(FramingMode::Socket, &reply, &mut wire).expect("reply should encode");
        if writer.write_all(&wire).is_err() {
            return;
        }
    }
}

fn handle(request: &Frame, coils: &Mutex<[bool; COIL_COUNT]>) -> Frame {
    let mut coils = coils.lock().expect("coil table lock");
    let data = &request.payload[..];
    let address = u16::from_be_bytes([data[0], data[1]]) as usize;
    let word = u16::from_be_bytes([data[2], data[3]]);

    let reply = match request.function {
        function::READ_COILS if address + word as usize <= COIL_COUNT => {
            let mut packed = vec![0u8; (word as usize).div_ceil(8)];
            for i in 0..word as usize {
                if coils[address + i] {
                    packed[i / 8] |= 1 << (i % 8);
                }
            }
            let mut payload = vec![packed.len() as u8];
            payload.extend(packed);
            Frame::new(request.unit_id, request.function, payload)
        }
        function::WRITE_SINGLE_COIL if address < COIL_COUNT => {
            coils[address] = word == 0xFF00;
            Frame::new(request.unit_id, request.function, request.payload.clone())
        }
        other => Frame::new(request.unit_id, other | 0x80, vec![0x02]),
    };
    reply.with_transaction_id(request.transaction_id.unwrap_or_default())
}

/// Accepts connections and never answers.
fn spawn_silent_device() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("device should bind");
    let port = listener.local_addr().expect("bound address").port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    port
}

fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("ephemeral port")
        .port()
}

fn cli(port: u16, args: &[&str]) -> Output {
    let port = port.to_string();
    let mut command = Command::new(env!("CARGO_BIN_EXE_modbusprims"));
    command.args(["--log-level", "error", "--format", "json"]);
    command.args(&args[..1]);
    command.arg("127.0.0.1");
    command.args(["--port", &port, "--timeout", "500ms"]);
    command.args(&args[1..]);
    command.output().expect("cli should run")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn write_coil_then_read_it_back() {
    let port = spawn_device();

    let write = cli(port, &["write-coil", "--address", "0", "--value", "true", "--unit", "1"]);
    assert!(write.status.success(), "stderr: {}", String::from_utf8_lossy(&write.stderr));
    assert_eq!(json(&write)["value"], true);

    let read = cli(port, &["read-coils", "--address", "0", "--count", "1", "--unit", "1"]);
    assert!(read.status.success(), "stderr: {}", String::from_utf8_lossy(&read.stderr));
    let out = json(&read);
    assert_eq!(out["values"], serde_json::json!([true]));
    assert_eq!(out["unit"], 1);
}

#[test]
fn read_reports_exactly_count_values() {
    let port = spawn_device();
    let read = cli(port, &["read-coils", "--address", "3", "--count", "10"]);
    assert!(read.status.success());
    assert_eq!(json(&read)["values"].as_array().map(Vec::len), Some(10));
}

#[test]
fn device_exception_exits_60() {
    let port = spawn_device();
    let read = cli(port, &["read-coils", "--address", "10", "--count", "100"]);
    assert_eq!(read.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&read.stderr).contains("illegal data address"));
}

#[test]
fn invalid_count_exits_64() {
    let port = spawn_device();
    let read = cli(port, &["read-coils", "--count", "2001"]);
    assert_eq!(read.status.code(), Some(64));
}

#[test]
fn refused_connection_exits_3() {
    let read = cli(unused_port(), &["read-coils"]);
    assert_eq!(read.status.code(), Some(3));
}

#[test]
fn write_coil_refused_connection_exits_3() {
    let write = cli(unused_port(), &["write-coil", "--address", "0"]);
    assert_eq!(write.status.code(), Some(3));
}

#[test]
fn silent_device_exits_124_after_retries() {
    let port = spawn_silent_device();
    let read = cli(port, &["read-coils", "--retries", "1"]);
    assert_eq!(read.status.code(), Some(124));
    assert!(String::from_utf8_lossy(&read.stderr).contains("2 attempt"));
}

#[test]
fn replay_counts_requests() {
    let port = spawn_device();
    let replay = cli(port, &["replay", "--iterations", "3", "--seed", "7", "--max-unit", "5"]);
    assert!(replay.status.success(), "stderr: {}", String::from_utf8_lossy(&replay.stderr));

    let out = json(&replay);
    assert_eq!(out["completed"], 3);
    assert_eq!(out["requests"], 7);
    assert_eq!(out["failures"], 0);
    assert_eq!(out["interrupted"], false);
}

#[test]
fn replay_keeps_going_after_timeouts() {
    let port = spawn_silent_device();
    let replay = cli(port, &["replay", "--iterations", "1", "--retries", "0"]);
    assert!(replay.status.success());
    let out = json(&replay);
    assert_eq!(out["failures"], 3);
    assert_eq!(out["timeouts"], 3);
}

#[test]
fn version_prints_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_modbusprims"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("modbusprims "));
}
