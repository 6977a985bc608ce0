use std::fmt;
use std::thread;
use std::time::Instant;

use bytes::BytesMut;
use modbusprims_frame::{encode_frame, exception_of, Direction, Frame, FrameBuffer, FrameError};
use modbusprims_transport::{Transport, TransportError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ModbusError, Result};
use crate::request::Request;
use crate::response::{ExceptionCode, Response};

/// Lifecycle of the client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: reached through `close`.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of waiting for one attempt's reply.
enum Wait {
    Frame(Frame),
    TimedOut,
    Empty,
    Corrupt(FrameError),
}

/// Synchronous Modbus master over one exclusively owned transport.
///
/// One request is in flight at a time. `execute` owns the connection for its
/// whole duration: send, wait, and every retry. Share a client between
/// threads through [`SharedClient`](crate::SharedClient).
pub struct ModbusClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    state: ConnectionState,
    frames: FrameBuffer,
    transaction_id: u16,
    last_activity: Option<Instant>,
    encode_buf: BytesMut,
}

impl<T: Transport> ModbusClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            frames: FrameBuffer::new(config.framing, Direction::Response),
            transport,
            config,
            state: ConnectionState::Disconnected,
            transaction_id: 0,
            last_activity: None,
            encode_buf: BytesMut::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect the transport. A no-op when already connected.
    ///
    /// A failed attempt leaves the client `Disconnected` so it may be retried;
    /// a closed client stays closed.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed => return Err(ModbusError::Closed),
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        self.state = ConnectionState::Connecting;
        match self.transport.connect() {
            Ok(()) => {
                self.frames.clear();
                self.last_activity = None;
                self.state = ConnectionState::Connected;
                info!(
                    transport = self.transport.name(),
                    framing = %self.config.framing,
                    "modbus client connected"
                );
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                warn!(transport = self.transport.name(), error = %err, "connect failed");
                Err(ModbusError::Connect(err))
            }
        }
    }

    /// Release the transport. Idempotent, safe from any state.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.transport.close();
        self.frames.clear();
        self.state = ConnectionState::Closed;
        info!(transport = self.transport.name(), "modbus client closed");
    }

    /// Connect, run `f`, then close whatever `f` returned.
    pub fn session<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let outcome = self.connect().and_then(|()| f(self));
        self.close();
        outcome
    }

    /// Send `request` and wait for its matching response.
    pub fn execute(&mut self, request: &Request) -> Result<Response> {
        request.validate()?;
        self.ensure_connected()?;

        let tid = self.next_transaction_id();
        let frame = request.to_frame(self.config.framing.uses_transaction_id().then_some(tid));
        self.encode_buf.clear();
        encode_frame(self.config.framing, &frame, &mut self.encode_buf)
            .map_err(|err| ModbusError::InvalidRequest(err.to_string()))?;
        let wire = self.encode_buf.split().freeze();

        let attempts = self.config.attempts();
        let mut last_corrupt = None;
        for attempt in 1..=attempts {
            self.prepare_send()?;

            debug!(
                tid,
                unit = request.unit_id,
                function = frame.function,
                attempt,
                bytes = wire.len(),
                "sending request"
            );
            if let Err(err) = self.transport.send(&wire) {
                return Err(self.connection_lost(err));
            }
            self.last_activity = Some(Instant::now());

            match self.await_response(request, tid)? {
                Wait::Frame(reply) => return self.finish(request, reply),
                Wait::TimedOut => {
                    last_corrupt = None;
                    self.frames.clear();
                    warn!(tid, attempt, attempts, "no response before timeout");
                }
                Wait::Empty => {
                    if self.transport.is_stream() {
                        warn!(tid, attempt, transport = self.transport.name(), "peer hung up");
                        self.drop_connection();
                    }
                    if !self.config.retry_on_empty {
                        return Err(ModbusError::EmptyResponse);
                    }
                    last_corrupt = None;
                    warn!(tid, attempt, attempts, "empty response");
                    if attempt < attempts && !self.is_connected() {
                        self.connect()?;
                    }
                }
                Wait::Corrupt(err) => {
                    self.frames.clear();
                    warn!(tid, attempt, attempts, error = %err, "corrupt response frame");
                    last_corrupt = Some(err);
                }
            }
        }

        Err(match last_corrupt {
            Some(source) => ModbusError::CorruptFrame { attempts, source },
            None => ModbusError::Timeout { attempts },
        })
    }

    pub fn read_coils(&mut self, address: u16, count: u16, unit: u8) -> Result<Vec<bool>> {
        let request = Request::read_coils(address, count)?.with_unit(unit);
        match self.execute(&request)? {
            Response::Coils(bits) => Ok(bits),
            other => Err(wrong_kind(&other)),
        }
    }

    pub fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<bool>> {
        let request = Request::read_discrete_inputs(address, count)?.with_unit(unit);
        match self.execute(&request)? {
            Response::DiscreteInputs(bits) => Ok(bits),
            other => Err(wrong_kind(&other)),
        }
    }

    pub fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: u8,
    ) -> Result<Vec<u16>> {
        let request = Request::read_holding_registers(address, count)?.with_unit(unit);
        match self.execute(&request)? {
            Response::HoldingRegisters(regs) => Ok(regs),
            other => Err(wrong_kind(&other)),
        }
    }

    pub fn read_input_registers(&mut self, address: u16, count: u16, unit: u8) -> Result<Vec<u16>> {
        let request = Request::read_input_registers(address, count)?.with_unit(unit);
        match self.execute(&request)? {
            Response::InputRegisters(regs) => Ok(regs),
            other => Err(wrong_kind(&other)),
        }
    }

    pub fn write_coil(&mut self, address: u16, value: bool, unit: u8) -> Result<()> {
        self.execute(&Request::write_coil(address, value).with_unit(unit))
            .map(|_| ())
    }

    pub fn write_register(&mut self, address: u16, value: u16, unit: u8) -> Result<()> {
        self.execute(&Request::write_register(address, value).with_unit(unit))
            .map(|_| ())
    }

    pub fn write_coils(&mut self, address: u16, values: &[bool], unit: u8) -> Result<()> {
        let request = Request::write_coils(address, values)?.with_unit(unit);
        self.execute(&request).map(|_| ())
    }

    pub fn write_registers(&mut self, address: u16, values: &[u16], unit: u8) -> Result<()> {
        let request = Request::write_registers(address, values)?.with_unit(unit);
        self.execute(&request).map(|_| ())
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Closed => Err(ModbusError::Closed),
            state => Err(ModbusError::NotConnected(state)),
        }
    }

    fn next_transaction_id(&mut self) -> u16 {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        self.transaction_id
    }

    /// RTU timing hook: keep the bus silent for the configured interval and
    /// drop anything left over from an earlier exchange.
    fn prepare_send(&mut self) -> Result<()> {
        if !self.config.enforces_silent_interval() {
            return Ok(());
        }
        if let Some(last) = self.last_activity {
            let silent = last.elapsed();
            if silent < self.config.inter_frame_delay {
                thread::sleep(self.config.inter_frame_delay - silent);
            }
        }
        self.frames.clear();
        if let Err(err) = self.transport.discard_input() {
            return Err(self.connection_lost(err));
        }
        Ok(())
    }

    /// Accumulate bytes until a matching frame decodes or the attempt's
    /// deadline passes. Frames for other transactions or units are dropped
    /// without ending the wait.
    fn await_response(&mut self, request: &Request, tid: u16) -> Result<Wait> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            loop {
                match self.frames.next_frame() {
                    Ok(Some(frame)) if self.is_reply_to(&frame, request, tid) => {
                        return Ok(Wait::Frame(frame));
                    }
                    Ok(Some(frame)) => {
                        warn!(
                            expected_tid = tid,
                            tid = ?frame.transaction_id,
                            expected_unit = request.unit_id,
                            unit = frame.unit_id,
                            "discarding unmatched frame"
                        );
                    }
                    Ok(None) => break,
                    Err(err) => return Ok(Wait::Corrupt(err)),
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Wait::TimedOut);
            }

            match self.transport.receive(remaining) {
                Ok(bytes) if bytes.is_empty() => return Ok(Wait::Empty),
                Ok(bytes) => {
                    debug!(bytes = bytes.len(), buffered = self.frames.len(), "received");
                    self.last_activity = Some(Instant::now());
                    self.frames.extend(&bytes);
                }
                Err(err) if err.is_timeout() => return Ok(Wait::TimedOut),
                Err(err) => return Err(self.connection_lost(err)),
            }
        }
    }

    fn is_reply_to(&self, frame: &Frame, request: &Request, tid: u16) -> bool {
        if self.config.framing.uses_transaction_id() && frame.transaction_id != Some(tid) {
            return false;
        }
        frame.unit_id == request.unit_id
    }

    fn finish(&self, request: &Request, frame: Frame) -> Result<Response> {
        let function = request.function_code();
        if frame.is_exception() {
            if exception_of(frame.function) != function {
                return Err(ModbusError::UnexpectedResponse(format!(
                    "exception for function {:#04x} in reply to {function:#04x}",
                    exception_of(frame.function)
                )));
            }
            let Some(code) = frame.exception_code() else {
                return Err(ModbusError::UnexpectedResponse(
                    "exception response without a code".to_string(),
                ));
            };
            let exception = ExceptionCode::from(code);
            debug!(function, %exception, "device exception");
            return Err(ModbusError::DeviceError {
                function,
                exception,
            });
        }
        Response::decode(request, &frame)
    }

    fn connection_lost(&mut self, err: TransportError) -> ModbusError {
        warn!(transport = self.transport.name(), error = %err, "connection lost");
        self.drop_connection();
        ModbusError::ConnectionLost(err)
    }

    fn drop_connection(&mut self) {
        self.transport.close();
        self.frames.clear();
        self.state = ConnectionState::Disconnected;
    }
}

impl<T: Transport> Drop for ModbusClient<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> fmt::Debug for ModbusClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModbusClient")
            .field("transport", &self.transport.name())
            .field("state", &self.state)
            .field("config", &self.config)
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}

fn wrong_kind(response: &Response) -> ModbusError {
    ModbusError::UnexpectedResponse(format!(
        "response for function {:#04x} does not match the request",
        response.function_code()
    ))
}
