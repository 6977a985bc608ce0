use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use modbusprims_client::{ClientConfig, DynClient, ModbusClient, DEFAULT_UNIT_ID};
use modbusprims_frame::FramingMode;
use modbusprims_transport::{ConnectionParams, TransportKind, DEFAULT_BAUD_RATE};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod read_coils;
pub mod replay;
pub mod version;
pub mod write_coil;

/// Port used by the bundled device simulators and the original coil loop.
pub const DEFAULT_CLI_PORT: u16 = 5020;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a run of coils from one unit.
    ReadCoils(ReadCoilsArgs),
    /// Write a single coil on one unit.
    WriteCoil(WriteCoilArgs),
    /// Replay the coil write/read loop against random units.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::ReadCoils(args) => read_coils::run(args, format),
        Command::WriteCoil(args) => write_coil::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Tcp,
    Udp,
    Serial,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => TransportKind::Tcp,
            TransportArg::Udp => TransportKind::Udp,
            TransportArg::Serial => TransportKind::Serial,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FramingArg {
    Socket,
    Rtu,
    Ascii,
    Binary,
}

impl From<FramingArg> for FramingMode {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Socket => FramingMode::Socket,
            FramingArg::Rtu => FramingMode::Rtu,
            FramingArg::Ascii => FramingMode::Ascii,
            FramingArg::Binary => FramingMode::Binary,
        }
    }
}

/// Where the device is and how transactions with it behave.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Host, IP address, or serial device path.
    pub destination: String,
    /// Remote port (TCP/UDP).
    #[arg(long, default_value_t = DEFAULT_CLI_PORT)]
    pub port: u16,
    /// Transport kind.
    #[arg(long, value_enum, default_value = "tcp")]
    pub transport: TransportArg,
    /// Framing on the wire. Default: socket for tcp/udp, rtu for serial.
    #[arg(long, value_enum)]
    pub framing: Option<FramingArg>,
    /// Per-attempt response timeout (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub timeout: String,
    /// Extra attempts after the first one.
    #[arg(long, default_value_t = modbusprims_client::DEFAULT_RETRIES)]
    pub retries: u32,
    /// Retry when the device answers with zero bytes.
    #[arg(long)]
    pub retry_on_empty: bool,
    /// Local address to bind before connecting (ip:port).
    #[arg(long, value_name = "ADDR")]
    pub source_address: Option<SocketAddr>,
    /// Serial line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,
    /// Disable RTU inter-frame timing.
    #[arg(long)]
    pub no_strict: bool,
}

impl ConnectionArgs {
    pub fn params(&self) -> CliResult<ConnectionParams> {
        let timeout = parse_duration(&self.timeout)?;
        let mut params = ConnectionParams::new(&self.destination, self.port, self.transport.into())
            .with_connect_timeout(timeout)
            .with_baud_rate(self.baud_rate);
        if let Some(addr) = self.source_address {
            params = params.with_source_address(addr);
        }
        Ok(params)
    }

    pub fn client_config(&self, params: &ConnectionParams) -> CliResult<ClientConfig> {
        let mut config = ClientConfig::for_connection(params)
            .with_timeout(parse_duration(&self.timeout)?)
            .with_retries(self.retries)
            .with_retry_on_empty(self.retry_on_empty)
            .with_strict(!self.no_strict);
        if let Some(framing) = self.framing {
            config = config.with_framing(framing.into());
        }
        Ok(config)
    }

    /// Build a client whose transport is opened but not yet connected.
    pub fn client(&self) -> CliResult<DynClient> {
        let params = self.params()?;
        let config = self.client_config(&params)?;
        let transport = modbusprims_transport::open(params)
            .map_err(|err| transport_error("open transport failed", err))?;
        Ok(ModbusClient::new(transport, config))
    }

    /// Build and connect a client.
    pub fn display_target(&self) -> String {
        match self.transport {
            TransportArg::Serial => self.destination.clone(),
            TransportArg::Tcp | TransportArg::Udp => format!("{}:{}", self.destination, self.port),
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadCoilsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// First coil address.
    #[arg(long, default_value_t = 0)]
    pub address: u16,
    /// Number of coils to read (1-2000).
    #[arg(long, default_value_t = 1)]
    pub count: u16,
    /// Unit identifier of the addressed device.
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    pub unit: u8,
}

#[derive(Args, Debug)]
pub struct WriteCoilArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Coil address.
    #[arg(long, default_value_t = 0)]
    pub address: u16,
    /// Value to write (true/false).
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pub value: bool,
    /// Unit identifier of the addressed device.
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    pub unit: u8,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Number of write/read iterations after the initial read.
    #[arg(long, default_value_t = 500)]
    pub iterations: u64,
    /// Highest unit id picked at random (inclusive, from 1).
    #[arg(long, default_value_t = 101)]
    pub max_unit: u8,
    /// Seed for unit selection, for repeatable runs.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
