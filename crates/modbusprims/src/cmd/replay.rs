use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use modbusprims_client::ModbusError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cmd::ReplayArgs;
use crate::exit::{modbus_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_replay, OutputFormat, ReplaySummary};

/// Coil probed once on unit 1 before the loop starts.
const PROBE_ADDRESS: u16 = 1;
const PROBE_UNIT: u8 = 1;
/// Coil written and read back each iteration.
const LOOP_ADDRESS: u16 = 0;

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    if args.max_unit == 0 {
        return Err(CliError::new(USAGE, "--max-unit must be at least 1"));
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut summary = ReplaySummary {
        destination: args.connection.display_target(),
        iterations: args.iterations,
        ..ReplaySummary::default()
    };

    let mut client = args.connection.client()?;
    client
        .session(|c| {
            let probe = c.read_coils(PROBE_ADDRESS, 1, PROBE_UNIT);
            record(&mut summary, "read-coils", PROBE_UNIT, probe.map(|_| ()));

            for iteration in 0..args.iterations {
                if !running.load(Ordering::SeqCst) {
                    summary.interrupted = true;
                    break;
                }
                if !c.is_connected() {
                    if let Err(err) = c.connect() {
                        record(&mut summary, "reconnect", 0, Err(err));
                        continue;
                    }
                }

                let unit = rng.gen_range(1..=args.max_unit);
                tracing::debug!(iteration, unit, "replay iteration");
                let write = c.write_coil(LOOP_ADDRESS, true, unit);
                record(&mut summary, "write-coil", unit, write);
                let read = c.read_coils(LOOP_ADDRESS, 1, unit);
                if let Ok(values) = &read {
                    tracing::info!(unit, ?values, "coil state");
                }
                record(&mut summary, "read-coils", unit, read.map(|_| ()));
                summary.completed += 1;
            }
            Ok(())
        })
        .map_err(|err| modbus_error("replay failed", err))?;

    print_replay(&summary, format);
    Ok(SUCCESS)
}

/// Count one request outcome. Failures are logged and the loop carries on.
fn record(summary: &mut ReplaySummary, op: &str, unit: u8, result: Result<(), ModbusError>) {
    summary.requests += 1;
    let Err(err) = result else {
        return;
    };

    summary.failures += 1;
    match err {
        ModbusError::DeviceError { .. } => summary.device_exceptions += 1,
        ModbusError::Timeout { .. } | ModbusError::EmptyResponse => summary.timeouts += 1,
        _ => {}
    }
    tracing::warn!(op, unit, error = %err, "request failed");
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use modbusprims_client::ExceptionCode;

    use super::*;

    #[test]
    fn record_counts_outcomes_by_kind() {
        let mut summary = ReplaySummary::default();
        record(&mut summary, "read-coils", 1, Ok(()));
        record(
            &mut summary,
            "read-coils",
            2,
            Err(ModbusError::DeviceError {
                function: 0x01,
                exception: ExceptionCode::GatewayTargetFailedToRespond,
            }),
        );
        record(
            &mut summary,
            "write-coil",
            3,
            Err(ModbusError::Timeout { attempts: 4 }),
        );
        record(&mut summary, "write-coil", 3, Err(ModbusError::EmptyResponse));
        record(
            &mut summary,
            "write-coil",
            3,
            Err(ModbusError::UnexpectedResponse("echo".into())),
        );

        assert_eq!(summary.requests, 5);
        assert_eq!(summary.failures, 4);
        assert_eq!(summary.device_exceptions, 1);
        assert_eq!(summary.timeouts, 2);
    }
}
