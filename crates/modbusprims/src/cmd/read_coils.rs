use crate::cmd::ReadCoilsArgs;
use crate::exit::{modbus_error, CliResult, SUCCESS};
use crate::output::{print_coils, CoilsOutput, OutputFormat};

pub fn run(args: ReadCoilsArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = args.connection.client()?;
    let values = client
        .session(|c| c.read_coils(args.address, args.count, args.unit))
        .map_err(|err| modbus_error("read-coils failed", err))?;

    print_coils(
        &CoilsOutput {
            destination: args.connection.display_target(),
            unit: args.unit,
            address: args.address,
            values,
        },
        format,
    );
    Ok(SUCCESS)
}
