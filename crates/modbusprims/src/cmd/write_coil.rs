use modbusprims_client::Request;

use crate::cmd::WriteCoilArgs;
use crate::exit::{modbus_error, CliResult, SUCCESS};
use crate::output::{print_write, OutputFormat, WriteOutput};

pub fn run(args: WriteCoilArgs, format: OutputFormat) -> CliResult<i32> {
    let request = Request::write_coil(args.address, args.value).with_unit(args.unit);
    let mut client = args.connection.client()?;
    client
        .session(|c| c.execute(&request))
        .map_err(|err| modbus_error("write-coil failed", err))?;

    print_write(
        &WriteOutput {
            destination: args.connection.display_target(),
            unit: args.unit,
            address: args.address,
            value: args.value,
        },
        format,
    );
    Ok(SUCCESS)
}
