use tmonbus_frame::{encode_frame, encode_reply, MAX_FRAME_SIZE, NUM_CHANNELS};

use crate::cmd::{parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, FrameSummary, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let mut buf = [0u8; MAX_FRAME_SIZE];
    let len = encode_frame(args.address, args.command, &payload, &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;
    let frame = &buf[..len];

    let summary = FrameSummary::new(args.address, args.command, &payload, frame);
    print_frame(&summary, frame, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.payload {
        return parse_hex(hex);
    }
    if let Some(temps) = &args.temps {
        let temps: [i16; NUM_CHANNELS] = temps.as_slice().try_into().map_err(|_| {
            CliError::usage(format!(
                "--temps needs exactly {NUM_CHANNELS} values, got {}",
                temps.len()
            ))
        })?;
        return Ok(encode_reply(&temps).to_vec());
    }
    Ok(Vec::new())
}
