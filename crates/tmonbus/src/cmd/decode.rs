use tmonbus_controller::Reading;
use tmonbus_frame::{decode_frame, REPLY};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{controller_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, FrameSummary, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let summary = summarize(&bytes)?;
    print_frame(&summary, &bytes, format);
    Ok(SUCCESS)
}

/// Decode `bytes` and, for a REPLY, its channel readings.
///
/// A REPLY whose payload is not a valid reply payload is an error even
/// though the frame itself is well formed.
fn summarize(bytes: &[u8]) -> CliResult<FrameSummary> {
    let frame = decode_frame(bytes).map_err(|err| frame_error("decode failed", err))?;

    let reading = if frame.command == REPLY {
        Some(Reading::from_frame(&frame).map_err(|err| controller_error("decode failed", err))?)
    } else {
        None
    };

    let summary = FrameSummary::new(frame.address, frame.command, frame.payload, bytes);
    Ok(summary.with_reading(reading))
}
