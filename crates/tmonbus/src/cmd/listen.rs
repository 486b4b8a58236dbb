use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tmonbus_controller::{PushReceiver, ReadingSink};
use tmonbus_transport::UdpLink;

use crate::cmd::{install_ctrlc_handler, open_storage, ListenArgs};
use crate::exit::{controller_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_readings, OutputFormat};

/// How long each wait lasts before the run flag is checked again.
const RECV_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let link = UdpLink::bind(args.bind.as_str())
        .map_err(|err| transport_error("bind failed", err))?;
    let mut receiver = PushReceiver::new(link);
    let mut storage = open_storage(args.db.as_deref())?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let reading = receiver
            .recv(RECV_SLICE)
            .map_err(|err| controller_error("receive failed", err))?;
        let Some(reading) = reading else {
            continue;
        };

        print_readings(&[reading], format);
        if let Some(storage) = storage.as_mut() {
            storage
                .store(&[reading])
                .map_err(|err| controller_error("store failed", err))?;
        }
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    tracing::debug!(printed, skipped = receiver.skipped(), "listener finished");
    Ok(SUCCESS)
}
