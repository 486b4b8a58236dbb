use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tmonbus_controller::{Poller, PollerConfig, ReadingSink};
use tmonbus_transport::UdpLink;

use crate::cmd::{
    duration_millis, install_ctrlc_handler, open_storage, parse_duration, PollArgs,
};
use crate::exit::{controller_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_readings, OutputFormat};

const SLEEP_TICK: Duration = Duration::from_millis(50);

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;
    let interval = config.interval();

    let link = UdpLink::connect(args.bind.as_str(), args.peer.as_str())
        .map_err(|err| transport_error("link setup failed", err))?;
    let mut poller =
        Poller::new(link, config).map_err(|err| controller_error("invalid poller", err))?;
    let mut storage = open_storage(args.db.as_deref())?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut cycles = 0u64;
    let mut collected = 0usize;
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let readings = poller.poll_all();
        collected = collected.saturating_add(readings.len());
        print_readings(&readings, format);
        if let Some(storage) = storage.as_mut() {
            storage
                .store(&readings)
                .map_err(|err| controller_error("store failed", err))?;
        }

        cycles += 1;
        if args.count != 0 && cycles >= args.count {
            break;
        }
        sleep_until(&running, started + interval);
    }

    if collected == 0 {
        return Err(CliError::new(TIMEOUT, "no node answered"));
    }
    Ok(SUCCESS)
}

fn resolve_config(args: &PollArgs) -> CliResult<PollerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            PollerConfig::load(path).map_err(|err| controller_error("config", err))?
        }
        None => {
            if args.nodes.is_empty() {
                return Err(CliError::usage("--nodes is required without --config"));
            }
            PollerConfig::new(args.nodes.clone())
        }
    };

    if !args.nodes.is_empty() {
        config.nodes = args.nodes.clone();
    }
    if let Some(timeout) = &args.timeout {
        config.reply_timeout_ms = duration_millis(parse_duration(timeout)?);
    }
    if let Some(interval) = &args.interval {
        config.interval_ms = duration_millis(parse_duration(interval)?);
    }

    config
        .validate()
        .map_err(|err| controller_error("invalid poller configuration", err))?;
    Ok(config)
}

/// Sleep in short ticks so Ctrl-C between cycles takes effect promptly.
fn sleep_until(running: &AtomicBool, deadline: Instant) {
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(SLEEP_TICK));
    }
}
