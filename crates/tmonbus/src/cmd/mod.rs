use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use tmonbus_controller::Storage;
use tmonbus_frame::{POLL, REPLY};

use crate::exit::{controller_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod node;
pub mod poll;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulated sensor node over UDP.
    Node(NodeArgs),
    /// Poll nodes over UDP and print their readings.
    Poll(PollArgs),
    /// Print readings pushed by nodes.
    Listen(ListenArgs),
    /// Build a frame and print it as hex.
    Encode(EncodeArgs),
    /// Validate a hex frame and print its contents.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Node(args) => node::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Local UDP address. Default: 0.0.0.0:5555 when answering polls, an
    /// ephemeral port when pushing.
    #[arg(long, env = "TMONBUS_BIND")]
    pub bind: Option<String>,
    /// Node address (1-247).
    #[arg(long, short = 'a', env = "TMONBUS_ADDRESS")]
    pub address: Option<u8>,
    /// JSON node configuration; flags given on the command line win.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Answer POLLs for every address, replying as the polled node.
    #[arg(long)]
    pub promiscuous: bool,
    /// Chance (0.0-1.0) that a simulated channel reads invalid.
    #[arg(long, default_value = "0.1")]
    pub invalid_rate: f64,
    /// Seed for reproducible simulated readings.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Push readings to this UDP address instead of answering polls.
    #[arg(long, value_name = "ADDR")]
    pub push_to: Option<String>,
    /// Push period (e.g. 1s, 500ms); needs a push target.
    #[arg(long)]
    pub push_interval: Option<String>,
    /// Bound on each receive while serving (e.g. 200ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// UDP address of the bus (a node, or a gateway to the serial line).
    #[arg(long)]
    pub peer: String,
    /// Node addresses to poll (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub nodes: Vec<u8>,
    /// JSON poller configuration; flags given on the command line win.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Local UDP address.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: String,
    /// Wait for each REPLY (e.g. 200ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Polling cycles to run; 0 runs until interrupted.
    #[arg(long, default_value = "1")]
    pub count: u64,
    /// Pause between cycles (e.g. 5s).
    #[arg(long)]
    pub interval: Option<String>,
    /// Store every reading in this SQLite database.
    #[arg(long, value_name = "FILE", env = "TMONBUS_DB")]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local UDP address to receive pushes on.
    #[arg(long, default_value = "0.0.0.0:5555", env = "TMONBUS_BIND")]
    pub bind: String,
    /// Exit after receiving N readings.
    #[arg(long)]
    pub count: Option<usize>,
    /// Store every reading in this SQLite database.
    #[arg(long, value_name = "FILE", env = "TMONBUS_DB")]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Destination node address (1-247).
    #[arg(long, short = 'a')]
    pub address: u8,
    /// Command: poll, reply, or a byte value (2, 0x02).
    #[arg(long, short = 'c', default_value = "poll", value_parser = parse_command)]
    pub command: u8,
    /// Payload as hex.
    #[arg(long, conflicts_with = "temps")]
    pub payload: Option<String>,
    /// REPLY channel values in tenths of a degree (comma-separated, 4 values).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub temps: Option<Vec<i16>>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame as hex; spaces, colons and a 0x prefix are ignored.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Accepts `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Millisecond count for config structs that store durations as integers.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "hex input has an odd number of digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = String::from_utf8_lossy(pair);
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                return Err(CliError::usage(format!("invalid hex byte: {text:?}")));
            }
            u8::from_str_radix(&text, 16)
                .map_err(|_| CliError::usage(format!("invalid hex byte: {text:?}")))
        })
        .collect()
}

fn parse_command(input: &str) -> Result<u8, String> {
    let lower = input.trim().to_ascii_lowercase();
    match lower.as_str() {
        "poll" => return Ok(POLL),
        "reply" => return Ok(REPLY),
        _ => {}
    }
    let parsed = match lower.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => lower.parse::<u8>(),
    };
    parsed.map_err(|_| format!("expected poll, reply or a byte value, got {input:?}"))
}

/// Open the reading store named by `--db`, if any.
pub fn open_storage(db: Option<&Path>) -> CliResult<Option<Storage>> {
    db.map(|path| Storage::open(path).map_err(|err| controller_error("open store", err)))
        .transpose()
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
