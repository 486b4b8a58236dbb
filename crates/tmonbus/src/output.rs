use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tmonbus_controller::{fmt_temp, Reading};
use tmonbus_frame::{command_name, NUM_CHANNELS};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    address: u8,
    temps: &'a [Option<i16>; NUM_CHANNELS],
    display: Vec<String>,
    timestamp: String,
}

/// A decoded (or freshly encoded) frame, for display.
#[derive(Debug, Serialize)]
pub struct FrameSummary {
    pub address: u8,
    pub command: u8,
    pub command_name: &'static str,
    pub payload_len: usize,
    pub payload: String,
    pub frame: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<Reading>,
}

impl FrameSummary {
    pub fn new(address: u8, command: u8, payload: &[u8], frame: &[u8]) -> Self {
        Self {
            address,
            command,
            command_name: command_name(command),
            payload_len: payload.len(),
            payload: hex_string(payload),
            frame: hex_string(frame),
            reading: None,
        }
    }

    pub fn with_reading(mut self, reading: Option<Reading>) -> Self {
        self.reading = reading;
        self
    }
}

pub fn print_readings(readings: &[Reading], format: OutputFormat) {
    if readings.is_empty() {
        return;
    }
    println!("{}", render_readings(readings, format));
}

pub fn render_readings(readings: &[Reading], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let timestamp = now_unix_seconds();
            readings
                .iter()
                .map(|reading| {
                    let out = ReadingOutput {
                        address: reading.address,
                        temps: &reading.temps,
                        display: reading.temps.iter().map(|t| fmt_temp(*t)).collect(),
                        timestamp: timestamp.clone(),
                    };
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NODE", "CH0", "CH1", "CH2", "CH3"]);
            for reading in readings {
                let mut row = vec![reading.address.to_string()];
                row.extend(reading.temps.iter().map(|t| fmt_temp(*t)));
                table.add_row(row);
            }
            table.to_string()
        }
        OutputFormat::Pretty | OutputFormat::Raw => readings
            .iter()
            .map(Reading::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn print_frame(summary: &FrameSummary, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Raw => print_raw(raw),
        _ => println!("{}", render_frame(summary, format)),
    }
}

pub fn render_frame(summary: &FrameSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["address".to_string(), summary.address.to_string()])
                .add_row(vec![
                    "command".to_string(),
                    format!("0x{:02X} ({})", summary.command, summary.command_name),
                ])
                .add_row(vec!["payload".to_string(), summary.payload.clone()])
                .add_row(vec!["frame".to_string(), summary.frame.clone()]);
            if let Some(reading) = &summary.reading {
                for (i, temp) in reading.temps.iter().enumerate() {
                    table.add_row(vec![format!("ch{i}"), fmt_temp(*temp)]);
                }
            }
            table.to_string()
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let mut line = format!(
                "address={} command=0x{:02X} ({}) len={} frame={}",
                summary.address,
                summary.command,
                summary.command_name,
                summary.payload_len,
                summary.frame
            );
            if let Some(reading) = &summary.reading {
                let temps: Vec<String> = reading.temps.iter().map(|t| fmt_temp(*t)).collect();
                let _ = write!(line, " temps=[{}]", temps.join(", "));
            }
            line
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Uppercase hex without separators, e.g. `010301008050`.
pub fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
