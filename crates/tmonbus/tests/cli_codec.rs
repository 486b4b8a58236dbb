#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn tmonbus(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tmonbus"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("tmonbus should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn encode_poll_prints_wire_bytes() {
    let output = tmonbus(&["--format", "json", "encode", "--address", "3"]);
    assert!(output.status.success());

    let payload: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("encode should emit json");
    assert_eq!(payload["frame"], "010301008050");
    assert_eq!(payload["command_name"], "POLL");
    assert_eq!(payload["payload_len"], 0);
}

#[test]
fn encode_raw_writes_binary_frame() {
    let output = tmonbus(&["--format", "raw", "encode", "-a", "3", "-c", "poll"]);
    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0x01, 0x03, 0x01, 0x00, 0x80, 0x50]);
}

#[test]
fn encode_reply_from_temps() {
    let output = tmonbus(&[
        "--format",
        "pretty",
        "encode",
        "--address",
        "3",
        "--command",
        "reply",
        "--temps",
        "235,198,32767,32767",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).ends_with("frame=01030208EB00C600FF7FFF7F90EB"));
}

#[test]
fn encode_reserved_address_is_usage_error() {
    let output = tmonbus(&["encode", "--address", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_reply_prints_readings() {
    let output = tmonbus(&[
        "--format",
        "json",
        "decode",
        "01 03 02 08 EB 00 C6 00 FF 7F FF 7F 90 EB",
    ]);
    assert!(output.status.success());

    let payload: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("decode should emit json");
    assert_eq!(payload["address"], 3);
    assert_eq!(payload["command_name"], "REPLY");
    assert_eq!(
        payload["reading"]["temps"],
        serde_json::json!([235, 198, null, null])
    );
}

#[test]
fn decode_bad_checksum_returns_60() {
    let output = tmonbus(&["decode", "010301008051"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("checksum mismatch"));
}

#[test]
fn decode_rejects_non_hex_input() {
    let output = tmonbus(&["decode", "not-hex"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_reports_package_version() {
    let output = tmonbus(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("tmonbus {}", env!("CARGO_PKG_VERSION"))
    );
}
