#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "codecstream-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn codecstream(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codecstream"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("codecstream should run")
}

fn codecstream_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_codecstream"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("codecstream should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input)
        .expect("stdin should accept input");
    child.wait_with_output().expect("codecstream should finish")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn encode_then_decode_file() {
    let dir = unique_temp_dir("roundtrip");
    let path = dir.join("values.bin");
    let path_arg = path.to_str().expect("temp path should be UTF-8");

    let encoded = codecstream(&[
        "encode", "--codec", "int32", "--values", "7,-8,9", "--output", path_arg,
    ]);
    assert!(encoded.status.success());
    assert_eq!(json(&encoded)["bits"], 96);
    assert_eq!(std::fs::read(&path).expect("output file").len(), 12);

    let decoded = codecstream(&["decode", path_arg, "--codec", "int32", "--chunk-size", "1"]);
    assert!(decoded.status.success());
    let report = json(&decoded);
    assert_eq!(report["count"], 3);
    assert_eq!(report["values"], serde_json::json!([7, -8, 9]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_prints_hex_without_output_file() {
    let output = codecstream(&["encode", "--codec", "uint16-le", "--values", "1,258"]);
    assert!(output.status.success());
    assert_eq!(json(&output)["hex"], "01000201");
}

#[test]
fn invalid_value_is_usage_error() {
    let output = codecstream(&["encode", "--codec", "uint8", "--values", "256"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn malformed_input_exits_data_invalid() {
    let output = codecstream_stdin(&["decode", "-", "--codec", "utf8"], &[0, 0, 0, 1, 0xFF]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn try_flag_stops_at_bad_value() {
    let output = codecstream_stdin(
        &["decode", "-", "--codec", "utf8", "--try"],
        &[0, 0, 0, 1, b'a', 0, 0, 0, 1, 0xFF],
    );
    assert!(output.status.success());
    assert_eq!(json(&output)["values"], serde_json::json!(["a"]));
}

#[test]
fn strict_isolate_with_leftover_exits_data_invalid() {
    let output = codecstream_stdin(
        &["decode", "-", "--codec", "uint16", "--isolate", "24", "--strict"],
        &[0, 1, 2],
    );
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn records_reports_ids_and_sizes() {
    let mut input = 2u32.to_be_bytes().to_vec();
    for (id, payload) in [(5u32, &b"hello"[..]), (6, &b""[..])] {
        input.extend_from_slice(&id.to_be_bytes());
        input.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        input.extend_from_slice(payload);
    }
    let output = codecstream_stdin(&["records", "-", "--chunk-size", "3"], &input);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["count"], 2);
    assert_eq!(report["records"][0]["id"], 5);
    assert_eq!(report["records"][0]["size"], 5);
    assert_eq!(report["records"][0]["payload"], "hello");
    assert_eq!(report["records"][1]["size"], 0);
}

#[test]
fn missing_input_file_fails() {
    let output = codecstream(&["decode", "/nonexistent/codecstream.bin", "--codec", "uint8"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_prints_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_codecstream"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("codecstream "));
}
