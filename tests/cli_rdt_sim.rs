use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "rdt-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rdt_sim"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("run rdt_sim")
}

fn summary_line(stdout: &str) -> String {
    stdout
        .lines()
        .find(|line| line.starts_with("rdt_summary "))
        .expect("summary line missing")
        .to_string()
}

#[test]
fn perfect_channel_transfer_succeeds_without_timeouts() {
    let output = run(&["--data", "HelloWorld", "--data-length", "4", "--window", "8"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "rdt_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary = summary_line(&stdout);
    assert!(summary.contains("completed=true"), "{summary}");
    assert!(summary.contains("client_timeouts=0"), "{summary}");
    assert!(stdout.lines().any(|l| l == "received: HelloWorld"), "{stdout}");
}

#[test]
fn lossy_transfer_writes_trace_json_with_retransmissions() {
    let dir = unique_temp_dir("trace");
    let out_json = dir.join("trace.json");

    let output = run(&[
        "--loss",
        "0.3",
        "--seed",
        "3",
        "--trace-json",
        out_json.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "rdt_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let raw = fs::read_to_string(&out_json).expect("read trace.json");
    let v: Value = serde_json::from_str(&raw).expect("parse trace.json");
    let arr = v.as_array().expect("trace.json must be a JSON array");
    assert!(!arr.is_empty());

    let kind_count = |kind: &str| {
        arr.iter()
            .filter(|e| e.get("kind").and_then(|k| k.as_str()) == Some(kind))
            .count()
    };
    assert!(kind_count("send_data") > 0);
    assert!(kind_count("timeout") > 0, "expected at least one timeout");
    assert!(
        arr.iter().any(|e| e.get("retrans").and_then(|r| r.as_bool()) == Some(true)),
        "expected a retransmitted data segment"
    );

    let ticks: Vec<u64> = arr
        .iter()
        .map(|e| e.get("tick").and_then(|t| t.as_u64()).expect("tick field"))
        .collect();
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]), "events must be sorted by tick");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn config_file_is_loaded_and_flags_override_it() {
    let dir = unique_temp_dir("config");
    let cfg = dir.join("config.json");
    fs::write(
        &cfg,
        r#"{ "rdt": { "data_length": 0 }, "channel": { "duplicate_rate": 0.5, "seed": 9 } }"#,
    )
    .expect("write config");

    // data_length 0 from the file alone is rejected...
    let output = run(&["--config", cfg.to_str().unwrap(), "--data", "abc"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid configuration"));

    // ...but a flag overrides it.
    let output = run(&[
        "--config",
        cfg.to_str().unwrap(),
        "--data",
        "abcdefghij",
        "--data-length",
        "3",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "received: abcdefghij"), "{stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn total_loss_exits_nonzero_when_incomplete() {
    let output = run(&["--data", "HelloWorld", "--loss", "1.0", "--max-ticks", "20"]);
    assert_eq!(output.status.code(), Some(1));
    let summary = summary_line(&String::from_utf8_lossy(&output.stdout));
    assert!(summary.contains("ticks=20"), "{summary}");
    assert!(summary.contains("completed=false"), "{summary}");
}

#[test]
fn bidirectional_flag_sends_reply() {
    let output = run(&["--data", "ping", "--reverse-data", "pong", "--seed", "4"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(summary_line(&stdout).contains("completed=true"));
    assert!(stdout.lines().any(|l| l == "received: ping"), "{stdout}");
    assert!(stdout.lines().any(|l| l == "reverse received: pong"), "{stdout}");
}

#[test]
fn malformed_config_file_exits_with_json_error() {
    let dir = unique_temp_dir("bad-config");
    let cfg = dir.join("config.json");
    fs::write(&cfg, r#"{ "rdt": { "data_length": "four" "#).expect("write config");

    let output = run(&["--config", cfg.to_str().unwrap(), "--data", "abc"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("JSON error"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_data_file_exits_with_io_error() {
    let dir = unique_temp_dir("missing-data");
    let missing = dir.join("nope.txt");

    let output = run(&["--data-file", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("I/O error"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}
