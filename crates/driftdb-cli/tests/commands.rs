//! Local commands against a temporary data directory

use clap::Parser;
use driftdb_cli::{Cli, commands};
use tempfile::TempDir;

async fn run(dir: &TempDir, args: &[&str]) -> String {
    let mut argv = vec!["driftdb", "--data-dir", dir.path().to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();

    let mut out = Vec::new();
    commands::run(cli, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn set_get_delete_round_trip() {
    let dir = TempDir::new().unwrap();

    run(&dir, &["set", "welcome", "hello"]).await;
    assert_eq!(run(&dir, &["get", "welcome"]).await, "hello\n");
    assert_eq!(run(&dir, &["get", "welcome", "--hex"]).await, "68656c6c6f\n");

    run(&dir, &["set", "other", "x"]).await;
    run(&dir, &["delete", "welcome"]).await;

    assert_eq!(run(&dir, &["get", "welcome"]).await, "(not found)\n");
    assert_eq!(run(&dir, &["state"]).await, "other=x\n");

    // Three ops, one JSON line each, tombstone included
    let ops = run(&dir, &["ops"]).await;
    let lines: Vec<&str> = ops.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[2].contains("\"type\":\"delete\""));
}

#[tokio::test]
async fn identity_is_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    let first = run(&dir, &["identity"]).await;
    let second = run(&dir, &["identity"]).await;
    assert_eq!(first, second);
    assert!(!first.trim().is_empty());

    run(&dir, &["set", "k", "v"]).await;
    let ops = run(&dir, &["ops"]).await;
    assert!(ops.contains(&format!("\"actor\":\"{}\"", first.trim())));
}

#[tokio::test]
async fn snapshot_reports_live_keys() {
    let dir = TempDir::new().unwrap();
    run(&dir, &["set", "a", "1"]).await;
    run(&dir, &["set", "b", "2"]).await;

    let output = run(&dir, &["snapshot"]).await;
    assert!(output.starts_with("snapshot at "));
    assert!(output.ends_with(": 2 keys\na=1\nb=2\n"));

    // Both writes happened long after ts 42
    let output = run(&dir, &["snapshot", "--cutoff", "42"]).await;
    assert_eq!(output, "snapshot at 42: 0 keys\n");
}
