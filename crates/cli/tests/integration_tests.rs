/// End-to-end tests for the CLI binary.
/// Commands are piped through stdin; stdout is checked line by line.
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Runs the CLI with `commands` on stdin and returns its stdout.
fn run_cli_command(sst_dir: &Path, memtable_kb: &str, command: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "cli", "--"])
        .env("MINILSM_SST_DIR", sst_dir.to_str().unwrap())
        .env("MINILSM_MEMTABLE_KB", memtable_kb)
        .env("MINILSM_BLOCK_SIZE", "128")
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("Failed to open stdin");
        stdin
            .write_all(command.as_bytes())
            .expect("Failed to write to stdin");
        stdin.write_all(b"EXIT\n").expect("Failed to write EXIT");
    }

    let output = child.wait_with_output().expect("Failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Replies only, with the prompt stripped.
fn replies(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(3)
        .map(|l| l.trim_start_matches("> ").to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[test]
fn test_basic_set_get() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(&dir.path().join("sst"), "64", "SET key1 value1\nGET key1\n");

    assert!(output.starts_with("minilsm started"));
    assert_eq!(replies(&output), vec!["OK", "value1", "bye"]);
}

#[test]
fn test_delete_and_missing() {
    let dir = tempdir().unwrap();
    let commands = "SET k v\nDEL k\nGET k\nGET never\n";
    let output = run_cli_command(&dir.path().join("sst"), "64", commands);

    assert_eq!(
        replies(&output),
        vec!["OK", "OK", "(deleted)", "(nil)", "bye"]
    );
}

#[test]
fn test_overwrite_across_freeze() {
    let dir = tempdir().unwrap();
    let commands = "SET k old\nFREEZE\nSET k new\nGET k\n";
    let output = run_cli_command(&dir.path().join("sst"), "64", commands);

    assert_eq!(
        replies(&output),
        vec!["OK", "OK (immutable=1)", "OK", "new", "bye"]
    );
}

#[test]
fn test_size_limit_freezes_automatically() {
    let dir = tempdir().unwrap();
    let mut commands = String::new();
    for i in 0..200 {
        commands.push_str(&format!("SET key{:04} {}\n", i, "v".repeat(20)));
    }
    commands.push_str("STATS\nGET key0000\nGET key0199\n");

    // 1 KiB limit, about 28 bytes per write.
    let output = run_cli_command(&dir.path().join("sst"), "1", &commands);
    let stats = output
        .lines()
        .find(|l| l.contains("LsmStorageState"))
        .expect("STATS line");

    assert!(!stats.contains("immutable_memtable_count: 0"), "{}", stats);
    assert!(output.contains(&"v".repeat(20)));
}

#[test]
fn test_dump_writes_sstable() {
    let dir = tempdir().unwrap();
    let sst_dir = dir.path().join("sst");

    let mut commands = String::new();
    for i in 0..50 {
        commands.push_str(&format!("SET key{:02} value{:02}\n", i, i));
    }
    commands.push_str("FREEZE\nDUMP\n");

    let output = run_cli_command(&sst_dir, "64", &commands);
    assert!(output.contains("00000.sst"), "{}", output);

    let files: Vec<_> = fs::read_dir(&sst_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["00000.sst".to_string()]);

    let table = sstable::SsTable::open(sst_dir.join("00000.sst")).unwrap();
    assert!(table.num_blocks() > 1);
    assert_eq!(table.first_key(), b"key00");
    assert_eq!(table.last_key(), b"key49");
}

#[test]
fn test_dump_without_frozen_memtable() {
    let dir = tempdir().unwrap();
    let sst_dir = dir.path().join("sst");
    let output = run_cli_command(&sst_dir, "64", "SET a 1\nDUMP\n");

    assert!(output.contains("ERR nothing to dump"));
    assert!(!sst_dir.exists());
}

#[test]
fn test_unknown_command_and_usage() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(&dir.path().join("sst"), "64", "HELLO\nSET\nGET\n");

    assert!(output.contains("unknown command: HELLO"));
    assert!(output.contains("ERR usage: SET key value"));
    assert!(output.contains("ERR usage: GET key"));
}
