use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::tempdir;

fn run_typesig(data_dir: &Path, args: &[&str], input: Option<&str>) -> Output {
    let bin = env!("CARGO_BIN_EXE_typesig");

    let mut child = Command::new(bin)
        .args(args)
        .env("TYPESIG_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn process");

    {
        let mut stdin = child.stdin.take().expect("Failed to open stdin");
        if let Some(content) = input {
            stdin
                .write_all(content.as_bytes())
                .expect("Failed to write to stdin");
        }
    }

    child.wait_with_output().expect("failed to wait on child")
}

fn run_ok(data_dir: &Path, args: &[&str], input: Option<&str>) -> String {
    let output = run_typesig(data_dir, args, input);
    if !output.status.success() {
        panic!(
            "Command failed: typesig {}\nSTDOUT: {}\nSTDERR: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_cli_full_workflow() {
    let dir = tempdir().unwrap();

    // 1. Enroll
    println!("Testing enroll...");
    let stdout = run_ok(
        dir.path(),
        &["enroll", "alice", "-n", "3"],
        Some("hello there\nhello there\nhello there\n"),
    );
    assert!(stdout.contains("SAMPLE COLLECTION"));
    assert!(stdout.contains("Recorded 3 sample(s) for alice."));
    assert!(dir.path().join("biometric_data_user_alice.json").exists());
    assert!(dir.path().join("typesig.json").exists());

    // 2. Enrolling again is refused
    let output = run_typesig(dir.path(), &["enroll", "alice", "-n", "1"], Some("x\n"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already enrolled"));

    // 3. Extend continues the numbering
    println!("Testing extend...");
    let stdout = run_ok(
        dir.path(),
        &["extend", "alice", "-n", "2"],
        Some("hello there\nhello there\n"),
    );
    assert!(stdout.contains("phrases #4-#5"));

    // 4. Profile
    println!("Testing profile...");
    let stdout = run_ok(dir.path(), &["profile", "alice"], None);
    assert!(stdout.contains("TYPING PROFILE"));
    assert!(stdout.contains("Samples:        5"));

    let stdout = run_ok(dir.path(), &["profile", "alice", "--json"], None);
    let profile: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(profile["sample_count"], 5);

    // 5. Identify completes with a verdict either way
    println!("Testing identify...");
    let stdout = run_ok(dir.path(), &["identify", "alice"], Some("hello there\n"));
    assert!(stdout.contains("SIGNIFICANCE TESTS"));
    assert!(stdout.contains("ACCEPTED") || stdout.contains("REJECTED"));

    // 6. Users
    let stdout = run_ok(dir.path(), &["users"], None);
    assert!(stdout.contains("alice"));
    assert!(stdout.contains("5 sample(s)"));
}

#[test]
fn test_identify_unknown_user() {
    let dir = tempdir().unwrap();

    let stdout = run_ok(dir.path(), &["identify", "nobody"], None);
    assert!(stdout.contains("NO_HISTORY"));
    assert!(stdout.contains("typesig enroll nobody"));

    let stdout = run_ok(dir.path(), &["identify", "nobody", "--json"], None);
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["NoHistory"]["user_id"], "nobody");
}

#[test]
fn test_enroll_empty_phrase_fails_without_writing() {
    let dir = tempdir().unwrap();

    let output = run_typesig(dir.path(), &["enroll", "bob", "-n", "2"], Some("hi\n\n"));
    assert!(!output.status.success());
    assert!(!dir.path().join("biometric_data_user_bob.json").exists());
}

#[test]
fn test_invalid_user_id_is_rejected() {
    let dir = tempdir().unwrap();

    let output = run_typesig(dir.path(), &["enroll", "../escape", "-n", "1"], Some("hi\n"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid"));

    let stdout = run_ok(dir.path(), &["users"], None);
    assert!(stdout.contains("No users enrolled."));
}

#[test]
fn test_config_and_custom_iterations() {
    let dir = tempdir().unwrap();

    let stdout = run_ok(dir.path(), &["config"], None);
    let config: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(config["training_iterations"], 5);

    let mut edited = config.clone();
    edited["training_iterations"] = serde_json::json!(2);
    fs::write(
        dir.path().join("typesig.json"),
        serde_json::to_string_pretty(&edited).unwrap(),
    )
    .unwrap();

    let stdout = run_ok(dir.path(), &["enroll", "carol"], Some("abc\nabc\n"));
    assert!(stdout.contains("Recorded 2 sample(s) for carol."));
}

#[test]
fn test_menu_enroll_then_exit() {
    let dir = tempdir().unwrap();

    // user id, Enroll, confirm, five phrases, then exit from the known-user menu
    let script = "dana\n1\ny\nabc\nabc\nabc\nabc\nabc\ndana\n4\n";
    let stdout = run_ok(dir.path(), &["menu"], Some(script));
    assert!(stdout.contains("No enrollment data for dana."));
    assert!(stdout.contains("Recorded 5 sample(s) for dana."));
    assert!(stdout.contains("User dana is enrolled."));
    assert!(stdout.contains("Goodbye."));
}
