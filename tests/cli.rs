//! Integration tests for the vocalswap binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_vocalswap"));
    command
        .current_dir(dir.path())
        .arg("--workers")
        .arg("1")
        .arg("--processing-root")
        .arg(dir.path().join("processing"))
        .arg("--output-root")
        .arg(dir.path().join("outputs"))
        .arg("--model")
        .arg(dir.path().join("rvc_model.pth"));
    command
}

fn inputs(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let song = dir.path().join("song.wav");
    let voice = dir.path().join("voice.wav");
    fs::write(&song, b"song").unwrap();
    fs::write(&voice, b"voice").unwrap();
    (song, voice)
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--accept-consent"));
}

#[test]
fn test_test_only_prints_capabilities() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--test-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"))
        .stdout(predicate::str::contains("Separation:  unavailable (no separation program configured)"))
        .stdout(predicate::str::contains("Voice model: not loaded"));
}

#[test]
fn test_write_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vocalswap.toml");

    cli(&dir)
        .arg("--write-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Default config written"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[storage]"));
    assert!(content.contains("codec = \"mp3\""));
}

#[test]
fn test_missing_consent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (song, voice) = inputs(&dir);

    cli(&dir)
        .arg("--song")
        .arg(&song)
        .arg("--voice")
        .arg(&voice)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Consent must be accepted"));
}

#[test]
fn test_missing_inputs() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--accept-consent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--song and --voice are required"));
}

#[test]
fn test_invalid_gain_is_rejected() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--test-only")
        .arg("--vocal-gain")
        .arg("-1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vocal gain"));
}

#[test]
fn test_failed_job_reports_status_and_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let (song, voice) = inputs(&dir);

    cli(&dir)
        .arg("--song")
        .arg(&song)
        .arg("--voice")
        .arg(&voice)
        .arg("--accept-consent")
        .assert()
        .failure()
        .stdout(predicate::str::contains("status = \"failed\""))
        .stdout(predicate::str::contains("Separation failed: service unavailable"));

    let processing = dir.path().join("processing");
    let leftovers = fs::read_dir(&processing).map(|entries| entries.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}
