use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

fn recordings_dir(home: &Path) -> PathBuf {
    let dir = home.join("Documents").join("ai&i-recordings");
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn analyze_segment(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_analyze_segment"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

// Mono 16 bit PCM with the given samples
fn pcm16(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_size = (samples.len() * 2) as u32;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVEfmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    buf
}

#[test]
fn missing_file_exits_with_message() {
    let home = tempdir().unwrap();
    let dir = recordings_dir(home.path());
    let output = analyze_segment(home.path(), &["nope.wav"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.trim_end(), format!("file not found: {}", dir.join("nope.wav").display()));
}

#[test]
fn empty_directory_exits_with_message() {
    let home = tempdir().unwrap();
    recordings_dir(home.path());
    let output = analyze_segment(home.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("no recordings matching mic_*.wav in "));
}

#[test]
fn corrupt_file_fails_without_report() {
    let home = tempdir().unwrap();
    let dir = recordings_dir(home.path());
    fs::write(dir.join("mic_bad.wav"), b"RIFF\x04\x00\x00\x00JUNK").unwrap();
    let output = analyze_segment(home.path(), &[]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid wave file"));
}

#[test]
fn latest_recording_is_reported_on_stdout() {
    let home = tempdir().unwrap();
    let dir = recordings_dir(home.path());
    fs::write(dir.join("mic_20240101-090000.wav"), pcm16(&[100; 4], 8000)).unwrap();
    fs::write(dir.join("mic_20240102-090000.wav"), pcm16(&[0; 8000], 8000)).unwrap();
    let output = analyze_segment(home.path(), &[]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(),
        "file: mic_20240102-090000.wav\n\
         \x20 duration: 1.00s  sample_rate: 8000hz  channels: 1\n\
         \x20 avg rms over 5s windows (first 10): [0]\n\
         \x20 global max amplitude: 0\n");
}
