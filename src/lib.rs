//! Loudness diagnostics for recorded microphone segments.
//!
//! Resolves a recording, decodes it and prints duration, format and windowed
//! amplitude statistics.

mod analyzer;
mod error;
mod resolver;
mod wav_data;
mod wav_handler;
pub mod window;

pub use analyzer::{AnalyzerConfig, DiagnosticReport, SegmentAnalyzer};
pub use error::DiagError;
pub use resolver::RecordingLocator;
pub use wav_data::{FmtChunk, WavData};
pub use wav_handler::WavHandler;

use std::io::Write;

/// Resolve the recording, analyze it and write the report to `out`.
///
/// Nothing is written if resolving or decoding fails.
pub fn run<W: Write>(locator: &RecordingLocator,
                     filename: Option<&str>,
                     config: AnalyzerConfig,
                     out: &mut W) -> Result<DiagnosticReport, DiagError> {
    let analyzer = SegmentAnalyzer::new(config)?;
    let path = locator.resolve(filename)?;
    let report = analyzer.analyze(&path)?;
    write!(out, "{}", report)?;
    Ok(report)
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use std::fs;
#[cfg(test)]
use tempfile::tempdir;

#[test]
fn latest_recording_is_reported() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("mic_20240101-090000.wav"), wav_handler::encode_pcm16(&[9000; 10], 8000, 1)).unwrap();
    fs::write(dir.join("mic_20240101-100000.wav"), wav_handler::encode_pcm16(&[0; 8000], 8000, 1)).unwrap();

    let mut out = Vec::new();
    let locator = RecordingLocator::new(dir);
    run(&locator, None, AnalyzerConfig::default(), &mut out).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(),
        "file: mic_20240101-100000.wav\n\
         \x20 duration: 1.00s  sample_rate: 8000hz  channels: 1\n\
         \x20 avg rms over 5s windows (first 10): [0]\n\
         \x20 global max amplitude: 0\n");
}

#[test]
fn empty_recording_prints_header_and_fallback() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("mic_empty.wav"), wav_handler::encode_pcm16(&[], 22050, 2)).unwrap();

    let mut out = Vec::new();
    let locator = RecordingLocator::new(dir);
    run(&locator, Some("mic_empty.wav"), AnalyzerConfig::default(), &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec![
        "file: mic_empty.wav",
        "  duration: 0.00s  sample_rate: 22050hz  channels: 2",
        "  no samples found",
    ]);
}

#[test]
fn missing_file_writes_nothing() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mut out = Vec::new();
    let locator = RecordingLocator::new(dir);
    let err = run(&locator, Some("mic_gone.wav"), AnalyzerConfig::default(), &mut out).unwrap_err();

    assert!(err.is_user_facing());
    assert_eq!(err.to_string(), format!("file not found: {}", dir.join("mic_gone.wav").display()));
    assert!(out.is_empty());
}

#[test]
fn corrupt_file_is_not_user_facing() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("mic_bad.wav"), b"RIFF\x04\x00\x00\x00JUNK").unwrap();
    let mut out = Vec::new();
    let locator = RecordingLocator::new(dir);
    let err = run(&locator, None, AnalyzerConfig::default(), &mut out).unwrap_err();

    assert!(!err.is_user_facing());
    assert!(out.is_empty());
}
