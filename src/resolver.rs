//! Locates the recording to analyze.
//!
//! Recordings are written as `mic_<timestamp>.wav`, so the lexicographically
//! largest name is taken as the latest one. File modification times are
//! never consulted.

use crate::error::DiagError;

use log::{debug, info};

use std::fs;
use std::io;
use std::path::PathBuf;

const RECORDING_PREFIX: &str = "mic_";
const RECORDING_SUFFIX: &str = ".wav";

pub struct RecordingLocator {
    recordings_dir: PathBuf,
}

impl RecordingLocator {
    /// Creates a locator reading from the given directory.
    ///
    /// ```
    /// use wavdiag::RecordingLocator;
    ///
    /// let locator = RecordingLocator::new("/tmp/recordings");
    /// let path = locator.resolve(Some("mic_missing.wav"));
    /// assert!(path.is_err());
    /// ```
    pub fn new<P: Into<PathBuf>>(recordings_dir: P) -> Self {
        let recordings_dir = recordings_dir.into();
        info!("Set recordings directory to [{}]", recordings_dir.display());
        RecordingLocator{recordings_dir}
    }

    /// Creates a locator for `~/Documents/ai&i-recordings`.
    pub fn from_home() -> Result<Self, DiagError> {
        let home = std::env::var_os("HOME").ok_or(DiagError::NoHomeDir)?;
        let mut dir = PathBuf::from(home);
        dir.push("Documents");
        dir.push("ai&i-recordings");
        Ok(RecordingLocator::new(dir))
    }

    /// Returns the path of the named recording, or of the latest recording if
    /// no name is given.
    pub fn resolve(&self, filename: Option<&str>) -> Result<PathBuf, DiagError> {
        match filename {
            Some(name) => {
                let candidate = self.recordings_dir.join(name);
                if !candidate.exists() {
                    return Err(DiagError::NotFound(candidate));
                }
                Ok(candidate)
            }
            None => self.latest(),
        }
    }

    /// Returns the `mic_*.wav` entry with the largest name.
    pub fn latest(&self) -> Result<PathBuf, DiagError> {
        let mut names = self.recording_names()?;
        names.sort();
        debug!("Found {} recordings", names.len());
        match names.pop() {
            Some(name) => Ok(self.recordings_dir.join(name)),
            None => Err(DiagError::NoRecordings(self.recordings_dir.clone())),
        }
    }

    // A missing directory counts as having no recordings.
    fn recording_names(&self) -> Result<Vec<String>, DiagError> {
        let entries = match fs::read_dir(&self.recordings_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Ok(name) = entry.file_name().into_string() {
                if is_recording_name(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

// Matches the glob `mic_*.wav`.
fn is_recording_name(name: &str) -> bool {
    name.len() >= RECORDING_PREFIX.len() + RECORDING_SUFFIX.len()
        && name.starts_with(RECORDING_PREFIX)
        && name.ends_with(RECORDING_SUFFIX)
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use tempfile::tempdir;

#[test]
fn glob_pattern_is_matched() {
    assert!(is_recording_name("mic_.wav"));
    assert!(is_recording_name("mic_20240101-101500.wav"));
    assert!(!is_recording_name("mic.wav"));
    assert!(!is_recording_name("system_20240101.wav"));
    assert!(!is_recording_name("mic_20240101.WAV"));
    assert!(!is_recording_name("mic_20240101.wav.bak"));
}

#[test]
fn latest_is_lexicographic_maximum() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    for name in &["mic_2024-03-01.wav", "mic_2024-12-31.wav", "mic_2024-06-15.wav", "zzz.wav"] {
        fs::write(dir.join(name), b"").unwrap();
    }
    let locator = RecordingLocator::new(dir);
    assert_eq!(locator.resolve(None).unwrap(), dir.join("mic_2024-12-31.wav"));
}

#[test]
fn named_file_is_resolved_in_directory() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("other.wav"), b"").unwrap();
    let locator = RecordingLocator::new(dir);
    assert_eq!(locator.resolve(Some("other.wav")).unwrap(), dir.join("other.wav"));
}

#[test]
fn missing_named_file_is_not_found() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let locator = RecordingLocator::new(dir);
    let err = locator.resolve(Some("mic_nope.wav")).unwrap_err();
    assert_eq!(err.to_string(), format!("file not found: {}", dir.join("mic_nope.wav").display()));
}

#[test]
fn empty_directory_has_no_recordings() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("notes.txt"), b"").unwrap();
    let locator = RecordingLocator::new(dir);
    assert!(matches!(locator.resolve(None), Err(DiagError::NoRecordings(_))));
}

#[test]
fn missing_directory_has_no_recordings() {
    let tmp = tempdir().unwrap();
    let locator = RecordingLocator::new(tmp.path().join("absent"));
    assert!(matches!(locator.latest(), Err(DiagError::NoRecordings(_))));
}
