//! Loudness diagnostics for a single recording.

use crate::error::DiagError;
use crate::wav_data::WavData;
use crate::wav_handler::WavHandler;
use crate::window::{peak_amplitude, round_half_even, window_means, window_size};

use log::{debug, info};

use std::fmt;
use std::path::Path;

const DEFAULT_WINDOW_SECONDS: u32 = 5;
const DEFAULT_PREVIEW_WINDOWS: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    pub window_seconds: u32,   // Window length, counted as sample_rate * seconds raw samples
    pub preview_windows: usize // Number of window means shown in the report
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig{
            window_seconds: DEFAULT_WINDOW_SECONDS,
            preview_windows: DEFAULT_PREVIEW_WINDOWS,
        }
    }
}

/// Summary of a recording, printed once and discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticReport {
    pub filename: String,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub window_seconds: u32,
    pub preview_windows: usize,
    pub num_windows: usize,
    pub preview: Vec<i64>,  // Rounded means of the first windows
    pub peak: Option<u32>,  // None if the recording holds no samples
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "file: {}", self.filename)?;
        writeln!(f, "  duration: {:.2}s  sample_rate: {}hz  channels: {}",
            self.duration, self.sample_rate, self.channels)?;
        match self.peak {
            Some(peak) => {
                let values: Vec<String> = self.preview.iter().map(|v| v.to_string()).collect();
                writeln!(f, "  avg rms over {}s windows (first {}): [{}]",
                    self.window_seconds, self.preview_windows, values.join(", "))?;
                writeln!(f, "  global max amplitude: {}", peak)
            }
            None => writeln!(f, "  no samples found"),
        }
    }
}

pub struct SegmentAnalyzer {
    config: AnalyzerConfig,
}

impl SegmentAnalyzer {
    /// Create an analyzer, rejecting a zero window length.
    ///
    /// ```
    /// use wavdiag::{AnalyzerConfig, SegmentAnalyzer};
    ///
    /// let analyzer = SegmentAnalyzer::new(AnalyzerConfig::default());
    /// assert!(analyzer.is_ok());
    /// ```
    pub fn new(config: AnalyzerConfig) -> Result<Self, DiagError> {
        if config.window_seconds == 0 {
            return Err(DiagError::InvalidConfig("window length must be at least one second".to_string()));
        }
        Ok(SegmentAnalyzer{config})
    }

    /// Decode the file at the given path and summarize it.
    ///
    /// The file is closed before any statistics are computed.
    pub fn analyze(&self, path: &Path) -> Result<DiagnosticReport, DiagError> {
        let recording = WavHandler::read_file(path)?;
        let filename = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.summarize(filename, &recording)
    }

    /// Compute the report for an already decoded recording.
    pub fn summarize(&self, filename: String, recording: &WavData) -> Result<DiagnosticReport, DiagError> {
        let size = window_size(recording.sample_rate(), self.config.window_seconds)
            .ok_or_else(|| DiagError::InvalidConfig(
                format!("{}s window at {}hz is too large", self.config.window_seconds, recording.sample_rate())))?;
        let means = window_means(recording.samples(), size);
        debug!("{} windows of {} samples", means.len(), size);

        let preview = means.iter()
            .take(self.config.preview_windows)
            .map(|m| round_half_even(*m))
            .collect();
        let peak = if means.is_empty() { None } else { peak_amplitude(recording.samples()) };
        info!("Analyzed [{}]: {} frames, peak {:?}", filename, recording.num_frames(), peak);

        Ok(DiagnosticReport{
            filename,
            duration: recording.duration_secs(),
            sample_rate: recording.sample_rate(),
            channels: recording.num_channels(),
            window_seconds: self.config.window_seconds,
            preview_windows: self.config.preview_windows,
            num_windows: means.len(),
            preview,
            peak,
        })
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use crate::wav_data::{FmtChunk, FMT_PCM};

#[cfg(test)]
fn recording(sample_rate: u32, num_channels: u16, samples: Vec<i16>) -> WavData {
    let info = FmtChunk{
        format_tag: FMT_PCM,
        num_channels,
        sample_rate,
        avg_data_rate: sample_rate * num_channels as u32 * 2,
        block_align: num_channels * 2,
        bits_per_sample: 16,
        sub_format: 0,
    };
    let num_frames = samples.len() / num_channels as usize;
    WavData::new(info, num_frames, samples).unwrap()
}

#[cfg(test)]
fn default_analyzer() -> SegmentAnalyzer {
    SegmentAnalyzer::new(AnalyzerConfig::default()).unwrap()
}

#[test]
fn silent_second_is_reported() {
    let report = default_analyzer().summarize("mic_silence.wav".to_string(), &recording(8000, 1, vec![0; 8000])).unwrap();
    assert_eq!(report.preview, vec![0]);
    assert_eq!(report.peak, Some(0));
    assert_eq!(report.to_string(),
        "file: mic_silence.wav\n\
         \x20 duration: 1.00s  sample_rate: 8000hz  channels: 1\n\
         \x20 avg rms over 5s windows (first 10): [0]\n\
         \x20 global max amplitude: 0\n");
}

#[test]
fn empty_recording_prints_fallback() {
    let report = default_analyzer().summarize("mic_empty.wav".to_string(), &recording(44100, 1, vec![])).unwrap();
    assert_eq!(report.num_windows, 0);
    assert_eq!(report.peak, None);
    assert_eq!(report.to_string(),
        "file: mic_empty.wav\n\
         \x20 duration: 0.00s  sample_rate: 44100hz  channels: 1\n\
         \x20 no samples found\n");
}

#[test]
fn preview_is_limited_to_ten_windows() {
    // 12 windows of 1 second at 2 Hz, peak in the last, undisplayed window
    let mut samples = Vec::new();
    for i in 0..12_i16 {
        samples.extend_from_slice(&[i * 10, -i * 10]);
    }
    samples[23] = -5000;
    let config = AnalyzerConfig{window_seconds: 1, ..Default::default()};
    let report = SegmentAnalyzer::new(config).unwrap().summarize("x.wav".to_string(), &recording(2, 1, samples)).unwrap();
    assert_eq!(report.num_windows, 12);
    assert_eq!(report.preview, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
    assert_eq!(report.peak, Some(5000));
}

#[test]
fn fractional_duration_is_rounded() {
    let report = default_analyzer().summarize("x.wav".to_string(), &recording(3, 1, vec![1; 10])).unwrap();
    assert!(report.to_string().contains("duration: 3.33s"));
}

#[test]
fn stereo_window_spans_raw_samples() {
    // 4 Hz stereo, 1 second window = 4 interleaved samples = 2 frames
    let samples = vec![2, -2, 2, -2, 8, -8, 8, -8, 1, 1];
    let config = AnalyzerConfig{window_seconds: 1, ..Default::default()};
    let report = SegmentAnalyzer::new(config).unwrap().summarize("s.wav".to_string(), &recording(4, 2, samples)).unwrap();
    assert!((report.duration - 1.25).abs() < 1e-12);
    assert_eq!(report.channels, 2);
    assert_eq!(report.num_windows, 3);
    assert_eq!(report.preview, vec![2, 8, 1]);
}

#[test]
fn half_values_round_to_even() {
    // means 2.5 and 3.5
    let samples = vec![2, 3, 3, 4];
    let config = AnalyzerConfig{window_seconds: 1, ..Default::default()};
    let report = SegmentAnalyzer::new(config).unwrap().summarize("r.wav".to_string(), &recording(2, 1, samples)).unwrap();
    assert_eq!(report.preview, vec![2, 4]);
}

#[test]
fn zero_window_length_is_rejected() {
    let config = AnalyzerConfig{window_seconds: 0, ..Default::default()};
    assert!(matches!(SegmentAnalyzer::new(config), Err(DiagError::InvalidConfig(_))));
}

#[cfg(target_pointer_width = "32")]
#[test]
fn oversized_window_is_rejected() {
    let config = AnalyzerConfig{window_seconds: u32::MAX, ..Default::default()};
    let result = SegmentAnalyzer::new(config).unwrap().summarize("w.wav".to_string(), &recording(48000, 1, vec![1]));
    assert!(matches!(result, Err(DiagError::InvalidConfig(_))));
}
