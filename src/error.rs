use std::path::PathBuf;

/// Everything that can go wrong while locating or analyzing a recording.
#[derive(Debug, thiserror::Error)]
pub enum DiagError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no recordings matching mic_*.wav in {}", .0.display())]
    NoRecordings(PathBuf),

    #[error("unable to determine home directory")]
    NoHomeDir,

    #[error("invalid wave file: {0}")]
    InvalidFormat(String),

    #[error("unsupported wave format tag 0x{0:04x}")]
    UnsupportedFormat(u16),

    #[error("sample data mismatch, expected {expected} bytes, found {actual}")]
    DecodeMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagError {
    /// True for the failures that are reported to the user as a single line
    /// instead of an error chain.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, DiagError::NotFound(_) | DiagError::NoRecordings(_))
    }
}
