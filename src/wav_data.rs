use crate::error::DiagError;

// Format tag identifiers (only integer PCM is decoded)
pub const FMT_PCM: u16 = 1;
pub const FMT_EXTENSIBLE: u16 = 0xFFFE;

pub const SIZE_FMT_BASE: usize = 16;

/// Bytes per decoded sample. Samples are always read as signed 16 bit.
pub const SAMPLE_BYTES: usize = 2;

/// Represents the format chunk that needs to be present in every WAV file.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct FmtChunk {
    pub format_tag: u16,      // wFormatTag      2   Format code
    pub num_channels: u16,    // nChannels       2   Number of interleaved channels
    pub sample_rate: u32,     // nSamplesPerSec  4   Sampling rate (blocks per second)
    pub avg_data_rate: u32,   // nAvgBytesPerSec 4   Data rate
    pub block_align: u16,     // nBlockAlign     2   Data block size (bytes)
    pub bits_per_sample: u16, // wBitsPerSample  2   Bits per sample
    pub sub_format: u16,      // First two bytes of the SubFormat GUID, 0 if absent
}

impl FmtChunk {
    /// Parse the chunk body (without the 8 byte chunk header).
    pub fn from_bytes(bytes: &[u8]) -> Result<FmtChunk, DiagError> {
        if bytes.len() < SIZE_FMT_BASE {
            return Err(DiagError::InvalidFormat(
                format!("fmt chunk too short, {} bytes", bytes.len())));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        // Extensible header: cbSize(2) validBits(2) channelMask(4) GUID(16)
        let sub_format = if bytes.len() >= 40 { u16_at(24) } else { 0 };
        Ok(FmtChunk{
            format_tag: u16_at(0),
            num_channels: u16_at(2),
            sample_rate: u32_at(4),
            avg_data_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
            sub_format,
        })
    }

    /// Get the format code describing the sample encoding, resolving the
    /// extensible wrapper to its sub-format.
    pub fn effective_format(&self) -> u16 {
        if self.format_tag == FMT_EXTENSIBLE {
            self.sub_format
        } else {
            self.format_tag
        }
    }

    /// Get the number of audio channels defined in the WAV file.
    pub fn get_num_channels(&self) -> usize {
        self.num_channels as usize
    }

    /// Get the number of bits per sample defined in the WAV file.
    pub fn get_bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }

    /// Size of one frame in bytes, derived from the sample width rather than
    /// the block align field.
    pub fn frame_bytes(&self) -> usize {
        let sample_width = (self.get_bits_per_sample() + 7) / 8;
        self.get_num_channels() * sample_width
    }
}

/// Contains the format information and decoded samples of a recording.
#[derive(Debug)]
pub struct WavData {
    info: FmtChunk,
    num_frames: usize,
    samples: Vec<i16>,
}

impl WavData {
    /// Create a recording from interleaved samples.
    ///
    /// The sample count has to match `num_frames` times the channel count.
    /// Sample rate and channel count must be non-zero.
    pub fn new(info: FmtChunk, num_frames: usize, samples: Vec<i16>) -> Result<WavData, DiagError> {
        if info.num_channels == 0 {
            return Err(DiagError::InvalidFormat("channel count is zero".to_string()));
        }
        if info.sample_rate == 0 {
            return Err(DiagError::InvalidFormat("sample rate is zero".to_string()));
        }
        let expected = num_frames * info.get_num_channels();
        if samples.len() != expected {
            return Err(DiagError::DecodeMismatch{
                expected: expected * SAMPLE_BYTES,
                actual: samples.len() * SAMPLE_BYTES,
            });
        }
        Ok(WavData{info, num_frames, samples})
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.info.get_num_channels()
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Get the interleaved sample data.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Length of the recording in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_frames as f64 / self.info.sample_rate as f64
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn stereo_fmt() -> FmtChunk {
    FmtChunk{
        format_tag: FMT_PCM,
        num_channels: 2,
        sample_rate: 8000,
        avg_data_rate: 32000,
        block_align: 4,
        bits_per_sample: 16,
        sub_format: 0,
    }
}

#[test]
fn fmt_chunk_is_parsed() {
    let bytes: &[u8] = &[
        0x01, 0x00,             // PCM
        0x02, 0x00,             // 2 channels
        0x40, 0x1F, 0x00, 0x00, // 8000 Hz
        0x00, 0x7D, 0x00, 0x00, // Avg data rate
        0x04, 0x00,             // Block align
        0x10, 0x00,             // 16 bit per sample
    ];
    let fmt = FmtChunk::from_bytes(bytes).unwrap();
    assert_eq!(fmt, stereo_fmt());
    assert_eq!(fmt.frame_bytes(), 4);
}

#[test]
fn short_fmt_chunk_is_rejected() {
    let bytes: &[u8] = &[0x01, 0x00, 0x01, 0x00];
    assert!(matches!(FmtChunk::from_bytes(bytes), Err(DiagError::InvalidFormat(_))));
}

#[test]
fn extensible_format_resolves_sub_format() {
    let mut bytes = vec![0u8; 40];
    bytes[0..2].copy_from_slice(&FMT_EXTENSIBLE.to_le_bytes());
    bytes[2..4].copy_from_slice(&1u16.to_le_bytes());
    bytes[14..16].copy_from_slice(&16u16.to_le_bytes());
    bytes[16..18].copy_from_slice(&22u16.to_le_bytes());
    bytes[24..26].copy_from_slice(&FMT_PCM.to_le_bytes());
    let fmt = FmtChunk::from_bytes(&bytes).unwrap();
    assert_eq!(fmt.format_tag, FMT_EXTENSIBLE);
    assert_eq!(fmt.effective_format(), FMT_PCM);
}

#[test]
fn frame_bytes_rounds_up_sample_width() {
    let mut fmt = stereo_fmt();
    fmt.bits_per_sample = 12;
    assert_eq!(fmt.frame_bytes(), 4);
    fmt.bits_per_sample = 24;
    assert_eq!(fmt.frame_bytes(), 6);
}

#[test]
fn duration_is_frames_over_rate() {
    let data = WavData::new(stereo_fmt(), 4000, vec![0; 8000]).unwrap();
    assert_eq!(data.num_frames(), 4000);
    assert_eq!(data.num_channels(), 2);
    assert!((data.duration_secs() - 0.5).abs() < 1e-12);
}

#[test]
fn sample_count_mismatch_is_detected() {
    let result = WavData::new(stereo_fmt(), 3, vec![0; 5]);
    match result {
        Err(DiagError::DecodeMismatch{expected, actual}) => {
            assert_eq!(expected, 12);
            assert_eq!(actual, 10);
        }
        _ => panic!("expected mismatch"),
    }
}

#[test]
fn zero_rate_or_channels_are_rejected() {
    let mut fmt = stereo_fmt();
    fmt.sample_rate = 0;
    assert!(matches!(WavData::new(fmt, 1, vec![1, 2]), Err(DiagError::InvalidFormat(_))));

    let mut fmt = stereo_fmt();
    fmt.num_channels = 0;
    assert!(matches!(WavData::new(fmt, 0, vec![]), Err(DiagError::InvalidFormat(_))));
}
