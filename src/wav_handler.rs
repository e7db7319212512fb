use crate::error::DiagError;
use crate::wav_data::*;

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, error, info, trace};

// List of Chunk IDs as u32 values (little endian)
const CID_RIFF: u32 = 0x46464952;
const CID_WAVE: u32 = 0x45564157;
const CID_FMT:  u32 = 0x20746d66;
const CID_DATA: u32 = 0x61746164;

const SIZE_CHUNK_HEADER: usize = 8;

#[derive(Debug, Copy, Clone)]
struct ChunkHeader {
    chunk_id: u32,
    size: u32
}

impl ChunkHeader {
    fn from_bytes(bytes: [u8; SIZE_CHUNK_HEADER]) -> Self {
        ChunkHeader{
            chunk_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    fn get_size(&self) -> usize {
        self.size as usize
    }

    // Chunks are word aligned, odd sized chunks carry a pad byte.
    fn padding(&self) -> u64 {
        (self.size & 0x01) as u64
    }
}

pub struct WavHandler;

/// Handles reading of .wav files.
///
/// Reads the FMT info and the 16 bit sample data of a wave file into memory.
/// Chunks following the data chunk are never looked at.
impl WavHandler {
    /// Read a file with the given filename.
    ///
    /// The file handle is released before this function returns, whether
    /// decoding succeeded or not.
    ///
    /// ``` no_run
    /// use wavdiag::WavHandler;
    ///
    /// # fn main() -> Result<(), wavdiag::DiagError> {
    ///
    /// let wave_data = WavHandler::read_file("mic_20240101-120000.wav")?;
    /// println!("{} frames", wave_data.num_frames());
    ///
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<WavData, DiagError> {
        let filename = filename.as_ref();
        info!("Reading wave file [{}]", filename.display());
        let data = {
            let file = File::open(filename).map_err(|e| {
                error!("Unable to open file [{}]: {}", filename.display(), e);
                e
            })?;
            WavHandler::read_content(BufReader::new(file))?
        };
        Ok(data)
    }

    /// Read wave data from the provided input stream.
    ///
    /// Source is any stream object implementing the Read and Seek traits.
    ///
    /// ```
    /// use wavdiag::WavHandler;
    /// use std::io::Cursor;
    ///
    /// let data: &[u8] = &[0x00]; // Some buffer with wave data
    /// let result = WavHandler::read_content(Cursor::new(data));
    /// assert!(result.is_err());
    /// ```
    pub fn read_content<R: Read + Seek>(mut source: R) -> Result<WavData, DiagError> {
        let size = WavHandler::read_riff_container(&mut source, CID_WAVE)?;
        debug!("RIFF container announces {} bytes", size);

        let mut fmt: Option<FmtChunk> = None;
        while let Some(header) = WavHandler::read_chunk_header(&mut source)? {
            debug!("Reading {} chunk, size {}", WavHandler::get_id_name(header.chunk_id), header.get_size());
            match header.chunk_id {
                CID_FMT => {
                    let body = WavHandler::read_chunk_body(&mut source, header.get_size())?;
                    let info = FmtChunk::from_bytes(&body)?;
                    debug!("Read chunk: {:#?}", info);
                    fmt = Some(info);
                    source.seek(SeekFrom::Current(header.padding() as i64))?;
                }
                CID_DATA => {
                    let info = match fmt {
                        Some(info) => info,
                        None => {
                            error!("Invalid file format, data chunk before fmt chunk");
                            return Err(DiagError::InvalidFormat("data chunk before fmt chunk".to_string()));
                        }
                    };
                    WavHandler::check_format(&info)?;
                    return WavHandler::read_samples(&mut source, info, header.get_size());
                }
                _ => WavHandler::skip_chunk(&mut source, &header)?,
            }
        }
        if fmt.is_none() {
            error!("Invalid file format, format chunk missing");
            return Err(DiagError::InvalidFormat("fmt chunk missing".to_string()));
        }
        error!("Invalid file format, data chunk missing");
        Err(DiagError::InvalidFormat("data chunk missing".to_string()))
    }

    // Read the RIFF container information from the input stream.
    //
    // This expects a RIFF header, followed by a 4-byte identifier (e.g.
    // "WAVE"), which is passed as argument.
    fn read_riff_container<R: Read>(source: &mut R, expected_cid: u32) -> Result<usize, DiagError> {
        let header = match WavHandler::read_chunk_header(source)? {
            Some(header) => header,
            None => return Err(DiagError::InvalidFormat("RIFF header incomplete".to_string())),
        };
        if header.chunk_id != CID_RIFF {
            error!("Unexpected chunk ID, expected RIFF, found {}", WavHandler::get_id_name(header.chunk_id));
            return Err(DiagError::InvalidFormat("not a RIFF file".to_string()));
        }
        let mut id = [0u8; 4];
        if source.read_exact(&mut id).is_err() {
            return Err(DiagError::InvalidFormat("file type missing".to_string()));
        }
        // RIFF header is followed by 4 bytes giving the file type
        let file_type = u32::from_le_bytes(id);
        debug!("File type: {}", WavHandler::get_id_name(file_type));
        if file_type != expected_cid {
            error!("Unexpected file type, expected {}, found {}",
                WavHandler::get_id_name(expected_cid), WavHandler::get_id_name(file_type));
            return Err(DiagError::InvalidFormat("not a WAVE file".to_string()));
        }
        Ok(header.get_size())
    }

    // Read the next chunk header. Returns None when the stream ends before a
    // complete header could be read.
    fn read_chunk_header<R: Read>(source: &mut R) -> Result<Option<ChunkHeader>, DiagError> {
        let mut bytes = [0u8; SIZE_CHUNK_HEADER];
        match source.read_exact(&mut bytes) {
            Ok(()) => {
                trace!("Read chunk header of {} bytes", SIZE_CHUNK_HEADER);
                Ok(Some(ChunkHeader::from_bytes(bytes)))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Read the contents of a chunk from the input stream.
    //
    // The chunk header is assumed to have been read already.
    fn read_chunk_body<R: Read>(source: &mut R, size: usize) -> Result<Vec<u8>, DiagError> {
        let mut body = Vec::new();
        source.by_ref().take(size as u64).read_to_end(&mut body)?;
        if body.len() != size {
            error!("Reading chunk data failed, got {} of {} bytes", body.len(), size);
            return Err(DiagError::InvalidFormat("incomplete chunk".to_string()));
        }
        Ok(body)
    }

    fn check_format(info: &FmtChunk) -> Result<(), DiagError> {
        if info.effective_format() != FMT_PCM {
            error!("Unsupported format tag {}", info.format_tag);
            return Err(DiagError::UnsupportedFormat(info.format_tag));
        }
        if info.num_channels == 0 {
            return Err(DiagError::InvalidFormat("channel count is zero".to_string()));
        }
        if info.sample_rate == 0 {
            return Err(DiagError::InvalidFormat("sample rate is zero".to_string()));
        }
        if info.bits_per_sample == 0 {
            return Err(DiagError::InvalidFormat("sample width is zero".to_string()));
        }
        if info.bits_per_sample != 16 {
            debug!("Decoding {} bit samples as 16 bit", info.bits_per_sample);
        }
        Ok(())
    }

    // Read the sample data into a buffer of i16.
    //
    // The frame count follows from the chunk size and the declared sample
    // width, while decoding always assumes 16 bit samples. Any disagreement
    // between the two shows up as a size mismatch.
    fn read_samples<R: Read>(source: &mut R, info: FmtChunk, num_bytes: usize) -> Result<WavData, DiagError> {
        let frame_bytes = info.frame_bytes();
        let num_frames = num_bytes / frame_bytes;
        let mut raw = Vec::new();
        source.by_ref().take((num_frames * frame_bytes) as u64).read_to_end(&mut raw)?;

        let expected = num_frames * info.get_num_channels() * SAMPLE_BYTES;
        info!("{} frames in {} channels, {} bytes of sample data", num_frames, info.num_channels, raw.len());
        if raw.len() != expected {
            error!("Sample data mismatch, expected {} bytes, found {}", expected, raw.len());
            return Err(DiagError::DecodeMismatch{expected, actual: raw.len()});
        }
        let samples = raw
            .chunks_exact(SAMPLE_BYTES)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        WavData::new(info, num_frames, samples)
    }

    // Skip over the rest of the current chunk to the next header.
    fn skip_chunk<R: Seek>(source: &mut R, header: &ChunkHeader) -> Result<(), DiagError> {
        source.seek(SeekFrom::Current(header.size as i64 + header.padding() as i64))?;
        Ok(())
    }

    // Convert a given chunk ID from u32 to printable string.
    fn get_id_name(value: u32) -> String {
        String::from_utf8_lossy(&value.to_le_bytes()).into_owned()
    }
}

/// Builds a 16 bit PCM wave file in memory.
#[cfg(test)]
pub(crate) fn encode_pcm16(samples: &[i16], sample_rate: u32, num_channels: u16) -> Vec<u8> {
    let block_align = num_channels * 2;
    let data_size = (samples.len() * 2) as u32;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&FMT_PCM.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    buf
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn get_data(ptr: &[u8]) -> Result<WavData, DiagError> {
    use std::io::Cursor;
    WavHandler::read_content(Cursor::new(ptr))
}

#[cfg(test)]
fn test_read(ptr: &[u8]) -> bool {
    get_data(ptr).is_ok()
}

#[test]
fn incomplete_riff_id_is_rejected() {
    let incomplete_riff: &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8,
    ];

    assert!(test_read(incomplete_riff) == false);
}

#[test]
fn empty_riff_is_rejected() {
    let empty_riff: &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x00, 0x00, 0x00, 0x00,
    ];

    assert!(test_read(empty_riff) == false);
}

#[test]
fn missing_riff_id_is_rejected() {
    let missing_riff_id : &[u8] = &[
        // RIFF header - invalid
        'R' as u8, 'x' as u8, 'x' as u8, 'x' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
    ];

    assert!(test_read(missing_riff_id) == false);
}

#[test]
fn missing_wave_id_is_rejected() {
    let missing_wave_id : &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // Wrong file ID
        'W' as u8, 'O' as u8, 'V' as u8, 'E' as u8,
    ];

    assert!(test_read(missing_wave_id) == false);
}

#[test]
fn valid_riff_empty_wave_is_rejected() {
    let empty_wave: &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
    ];

    assert!(matches!(get_data(empty_wave), Err(DiagError::InvalidFormat(_))));
}

#[test]
fn incomplete_chunk_is_rejected() {
    let incomplete_chunk: &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        // fmt chunk
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0x02, 0x00, 0x00, 0x00, // Size = 2
        0x42                    // Only single byte of data
    ];

    assert!(test_read(incomplete_chunk) == false);
}

#[test]
fn invalid_size_is_handled() {
    let incomplete_chunk: &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        // fmt chunk
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0xff, 0xff, 0xff, 0xff, // Size = 0xFFFFFFFF
        0x42                    // Only single byte of data
    ];

    assert!(test_read(incomplete_chunk) == false);
}

#[test]
fn data_before_fmt_is_rejected() {
    let data_first: &[u8] = &[
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x0e, 0x00, 0x00, 0x00,
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        'd' as u8, 'a' as u8, 't' as u8, 'a' as u8,
        0x02, 0x00, 0x00, 0x00,
        0x12, 0x34
    ];

    assert!(matches!(get_data(data_first), Err(DiagError::InvalidFormat(_))));
}

#[test]
fn unknown_chunks_are_skipped() {
    let single_sample : &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        // unknown chunk, odd size with pad byte
        'n' as u8, 'u' as u8, 'l' as u8, 'l' as u8,
        0x01, 0x00, 0x00, 0x00,
        0xFF, 0x00,
        // fmt chunk
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0x12, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        0x10, 0x00,             // 16 bit per sample
        0x00, 0x00,
        // data chunk
        'd' as u8, 'a' as u8, 't' as u8, 'a' as u8,
        0x02, 0x00, 0x00, 0x00,
        0x42, 0x43
    ];

    let wav_file = get_data(single_sample).unwrap();
    assert_eq!(wav_file.sample_rate(), 44100);
    assert_eq!(wav_file.samples(), &[0x4342_i16]);
}

#[test]
fn s16_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        // fmt chunk
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x88, 0x58, 0x01, 0x00, // Avg data rate
        0x02, 0x00,             // Block align
        0x10, 0x00,             // 16 bit per sample
        // data chunk
        'd' as u8, 'a' as u8, 't' as u8, 'a' as u8,
        0x04, 0x00, 0x00, 0x00,
        0x12, 0x34, 0xFF, 0xFF
    ];

    let wav_file = get_data(single_sample).unwrap();
    assert_eq!(wav_file.num_frames(), 2);
    assert_eq!(wav_file.samples(), &[0x3412_i16, -1_i16]);
}

#[test]
fn stereo_frames_are_counted_per_channel_pair() {
    let bytes = encode_pcm16(&[1, -1, 2, -2, 3, -3], 8000, 2);
    let wav_file = get_data(&bytes).unwrap();
    assert_eq!(wav_file.num_channels(), 2);
    assert_eq!(wav_file.num_frames(), 3);
    assert_eq!(wav_file.samples(), &[1, -1, 2, -2, 3, -3]);
}

#[test]
fn zero_frames_can_be_read() {
    let bytes = encode_pcm16(&[], 16000, 1);
    let wav_file = get_data(&bytes).unwrap();
    assert_eq!(wav_file.num_frames(), 0);
    assert!(wav_file.samples().is_empty());
}

#[test]
fn truncated_data_is_a_mismatch() {
    let mut bytes = encode_pcm16(&[1, 2, 3, 4], 8000, 1);
    bytes.truncate(bytes.len() - 3);
    match get_data(&bytes) {
        Err(DiagError::DecodeMismatch{expected, actual}) => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn u8_samples_are_a_mismatch() {
    let u8_samples : &[u8] = &[
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x44, 0xAC, 0x00, 0x00, // Avg data rate
        0x01, 0x00,             // Block align
        0x08, 0x00,             // 8 bit per sample
        'd' as u8, 'a' as u8, 't' as u8, 'a' as u8,
        0x04, 0x00, 0x00, 0x00,
        0x00, 0x01, 0x02, 0x03,
    ];

    // 4 frames of 8 bit are expected to hold 8 bytes of 16 bit samples
    assert!(matches!(get_data(u8_samples),
        Err(DiagError::DecodeMismatch{expected: 8, actual: 4})));
}

#[test]
fn float_format_is_rejected() {
    let f32_sample : &[u8] = &[
        'R' as u8, 'I' as u8, 'F' as u8, 'F' as u8,
        0x04, 0x00, 0x00, 0x00,
        'W' as u8, 'A' as u8, 'V' as u8, 'E' as u8,
        'f' as u8, 'm' as u8, 't' as u8, ' ' as u8,
        0x10, 0x00, 0x00, 0x00,
        0x03, 0x00,             // Float
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x10, 0xb1, 0x02, 0x00, // Avg data rate
        0x04, 0x00,             // Block align
        0x20, 0x00,             // 32 bit per sample
        'd' as u8, 'a' as u8, 't' as u8, 'a' as u8,
        0x04, 0x00, 0x00, 0x00,
        0xb6, 0xf3, 0x9d, 0x3f  // = 1.234 in LE format
    ];

    assert!(matches!(get_data(f32_sample), Err(DiagError::UnsupportedFormat(3))));
}

#[test]
fn zero_sample_rate_is_rejected() {
    let bytes = encode_pcm16(&[0, 0], 0, 1);
    assert!(matches!(get_data(&bytes), Err(DiagError::InvalidFormat(_))));
}

#[test]
fn file_can_be_read_from_disk() {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&encode_pcm16(&[5, -7, 9], 8000, 1)).unwrap();
    let wav_file = WavHandler::read_file(file.path()).unwrap();
    assert_eq!(wav_file.samples(), &[5, -7, 9]);
}

#[test]
fn missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("mic_absent.wav");
    assert!(matches!(WavHandler::read_file(&path), Err(DiagError::Io(_))));
}
