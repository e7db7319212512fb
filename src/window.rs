//! Fixed size window statistics over interleaved samples.
//!
//! Windows are counted in raw samples, not frames. For a recording with C
//! channels a window of `sample_rate * seconds` samples covers `seconds / C`
//! seconds of audio.

use num::ToPrimitive;

/// Number of interleaved samples in one window, None if it does not fit in
/// a usize.
pub fn window_size(sample_rate: u32, window_seconds: u32) -> Option<usize> {
    (sample_rate as usize).checked_mul(window_seconds as usize)
}

/// Mean of the absolute sample values of every consecutive window.
///
/// The last window may be shorter than `window_size`. An empty sample slice
/// yields no windows.
///
/// # Panics
///
/// Panics if `window_size` is zero.
///
/// ```
/// use wavdiag::window::window_means;
///
/// let means = window_means(&[1_i16, -3, 4, -4, 10], 2);
/// assert_eq!(means, vec![2.0, 4.0, 10.0]);
/// ```
pub fn window_means<T>(samples: &[T], window_size: usize) -> Vec<f64>
        where T: ToPrimitive + Copy {
    assert!(window_size > 0, "window size must be positive");
    samples.chunks(window_size).map(mean_abs).collect()
}

// Converts through f64, so i16::MIN yields 32768 without overflow.
fn mean_abs<T: ToPrimitive + Copy>(chunk: &[T]) -> f64 {
    let sum: f64 = chunk.iter()
        .map(|s| s.to_f64().unwrap_or(0.0).abs())
        .sum();
    sum / chunk.len() as f64
}

/// Largest absolute sample value, or None for an empty slice.
pub fn peak_amplitude(samples: &[i16]) -> Option<u32> {
    samples.iter().map(|s| (*s as i32).unsigned_abs()).max()
}

/// Round to the nearest integer, ties going to the even neighbour.
pub fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn short_input_yields_single_window() {
    let samples = vec![100_i16; 300];
    let means = window_means(&samples, window_size(8000, 5).unwrap());
    assert_eq!(means, vec![100.0]);
}

#[test]
fn trailing_partial_window_is_kept() {
    let samples: Vec<i16> = vec![2, 2, 2, 2, -6];
    let means = window_means(&samples, 2);
    assert_eq!(means.len(), 3);
    assert_eq!(means[2], 6.0);
}

#[test]
fn empty_input_yields_no_windows() {
    let samples: Vec<i16> = vec![];
    assert!(window_means(&samples, 10).is_empty());
    assert_eq!(peak_amplitude(&samples), None);
}

#[test]
fn minimum_sample_does_not_overflow() {
    let samples = vec![i16::MIN, i16::MAX];
    assert_eq!(peak_amplitude(&samples), Some(32768));
    assert_eq!(window_means(&samples, 2), vec![32767.5]);
}

#[test]
fn peak_covers_all_windows() {
    let mut samples = vec![1_i16; 100];
    samples[97] = -900;
    let means = window_means(&samples, 10);
    assert_eq!(means.len(), 10);
    assert_eq!(peak_amplitude(&samples), Some(900));
}

#[test]
fn window_size_ignores_channel_count() {
    // 2 channels at 4 Hz: a 1 second window spans 4 samples, i.e. 2 frames
    let stereo: Vec<i16> = vec![1, 1, 1, 1, 3, 3, 3, 3];
    let means = window_means(&stereo, window_size(4, 1).unwrap());
    assert_eq!(means, vec![1.0, 3.0]);
}

#[test]
fn ties_round_to_even() {
    assert_eq!(round_half_even(0.5), 0);
    assert_eq!(round_half_even(1.5), 2);
    assert_eq!(round_half_even(2.5), 2);
    assert_eq!(round_half_even(2.51), 3);
    assert_eq!(round_half_even(32767.5), 32768);
}

#[test]
fn window_size_is_rate_times_seconds() {
    assert_eq!(window_size(44100, 5), Some(220500));
    assert_eq!(window_size(u32::MAX, 1), Some(u32::MAX as usize));
}
