//! Mel spectrogram - log-magnitude mel bands on a fixed-width time axis.
//!
//! # Documentation Sources
//!
//! - Slaney (1998): "Auditory Toolbox", mel scale and filter normalization
//! - Standard STFT definition from signal processing textbooks
//!
//! # Algorithm Overview
//!
//! 1. **Framing**: centered frames, signal zero-padded by `n_fft / 2` on
//!    both sides, one frame every `hop_length` samples. A signal of `N`
//!    samples yields `1 + N / hop_length` frames.
//!
//! 2. **Windowing**: periodic Hann window of length `n_fft`.
//!
//! 3. **FFT**: power spectrum |X(f)|² of each frame.
//!
//! 4. **Mel filterbank**: triangular filters equally spaced on the Slaney
//!    mel scale between `fmin` and `fmax`, each scaled to unit area
//!    (`2 / (f_right - f_left)`).
//!
//! 5. **dB**: `20 × log₁₀(max(amin, S)) - 20 × log₁₀(max(amin, max S))`,
//!    clamped to `top_db` below the clip's peak. The scale is relative:
//!    0 dB is the loudest bin of this clip.
//!
//! 6. **Width fixing**: right-pad with the silence floor or truncate from
//!    the end to exactly `target_width` frames.
//!
//! Framing parameters are configuration constants (see [`crate::config`]),
//! never derived from the input.

use ndarray::{s, Array2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Error, Result};
use crate::waveform::Waveform;
use crate::FeatureConfig;

/// Fixed-width mel spectrogram in dB.
///
/// - Rows: mel bands (low to high)
/// - Columns: time frames
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    /// dB values (n_mels × width).
    values: Array2<f64>,

    /// Frames computed from the signal before padding/truncation.
    n_frames: usize,

    /// Hop between frames in samples.
    hop_length: usize,

    /// Sample rate of the analyzed waveform.
    sample_rate: u32,

    /// Value used for padded frames (dB).
    floor_db: f64,
}

impl MelSpectrogram {
    /// Get the dB values (n_mels × width).
    #[inline]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of mel bands.
    #[inline]
    pub fn n_mels(&self) -> usize {
        self.values.nrows()
    }

    /// Number of time frames after width fixing.
    #[inline]
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Frames computed from the signal before width fixing.
    #[inline]
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Frames that carry signal, as opposed to padding.
    #[inline]
    pub fn n_signal_frames(&self) -> usize {
        self.n_frames.min(self.width())
    }

    /// The silence floor used for padding (dB).
    #[inline]
    pub fn floor_db(&self) -> f64 {
        self.floor_db
    }

    /// Time step between frames in seconds.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// Center time of a frame (0-based).
    #[inline]
    pub fn get_time_from_frame(&self, frame: usize) -> f64 {
        frame as f64 * self.time_step()
    }

    /// Largest absolute value, used for normalization downstream.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()))
    }
}

/// Hz to mel, Slaney scale (linear below 1 kHz, logarithmic above).
pub fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Mel to Hz, Slaney scale.
pub fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// `n_mels + 2` filter edge frequencies equally spaced in mel.
fn mel_edges(n_mels: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect()
}

/// Center frequency of every mel band (Hz).
pub fn mel_band_centers(n_mels: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let edges = mel_edges(n_mels, fmin, fmax);
    edges[1..=n_mels].to_vec()
}

/// Slaney-normalized triangular mel filterbank (n_mels × n_fft/2+1).
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Array2<f64> {
    let n_freqs = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();
    let edges = mel_edges(n_mels, fmin, fmax);

    let mut filters = Array2::<f64>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        let enorm = 2.0 / (right - left);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let weight = lower.min(upper).max(0.0);
            filters[[m, k]] = weight * enorm;
        }
    }

    filters
}

/// Periodic Hann window, `0.5 - 0.5 × cos(2πn / N)`.
fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
        .collect()
}

/// Centered STFT power spectrogram (n_fft/2+1 × frames).
pub fn stft_power(samples: &[f64], n_fft: usize, hop_length: usize) -> Array2<f64> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let n_frames = 1 + (padded.len() - n_fft) / hop_length;
    let n_freqs = n_fft / 2 + 1;
    let window = hann_window(n_fft);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut power = Array2::<f64>::zeros((n_freqs, n_frames));
    let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n_fft];

    for frame in 0..n_frames {
        let start = frame * hop_length;
        for (j, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + j] * window[j], 0.0);
        }

        fft.process(&mut buffer);

        for (j, c) in buffer[..n_freqs].iter().enumerate() {
            power[[j, frame]] = c.norm_sqr();
        }
    }

    power
}

/// Convert to dB relative to the peak, clamped `top_db` below the maximum.
///
/// Returns the dB array and the floor that the clamp applied.
pub fn to_db_relative(values: &Array2<f64>, amin: f64, top_db: f64) -> (Array2<f64>, f64) {
    let peak = values.iter().fold(0.0f64, |acc, &v| acc.max(v));
    let ref_db = 20.0 * peak.max(amin).log10();
    let db = values.mapv(|v| 20.0 * v.max(amin).log10() - ref_db);
    let max_db = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let floor = max_db - top_db;
    (db.mapv(|v| v.max(floor)), floor)
}

/// Pad with `fill` or truncate along the time axis to exactly `width` columns.
///
/// # Errors
///
/// `Error::ShapeMismatch` if `width` is zero.
pub fn fix_width(values: &Array2<f64>, width: usize, fill: f64) -> Result<Array2<f64>> {
    if width == 0 {
        return Err(Error::ShapeMismatch {
            expected: "target width > 0".to_string(),
            got: "0".to_string(),
        });
    }

    let n_cols = values.ncols();
    if n_cols >= width {
        return Ok(values.slice(s![.., ..width]).to_owned());
    }

    let mut fixed = Array2::from_elem((values.nrows(), width), fill);
    fixed.slice_mut(s![.., ..n_cols]).assign(values);
    Ok(fixed)
}

/// Compute the fixed-width mel spectrogram of a waveform.
///
/// # Errors
///
/// - `Error::ShapeMismatch` if the configured target width is zero
/// - `Error::Config` for unusable framing or mel parameters
pub fn mel_spectrogram_db(waveform: &Waveform, config: &FeatureConfig) -> Result<MelSpectrogram> {
    config.validate()?;

    let power = stft_power(waveform.as_slice(), config.n_fft, config.hop_length);
    let filters = mel_filterbank(
        waveform.sample_rate(),
        config.n_fft,
        config.n_mels,
        config.fmin,
        config.fmax,
    );
    let mel = filters.dot(&power);
    let n_frames = mel.ncols();

    let (db, floor_db) = to_db_relative(&mel, config.amin, config.top_db);
    let values = fix_width(&db, config.target_width, floor_db)?;

    tracing::debug!(
        n_mels = config.n_mels,
        n_frames,
        width = config.target_width,
        "mel spectrogram"
    );

    Ok(MelSpectrogram {
        values,
        n_frames,
        hop_length: config.hop_length,
        sample_rate: waveform.sample_rate(),
        floor_db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slaney_mel_scale() {
        assert_relative_eq!(hz_to_mel(0.0), 0.0);
        assert_relative_eq!(hz_to_mel(1000.0), 15.0, epsilon = 1e-12);
        assert_relative_eq!(hz_to_mel(200.0), 3.0, epsilon = 1e-12);
        for &hz in &[50.0, 440.0, 1000.0, 3000.0, 8000.0] {
            assert_relative_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_filterbank_shape_and_coverage() {
        let fb = mel_filterbank(16000, 2048, 128, 0.0, 8000.0);
        assert_eq!(fb.shape(), &[128, 1025]);
        for m in 0..128 {
            let row_sum: f64 = fb.row(m).sum();
            assert!(row_sum > 0.0, "mel band {m} is empty");
        }
        assert!(fb.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_hann_window_periodic() {
        let w = hann_window(8);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], w[7], epsilon = 1e-12);
    }

    #[test]
    fn test_stft_frame_count() {
        let power = stft_power(&vec![0.1; 16000], 2048, 512);
        assert_eq!(power.shape(), &[1025, 1 + 16000 / 512]);
        let power = stft_power(&[0.1], 2048, 512);
        assert_eq!(power.ncols(), 1);
    }

    #[test]
    fn test_to_db_relative_peak_is_zero_and_clamped() {
        let values = Array2::from_shape_vec((1, 3), vec![1.0, 1e-3, 1e-12]).unwrap();
        let (db, floor) = to_db_relative(&values, 1e-5, 80.0);
        assert_relative_eq!(db[[0, 0]], 0.0);
        assert_relative_eq!(db[[0, 1]], -60.0, epsilon = 1e-9);
        assert_relative_eq!(db[[0, 2]], -80.0, epsilon = 1e-9);
        assert_relative_eq!(floor, -80.0);
    }

    #[test]
    fn test_to_db_all_zero_is_finite() {
        let values = Array2::<f64>::zeros((4, 4));
        let (db, _) = to_db_relative(&values, 1e-5, 80.0);
        assert!(db.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_fix_width_pad_and_truncate() {
        let values = Array2::from_shape_fn((2, 3), |(i, j)| (i * 3 + j) as f64);
        let padded = fix_width(&values, 5, -80.0).unwrap();
        assert_eq!(padded.shape(), &[2, 5]);
        assert_eq!(padded[[1, 2]], 5.0);
        assert_eq!(padded[[0, 3]], -80.0);
        assert_eq!(padded[[1, 4]], -80.0);

        let truncated = fix_width(&values, 2, -80.0).unwrap();
        assert_eq!(truncated.shape(), &[2, 2]);
        assert_eq!(truncated[[1, 1]], 4.0);

        assert!(matches!(
            fix_width(&values, 0, -80.0),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_short_clip_is_padded_with_floor() {
        let config = FeatureConfig::default();
        let w = Waveform::tone(440.0, 0.1, 16000, 0.5).unwrap();
        let mel = mel_spectrogram_db(&w, &config).unwrap();
        assert_eq!(mel.values().shape(), &[128, 128]);
        assert_eq!(mel.n_frames(), 1 + 1600 / 512);
        for frame in mel.n_frames()..128 {
            assert!(mel.values().column(frame).iter().all(|&v| v == mel.floor_db()));
        }
        assert_relative_eq!(mel.floor_db(), -80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_long_clip_is_truncated() {
        let config = FeatureConfig::default();
        let w = Waveform::tone(440.0, 5.0, 16000, 0.5).unwrap();
        let mel = mel_spectrogram_db(&w, &config).unwrap();
        assert!(mel.n_frames() > 128);
        assert_eq!(mel.width(), 128);
        assert_eq!(mel.n_signal_frames(), 128);
    }

    #[test]
    fn test_energy_concentrates_near_tone() {
        let config = FeatureConfig::default();
        let w = Waveform::tone(220.0, 1.0, 16000, 0.5).unwrap();
        let mel = mel_spectrogram_db(&w, &config).unwrap();

        let frames = mel.n_signal_frames();
        let band_means: Vec<f64> = (0..mel.n_mels())
            .map(|m| mel.values().row(m).slice(s![..frames]).mean().unwrap_or(f64::MIN))
            .collect();
        let loudest = band_means
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        let centers = mel_band_centers(128, 0.0, 8000.0);
        let expected = centers
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - 220.0).abs().total_cmp(&(b.1 - 220.0).abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert!(
            loudest.abs_diff(expected) <= 2,
            "loudest band {loudest}, expected near {expected}"
        );
    }

    #[test]
    fn test_zero_width_rejected() {
        let config = FeatureConfig {
            target_width: 0,
            ..FeatureConfig::default()
        };
        let w = Waveform::tone(440.0, 0.1, 16000, 0.5).unwrap();
        assert!(matches!(
            mel_spectrogram_db(&w, &config),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_framing_is_config_error() {
        let w = Waveform::tone(440.0, 0.1, 16000, 0.5).unwrap();
        let zero_hop = FeatureConfig {
            hop_length: 0,
            ..FeatureConfig::default()
        };
        assert!(matches!(
            mel_spectrogram_db(&w, &zero_hop),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            w.to_mel_spectrogram(&FeatureConfig {
                n_fft: 0,
                ..FeatureConfig::default()
            }),
            Err(Error::Config(_))
        ));
    }
}
