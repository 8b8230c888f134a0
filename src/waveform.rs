//! Waveform - Mono audio samples with an integer sample rate.
//!
//! This is the foundation type for all feature extraction in vocalcheck.
//!
//! # Invariants
//!
//! A `Waveform` is never empty and never contains NaN or infinite samples.
//! Both are checked by every constructor, so the extractors can rely on
//! them without re-validating.
//!
//! # Loading
//!
//! [`Waveform::load`] plays the role of the audio source in front of the
//! classifier: it decodes a WAV file, averages all channels down to mono and
//! resamples to the requested rate (16 kHz for the classifier). Integer
//! sample formats are normalized to [-1.0, 1.0].

use std::path::Path;

use ndarray::Array1;
use rubato::{FftFixedIn, Resampler};

use crate::error::{Error, Result};
use crate::formant::FormantSet;
use crate::glottal::GlottalFeatures;
use crate::mel::MelSpectrogram;
use crate::FeatureConfig;

/// Mono audio samples paired with a sample rate.
///
/// # Example
///
/// ```no_run
/// use vocalcheck::Waveform;
///
/// let waveform = Waveform::load("speech.wav", 16000).unwrap();
/// println!("Duration: {:.3}s", waveform.duration());
/// ```
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Samples, finite, at least one.
    samples: Array1<f64>,

    /// Sample rate in Hz.
    sample_rate: u32,
}

impl Waveform {
    /// Create a Waveform from samples and sample rate.
    ///
    /// # Errors
    ///
    /// - `Error::EmptyWaveform` if `samples` is empty
    /// - `Error::NonFiniteSample` if any sample is NaN or infinite
    /// - `Error::InvalidParameter` if `sample_rate` is zero
    pub fn new(samples: Array1<f64>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyWaveform);
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteSample { index });
        }
        if sample_rate == 0 {
            return Err(Error::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a Waveform by copying a slice of samples.
    pub fn from_slice(samples: &[f64], sample_rate: u32) -> Result<Self> {
        Self::new(Array1::from_vec(samples.to_vec()), sample_rate)
    }

    /// Synthesize a sine tone.
    ///
    /// Handy for calibration runs and tests:
    /// `amplitude * sin(2π * frequency * t)` for `duration` seconds.
    pub fn tone(frequency: f64, duration: f64, sample_rate: u32, amplitude: f64) -> Result<Self> {
        let n = (duration * sample_rate as f64).round() as usize;
        let samples = Array1::from_iter((0..n).map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin()
        }));
        Self::new(samples, sample_rate)
    }

    /// Load a WAV file at its native sample rate, mixing down to mono.
    ///
    /// Multi-channel files are averaged sample-by-sample across channels.
    ///
    /// # Errors
    ///
    /// - `Error::AudioRead` if the file cannot be opened or decoded
    /// - `Error::Decode` if the file holds no samples
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let n_channels = spec.channels as usize;
        if n_channels == 0 {
            return Err(Error::Decode("WAV header declares zero channels".to_string()));
        }

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<std::result::Result<Vec<f64>, _>>()?,
            hound::SampleFormat::Int => {
                // max_val = 2^(bits-1), e.g. 32768 for 16-bit audio
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / max_val))
                    .collect::<std::result::Result<Vec<f64>, _>>()?
            }
        };

        if interleaved.len() < n_channels {
            return Err(Error::Decode(format!(
                "{} contains no audio frames",
                path.as_ref().display()
            )));
        }

        let samples: Vec<f64> = if n_channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(n_channels)
                .map(|frame| frame.iter().sum::<f64>() / n_channels as f64)
                .collect()
        };

        tracing::debug!(
            path = %path.as_ref().display(),
            channels = n_channels,
            sample_rate = spec.sample_rate,
            n_samples = samples.len(),
            "decoded wav"
        );

        Self::new(Array1::from_vec(samples), spec.sample_rate)
    }

    /// Load a WAV file as mono at `target_rate` Hz.
    ///
    /// This is the audio source used by the detection pipeline.
    pub fn load<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<Self> {
        Self::from_file(path)?.resample(target_rate)
    }

    /// Resample to a different rate.
    ///
    /// Returns a clone when the rate already matches.
    pub fn resample(&self, target_rate: u32) -> Result<Self> {
        if target_rate == 0 {
            return Err(Error::InvalidParameter(
                "target sample rate must be positive".to_string(),
            ));
        }
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }
        let resampled = resample(self.as_slice(), self.sample_rate, target_rate)?;
        if resampled.is_empty() {
            return Err(Error::Decode(format!(
                "audio too short to resample from {} Hz to {} Hz",
                self.sample_rate, target_rate
            )));
        }
        Self::new(Array1::from_vec(resampled), target_rate)
    }

    /// Get the audio samples.
    #[inline]
    pub fn samples(&self) -> &Array1<f64> {
        &self.samples
    }

    /// Samples as a contiguous slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        // Constructed from owned Vecs only, so always contiguous.
        self.samples
            .as_slice()
            .unwrap_or_else(|| unreachable!("waveform samples are contiguous"))
    }

    /// Get the sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()))
    }

    /// Whether the peak amplitude is below `floor`.
    #[inline]
    pub fn is_silent(&self, floor: f64) -> bool {
        self.peak() <= floor
    }

    /// Divide every sample by the peak amplitude.
    ///
    /// # Errors
    ///
    /// `Error::SilentInput` if the peak is at or below `floor`.
    pub fn normalized(&self, floor: f64) -> Result<Self> {
        let peak = self.peak();
        if peak <= floor {
            return Err(Error::SilentInput { peak });
        }
        Ok(Self {
            samples: self.samples.mapv(|v| v / peak),
            sample_rate: self.sample_rate,
        })
    }

    // ========== Analysis Methods ==========
    //
    // Convenience wrappers around the extractor modules.

    /// Apply first-order pre-emphasis, `y[i] = x[i] - alpha * x[i-1]`.
    pub fn pre_emphasis(&self, alpha: f64) -> Self {
        let emphasized = crate::emphasis::pre_emphasize_nonempty(self.as_slice(), alpha);
        Self {
            samples: Array1::from_vec(emphasized),
            sample_rate: self.sample_rate,
        }
    }

    /// Estimate up to three formants from the samples as they are.
    ///
    /// No pre-emphasis is applied here; see [`Waveform::to_glottal_features`]
    /// for the full chain.
    pub fn to_formants(&self, lpc_order: usize) -> Result<FormantSet> {
        crate::formant::estimate_formants(self.as_slice(), self.sample_rate, lpc_order)
    }

    /// Compute jitter, shimmer, HNR and formants.
    pub fn to_glottal_features(&self, config: &FeatureConfig) -> Result<GlottalFeatures> {
        crate::glottal::extract_glottal_features(self, config)
    }

    /// Compute the fixed-width mel spectrogram in dB.
    pub fn to_mel_spectrogram(&self, config: &FeatureConfig) -> Result<MelSpectrogram> {
        crate::mel::mel_spectrogram_db(self, config)
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Waveform({} samples, {} Hz, {:.3}s)",
            self.n_samples(),
            self.sample_rate,
            self.duration()
        )
    }
}

/// Resample audio with rubato's FFT resampler.
///
/// The resampler's group delay is trimmed from the front and the input is
/// flushed with silence so the output covers the whole signal.
fn resample(samples: &[f64], old_rate: u32, new_rate: u32) -> Result<Vec<f64>> {
    let ratio = new_rate as f64 / old_rate as f64;
    let new_length = (samples.len() as f64 * ratio).round() as usize;
    if new_length == 0 {
        return Ok(Vec::new());
    }

    let chunk_size = 1024.min(samples.len()).max(1);

    let mut resampler = match FftFixedIn::<f64>::new(
        old_rate as usize,
        new_rate as usize,
        chunk_size,
        2, // sub-chunks
        1, // channels
    ) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, old_rate, new_rate, "rubato unavailable, using linear resampling");
            return Ok(linear_resample(samples, new_length));
        }
    };

    let delay = resampler.output_delay();
    let wanted = delay + new_length;
    let mut output = Vec::with_capacity(wanted + chunk_size);
    let mut pos = 0;

    while output.len() < wanted {
        let mut chunk = vec![0.0; chunk_size];
        if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::ResampleError(e.to_string()))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
        pos += chunk_size;
    }

    Ok(output.into_iter().skip(delay).take(new_length).collect())
}

/// Linear interpolation fallback.
fn linear_resample(samples: &[f64], new_length: usize) -> Vec<f64> {
    if samples.is_empty() || new_length == 0 {
        return Vec::new();
    }

    let ratio = (samples.len() - 1) as f64 / (new_length - 1).max(1) as f64;
    (0..new_length)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            if idx >= samples.len() - 1 {
                samples[samples.len() - 1]
            } else {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_slice() {
        let w = Waveform::from_slice(&[0.0, 0.5, 1.0, 0.5, 0.0], 16000).unwrap();
        assert_eq!(w.sample_rate(), 16000);
        assert_eq!(w.n_samples(), 5);
        assert_relative_eq!(w.duration(), 5.0 / 16000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(
            Waveform::from_slice(&[], 16000),
            Err(Error::EmptyWaveform)
        ));
        assert!(matches!(
            Waveform::from_slice(&[0.1, f64::NAN, 0.2], 16000),
            Err(Error::NonFiniteSample { index: 1 })
        ));
        assert!(matches!(
            Waveform::from_slice(&[0.1, f64::INFINITY], 16000),
            Err(Error::NonFiniteSample { index: 1 })
        ));
        assert!(Waveform::from_slice(&[0.1], 0).is_err());
    }

    #[test]
    fn test_tone() {
        let w = Waveform::tone(440.0, 0.01, 16000, 0.8).unwrap();
        assert_eq!(w.n_samples(), 160);
        assert_relative_eq!(w.samples()[0], 0.0, epsilon = 1e-12);
        assert!(w.peak() <= 0.8 + 1e-12);
    }

    #[test]
    fn test_normalized_peak_is_one() {
        let w = Waveform::from_slice(&[0.1, -0.4, 0.2], 8000).unwrap();
        let n = w.normalized(1e-10).unwrap();
        assert_relative_eq!(n.peak(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n.samples()[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_silence_fails() {
        let w = Waveform::from_slice(&[0.0; 32], 8000).unwrap();
        assert!(w.is_silent(1e-10));
        assert!(matches!(w.normalized(1e-10), Err(Error::SilentInput { .. })));
    }

    #[test]
    fn test_resample_doubles_length() {
        let w = Waveform::tone(200.0, 0.5, 8000, 0.5).unwrap();
        let up = w.resample(16000).unwrap();
        assert_eq!(up.sample_rate(), 16000);
        assert_eq!(up.n_samples(), 8000);
        // Energy is preserved by band-limited resampling of an in-band tone.
        let rms = |x: &Waveform| {
            (x.samples().iter().map(|v| v * v).sum::<f64>() / x.n_samples() as f64).sqrt()
        };
        assert_relative_eq!(rms(&up), rms(&w), epsilon = 0.05);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let w = Waveform::tone(200.0, 0.1, 16000, 0.5).unwrap();
        let same = w.resample(16000).unwrap();
        assert_eq!(same.samples(), w.samples());
    }

    #[test]
    fn test_linear_resample_endpoints() {
        let out = linear_resample(&[0.0, 1.0, 2.0], 5);
        assert_eq!(out.len(), 5);
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[2], 1.0);
        assert_relative_eq!(out[4], 2.0);
    }
}
