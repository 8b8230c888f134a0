//! Feature extraction configuration.
//!
//! The defaults are the constants the downstream classifier was trained
//! with. Framing parameters of the mel spectrogram are held constant here
//! rather than derived from the input, so extraction is deterministic.
//!
//! # Loading
//!
//! ```no_run
//! use vocalcheck::FeatureConfig;
//!
//! // Missing fields fall back to the defaults.
//! let config = FeatureConfig::from_json_str(r#"{ "target_width": 64 }"#).unwrap();
//! assert_eq!(config.n_mels, 128);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sample rate every waveform is resampled to before extraction (Hz).
pub const SAMPLE_RATE: u32 = 16000;
/// Number of mel bands.
pub const N_MELS: usize = 128;
/// Upper frequency of the mel filterbank (Hz).
pub const FMAX: f64 = 8000.0;
/// Spectrogram time-axis width after padding/truncation (frames).
pub const TARGET_WIDTH: usize = 128;
/// LPC model order.
pub const LPC_ORDER: usize = 16;
/// First-order pre-emphasis coefficient.
pub const PRE_EMPHASIS: f64 = 0.97;
/// Additive guard for every ratio in the glottal statistics.
pub const EPSILON: f64 = 1e-5;
/// FFT size of the STFT.
pub const N_FFT: usize = 2048;
/// Hop between STFT frames (samples).
pub const HOP_LENGTH: usize = 512;
/// Amplitude floor for dB conversion.
pub const AMIN: f64 = 1e-5;
/// Dynamic range kept below the peak (dB).
pub const TOP_DB: f64 = 80.0;
/// Peak amplitudes below this are treated as silence.
pub const SILENCE_FLOOR: f64 = 1e-10;

/// Parameters of the feature-extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Target sample rate for loaded audio (Hz).
    pub sample_rate: u32,
    /// Number of mel bands.
    pub n_mels: usize,
    /// Lower mel filterbank edge (Hz).
    pub fmin: f64,
    /// Upper mel filterbank edge (Hz).
    pub fmax: f64,
    /// Spectrogram width in frames.
    pub target_width: usize,
    /// STFT size.
    pub n_fft: usize,
    /// STFT hop.
    pub hop_length: usize,
    /// Amplitude floor used by the dB conversion.
    pub amin: f64,
    /// Dynamic range below the clip's peak (dB). Also the padding value.
    pub top_db: f64,
    /// LPC order.
    pub lpc_order: usize,
    /// Pre-emphasis coefficient.
    pub pre_emphasis: f64,
    /// Division guard.
    pub epsilon: f64,
    /// Silence detection threshold on peak amplitude.
    pub silence_floor: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            n_mels: N_MELS,
            fmin: 0.0,
            fmax: FMAX,
            target_width: TARGET_WIDTH,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            amin: AMIN,
            top_db: TOP_DB,
            lpc_order: LPC_ORDER,
            pre_emphasis: PRE_EMPHASIS,
            epsilon: EPSILON,
            silence_floor: SILENCE_FLOOR,
        }
    }
}

impl FeatureConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The dB value used for padded spectrogram frames.
    #[inline]
    pub fn silence_floor_db(&self) -> f64 {
        -self.top_db
    }

    /// Check that every parameter is usable.
    ///
    /// A zero target width is a shape error rather than a plain parameter
    /// error, since it can never produce a valid spectrogram frame.
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(Error::ShapeMismatch {
                expected: "target_width > 0".to_string(),
                got: "0".to_string(),
            });
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.n_mels == 0 {
            return Err(Error::Config("n_mels must be positive".to_string()));
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return Err(Error::Config(format!(
                "invalid STFT framing: n_fft={}, hop_length={}",
                self.n_fft, self.hop_length
            )));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.fmin >= 0.0 && self.fmin < self.fmax && self.fmax <= nyquist) {
            return Err(Error::Config(format!(
                "mel range must satisfy 0 <= fmin < fmax <= {nyquist}, got [{}, {}]",
                self.fmin, self.fmax
            )));
        }
        if self.lpc_order == 0 {
            return Err(Error::Config("lpc_order must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.pre_emphasis) {
            return Err(Error::Config(format!(
                "pre_emphasis must be in [0, 1), got {}",
                self.pre_emphasis
            )));
        }
        if self.epsilon <= 0.0 || self.amin <= 0.0 || self.top_db <= 0.0 {
            return Err(Error::Config(
                "epsilon, amin and top_db must be positive".to_string(),
            ));
        }
        if self.silence_floor < 0.0 {
            return Err(Error::Config("silence_floor must be non-negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = FeatureConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.n_mels, 128);
        assert_eq!(config.target_width, 128);
        assert_eq!(config.lpc_order, 16);
        assert_eq!(config.pre_emphasis, 0.97);
        assert_eq!(config.epsilon, 1e-5);
        assert_eq!(config.silence_floor_db(), -80.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FeatureConfig::from_json_str(r#"{ "n_mels": 64, "fmax": 4000.0 }"#).unwrap();
        assert_eq!(config.n_mels, 64);
        assert_eq!(config.fmax, 4000.0);
        assert_eq!(config.target_width, TARGET_WIDTH);
        assert_eq!(config.hop_length, HOP_LENGTH);
    }

    #[test]
    fn test_zero_width_is_shape_mismatch() {
        let err = FeatureConfig::from_json_str(r#"{ "target_width": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_fmax_above_nyquist_rejected() {
        let config = FeatureConfig {
            fmax: 9000.0,
            ..FeatureConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = FeatureConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
