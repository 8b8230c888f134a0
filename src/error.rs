//! Error types for vocalcheck.
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//!
//! Failures inside a single waveform's feature extraction are either
//! recovered locally (a singular LPC system degrades the formant set) or
//! surfaced as a named variant. Nothing in this crate lets NaN or Inf leak
//! into a feature vector silently.

use thiserror::Error;

/// Result type alias using vocalcheck's Error type.
///
/// # Example
///
/// ```no_run
/// use vocalcheck::{Result, Waveform};
///
/// fn load(path: &str) -> Result<Waveform> {
///     Waveform::load(path, 16000)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during loading, feature extraction and detection.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading a WAV file.
    ///
    /// Wraps errors from the `hound` WAV library (missing file, bad header,
    /// truncated data).
    #[error("Failed to read audio file: {0}")]
    AudioRead(#[from] hound::Error),

    /// General I/O error not specific to WAV decoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio decoded but is unusable (zero length, zero channels).
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Resampling to the target rate failed.
    #[error("Resampling failed: {0}")]
    ResampleError(String),

    /// A waveform must contain at least one sample.
    #[error("Waveform is empty")]
    EmptyWaveform,

    /// A waveform sample is NaN or infinite.
    #[error("Waveform sample {index} is not finite")]
    NonFiniteSample {
        /// Index of the first offending sample.
        index: usize,
    },

    /// The waveform's peak amplitude is below the silence floor.
    ///
    /// Normalization and the glottal ratios are undefined for silence, so
    /// extraction fails fast instead of producing a degenerate vector.
    #[error("Waveform is silent (peak amplitude {peak:e})")]
    SilentInput {
        /// Peak absolute amplitude that was found.
        peak: f64,
    },

    /// The LPC Toeplitz system could not be solved.
    ///
    /// Raised for rank-deficient autocorrelation matrices (constant or
    /// near-zero signals). Glottal extraction recovers from this by
    /// reporting no formants.
    #[error("Singular LPC system: {0}")]
    SingularSystem(String),

    /// A shape or width does not match what the caller configured.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Expected shape or width description.
        expected: String,
        /// Actual shape or width description.
        got: String,
    },

    /// A computed feature is NaN or infinite despite the epsilon guards.
    #[error("Feature '{name}' is not finite")]
    NonFiniteFeature {
        /// Name of the feature.
        name: &'static str,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The injected classifier failed.
    #[error("Classifier error: {0}")]
    Classifier(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
