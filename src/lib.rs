//! # vocalcheck
//!
//! Acoustic feature extraction for real/synthetic voice classification.
//!
//! The numerical core turns a short speech recording into two feature
//! families:
//!
//! - **Glottal proxies**: jitter, shimmer and a harmonics-to-noise ratio
//!   computed on the normalized, pre-emphasized signal, plus the three
//!   lowest LPC formants (autocorrelation method, order 16)
//! - **Mel spectrogram**: 128 Slaney mel bands up to 8 kHz, in dB relative
//!   to the clip's peak, padded or truncated to 128 frames
//!
//! Around the core sit thin boundary pieces: WAV loading with mixdown and
//! resampling, the fixed-width feature assembler, a standard scaler, and a
//! [`Classifier`] trait for the externally trained model.
//!
//! # Quick Start
//!
//! ```no_run
//! use vocalcheck::{FeatureExtractor, Waveform};
//!
//! let extractor = FeatureExtractor::default();
//! let waveform = Waveform::load("speech.wav", 16000).unwrap();
//! let features = extractor.extract(&waveform).unwrap();
//!
//! println!("jitter = {:.4}", features.glottal.jitter);
//! println!("formants = {:?}", features.glottal.formants.frequencies());
//! println!("spectrogram = {:?}", features.spectrogram.values().shape());
//! ```
//!
//! # Failure Policy
//!
//! - Silent input fails fast with [`Error::SilentInput`]
//! - A singular LPC system degrades to an empty formant set (zero-filled in
//!   the feature vector) and logs a warning
//! - A zero target width is an [`Error::ShapeMismatch`]
//! - NaN/Inf never reaches the classifier: [`Error::NonFiniteFeature`]

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod emphasis;
pub mod error;
pub mod formant;
pub mod glottal;
pub mod lpc;
pub mod mel;
pub mod pipeline;
pub mod waveform;

/// Error types for vocalcheck operations.
pub use error::{Error, Result};

/// Configuration and the constants the classifier was trained with.
pub use config::FeatureConfig;

/// Mono sample container and WAV loading.
pub use waveform::Waveform;

/// Pre-emphasis filter.
pub use emphasis::pre_emphasize;

/// LPC analysis.
///
/// - `LpcCoefficients`: `[1, a₁, …, a_p]`
/// - `lpc_coefficients`: autocorrelation + Toeplitz solve
/// - `polynomial_roots`: all complex roots of the LPC polynomial
pub use lpc::{autocorrelation, lpc_coefficients, polynomial_roots, LpcCoefficients};

/// Formant estimation.
pub use formant::{estimate_formants, FormantSet, MAX_FORMANTS};

/// Glottal proxy statistics.
pub use glottal::{extract_glottal_features, GlottalFeatures, GlottalSummary, GLOTTAL_VECTOR_LEN};

/// Mel spectrogram.
pub use mel::{mel_spectrogram_db, MelSpectrogram};

/// Classifier boundary.
pub use classifier::{Classifier, Label, StandardScaler};

/// End-to-end extraction and detection.
pub use pipeline::{ChunkReport, DetectionReport, Detector, FeatureExtractor, Features};
