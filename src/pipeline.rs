//! End-to-end extraction and detection.
//!
//! [`FeatureExtractor`] turns one waveform into its mel spectrogram and
//! glottal features. [`Detector`] adds the classifier boundary: assembly,
//! scaling, prediction and a serializable report.
//!
//! Both are stateless across calls and `Send + Sync`, so one instance can
//! serve any number of threads. [`FeatureExtractor::extract_batch`] runs on
//! rayon's thread pool.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::assembler;
use crate::classifier::{Classifier, Label, StandardScaler};
use crate::error::{Error, Result};
use crate::glottal::{extract_glottal_features, GlottalFeatures, GlottalSummary};
use crate::mel::{mel_spectrogram_db, MelSpectrogram};
use crate::waveform::Waveform;
use crate::FeatureConfig;

/// Everything extracted from one waveform.
#[derive(Debug, Clone)]
pub struct Features {
    /// Fixed-width mel spectrogram (dB).
    pub spectrogram: MelSpectrogram,
    /// Jitter, shimmer, HNR and formants.
    pub glottal: GlottalFeatures,
    /// Duration of the analyzed audio in seconds.
    pub duration: f64,
}

impl Features {
    /// The combined classifier input of the given width.
    pub fn to_vector(&self, target_width: usize) -> Result<Vec<f64>> {
        assembler::combine(&self.spectrogram, &self.glottal, target_width)
    }
}

/// Feature extraction with a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            config: FeatureConfig::default(),
        }
    }
}

impl FeatureExtractor {
    /// Create an extractor; the configuration is validated once here.
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract features from a waveform.
    ///
    /// Waveforms at another rate are resampled to the configured rate
    /// first.
    ///
    /// # Errors
    ///
    /// `Error::SilentInput` for silent audio; no partial result is produced.
    pub fn extract(&self, waveform: &Waveform) -> Result<Features> {
        let start = Instant::now();

        let resampled;
        let waveform = if waveform.sample_rate() == self.config.sample_rate {
            waveform
        } else {
            tracing::debug!(
                from = waveform.sample_rate(),
                to = self.config.sample_rate,
                "resampling before extraction"
            );
            resampled = waveform.resample(self.config.sample_rate)?;
            &resampled
        };

        let peak = waveform.peak();
        if peak <= self.config.silence_floor {
            return Err(Error::SilentInput { peak });
        }

        let spectrogram = mel_spectrogram_db(waveform, &self.config)?;
        let glottal = extract_glottal_features(waveform, &self.config)?;

        tracing::debug!(
            duration = waveform.duration(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "features extracted"
        );

        Ok(Features {
            spectrogram,
            glottal,
            duration: waveform.duration(),
        })
    }

    /// Load a WAV file at the configured rate and extract its features.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Features> {
        let waveform = Waveform::load(path, self.config.sample_rate)?;
        self.extract(&waveform)
    }

    /// Extract features from many files in parallel.
    ///
    /// Files are spread over rayon's global thread pool. Results are
    /// returned in input order; a failing file does not affect the others.
    pub fn extract_batch<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<Result<Features>> {
        use rayon::prelude::*;

        tracing::debug!(files = paths.len(), "batch extraction");

        paths.par_iter().map(|p| self.extract_file(p)).collect()
    }
}

/// Result of classifying one recording.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// Argmax class.
    pub label: Label,
    /// Class probabilities as returned by the classifier, index 0 = real.
    pub confidence: Vec<f64>,
    /// Glottal statistics and the formants actually found.
    pub glottal: GlottalSummary,
    /// Length of the analyzed audio in seconds.
    pub duration_seconds: f64,
}

/// Result of classifying a short streaming chunk (spectral features only).
#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    /// Argmax class.
    pub label: Label,
    /// Class probabilities, index 0 = real.
    pub confidence: Vec<f64>,
}

/// Extraction plus the injected scaler and classifier.
pub struct Detector<C> {
    extractor: FeatureExtractor,
    scaler: StandardScaler,
    classifier: C,
}

impl<C: Classifier> Detector<C> {
    /// Wire an extractor to a fitted scaler and classifier.
    ///
    /// # Errors
    ///
    /// `Error::ShapeMismatch` if the scaler and classifier disagree on the
    /// input width, or the width is zero.
    pub fn new(extractor: FeatureExtractor, scaler: StandardScaler, classifier: C) -> Result<Self> {
        let width = classifier.input_width();
        if width == 0 || scaler.len() != width {
            return Err(Error::ShapeMismatch {
                expected: format!("scaler of width {width}"),
                got: scaler.len().to_string(),
            });
        }
        Ok(Self {
            extractor,
            scaler,
            classifier,
        })
    }

    /// The feature extractor in use.
    #[inline]
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    fn classify(&self, features: &[f64]) -> Result<(Label, Vec<f64>)> {
        let scaled = self.scaler.transform(features)?;
        let confidence = self.classifier.predict(&scaled)?;
        let label = Label::from_probabilities(&confidence)?;
        Ok((label, confidence))
    }

    /// Classify a waveform.
    pub fn detect(&self, waveform: &Waveform) -> Result<DetectionReport> {
        let features = self.extractor.extract(waveform)?;
        let vector = features.to_vector(self.classifier.input_width())?;
        let (label, confidence) = self.classify(&vector)?;

        tracing::info!(%label, duration = features.duration, "detection finished");

        Ok(DetectionReport {
            label,
            confidence,
            glottal: features.glottal.summary(),
            duration_seconds: features.duration,
        })
    }

    /// Load a WAV file and classify it.
    pub fn detect_file<P: AsRef<Path>>(&self, path: P) -> Result<DetectionReport> {
        let waveform = Waveform::load(path, self.extractor.config().sample_rate)?;
        self.detect(&waveform)
    }

    /// Classify a streaming chunk from its spectrogram alone.
    ///
    /// # Errors
    ///
    /// `Error::SilentInput` for a silent chunk, as with [`Detector::detect`].
    pub fn detect_chunk(&self, waveform: &Waveform) -> Result<ChunkReport> {
        let config = self.extractor.config();
        let peak = waveform.peak();
        if peak <= config.silence_floor {
            return Err(Error::SilentInput { peak });
        }
        let waveform = waveform.resample(config.sample_rate)?;
        let spectrogram = mel_spectrogram_db(&waveform, config)?;
        let vector = assembler::spectral_only(&spectrogram, self.classifier.input_width())?;
        let (label, confidence) = self.classify(&vector)?;

        tracing::debug!(%label, "chunk classified");

        Ok(ChunkReport { label, confidence })
    }
}
