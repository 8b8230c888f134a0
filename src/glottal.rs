//! Glottal - jitter, shimmer and harmonics-to-noise proxies plus formants.
//!
//! These are cheap time-domain surrogates, not the pitch-period based
//! measures of a full voice-quality analysis:
//!
//! ```text
//! e       = pre_emphasis(x / max|x|)
//! jitter  = std(diff(e)) / (mean(e) + ε)
//! shimmer = std(e) / (mean(e) + ε)
//! hnr     = 10 × log₁₀(mean(e²) / (var(e) + ε))
//! ```
//!
//! All statistics are population statistics (divide by N). ε = 1e-5 guards
//! every division. Formants come from LPC analysis of `e`.
//!
//! # Silence
//!
//! A waveform whose peak is at or below the configured silence floor cannot
//! be normalized and is rejected with `Error::SilentInput`.
//!
//! # Singular LPC systems
//!
//! A rank-deficient autocorrelation matrix does not abort extraction: the
//! formant set is left empty (zero-filled in the feature vector) and a
//! warning is logged.

use serde::Serialize;

use crate::emphasis::pre_emphasize_nonempty;
use crate::error::{Error, Result};
use crate::formant::{estimate_formants, FormantSet, MAX_FORMANTS};
use crate::waveform::Waveform;
use crate::FeatureConfig;

/// Length of [`GlottalFeatures::to_vector`].
pub const GLOTTAL_VECTOR_LEN: usize = 3 + MAX_FORMANTS;

/// Glottal proxy statistics for one waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct GlottalFeatures {
    /// Sample-to-sample variability relative to the mean.
    pub jitter: f64,
    /// Amplitude variability relative to the mean.
    pub shimmer: f64,
    /// Energy-to-variance ratio in dB.
    pub hnr: f64,
    /// Lowest LPC resonances.
    pub formants: FormantSet,
}

/// Serializable view of [`GlottalFeatures`] for reports.
#[derive(Debug, Clone, Serialize)]
pub struct GlottalSummary {
    /// See [`GlottalFeatures::jitter`].
    pub jitter: f64,
    /// See [`GlottalFeatures::shimmer`].
    pub shimmer: f64,
    /// Harmonics-to-noise proxy in dB.
    pub hnr: f64,
    /// Formant frequencies found (Hz), ascending, at most three.
    pub formants: Vec<f64>,
}

impl GlottalFeatures {
    /// `[jitter, shimmer, hnr, f1, f2, f3]`, missing formants as 0.0.
    pub fn to_vector(&self) -> [f64; GLOTTAL_VECTOR_LEN] {
        let [f1, f2, f3] = self.formants.padded();
        [self.jitter, self.shimmer, self.hnr, f1, f2, f3]
    }

    /// Report form with the formants that were actually found.
    pub fn summary(&self) -> GlottalSummary {
        GlottalSummary {
            jitter: self.jitter,
            shimmer: self.shimmer,
            hnr: self.hnr,
            formants: self.formants.frequencies().to_vec(),
        }
    }
}

fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Population variance (ddof = 0). Zero for fewer than one sample.
fn variance(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / x.len() as f64
}

fn std_dev(x: &[f64]) -> f64 {
    variance(x).sqrt()
}

fn finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NonFiniteFeature { name })
    }
}

/// Compute the glottal feature set of a waveform.
///
/// # Errors
///
/// - `Error::SilentInput` if the waveform is silent
/// - `Error::NonFiniteFeature` if a statistic is not finite after the ε guard
pub fn extract_glottal_features(waveform: &Waveform, config: &FeatureConfig) -> Result<GlottalFeatures> {
    let normalized = waveform.normalized(config.silence_floor)?;
    let emphasized = pre_emphasize_nonempty(normalized.as_slice(), config.pre_emphasis);
    let eps = config.epsilon;

    let diffs: Vec<f64> = emphasized.windows(2).map(|w| w[1] - w[0]).collect();
    let mu = mean(&emphasized);
    let denom = mu + eps;

    let jitter = finite("jitter", std_dev(&diffs) / denom)?;
    let shimmer = finite("shimmer", std_dev(&emphasized) / denom)?;

    let power = emphasized.iter().map(|v| v * v).sum::<f64>() / emphasized.len() as f64;
    let hnr = finite("hnr", 10.0 * (power / (variance(&emphasized) + eps)).log10())?;

    let formants = match estimate_formants(&emphasized, waveform.sample_rate(), config.lpc_order) {
        Ok(set) => set,
        Err(Error::SingularSystem(reason)) => {
            tracing::warn!(%reason, "LPC system singular, continuing without formants");
            FormantSet::empty()
        }
        Err(e) => return Err(e),
    };

    tracing::debug!(jitter, shimmer, hnr, formants = ?formants.frequencies(), "glottal features");

    Ok(GlottalFeatures {
        jitter,
        shimmer,
        hnr,
        formants,
    })
}
