//! Feature assembly - the fixed-width vector handed to the classifier.
//!
//! ```text
//! spectrogram / max|spectrogram|  → flatten (band by band)
//!   ++ [jitter, shimmer, hnr, f1, f2, f3]
//!   → zero-pad at the end or truncate from the end to the classifier width
//! ```
//!
//! The classifier's input width is fixed by its training, so the
//! padding/truncation semantics here must not change.

use crate::error::{Error, Result};
use crate::glottal::GlottalFeatures;
use crate::mel::MelSpectrogram;

/// Spectrogram values divided by their largest magnitude, flattened
/// row-major. An all-zero spectrogram is flattened unchanged.
pub fn normalized_flat(spectrogram: &MelSpectrogram) -> Vec<f64> {
    let max_abs = spectrogram.max_abs();
    let scale = if max_abs > 0.0 { 1.0 / max_abs } else { 1.0 };
    spectrogram.values().iter().map(|&v| v * scale).collect()
}

/// Zero-pad at the end or truncate from the end to exactly `width`.
pub fn fit_length(mut features: Vec<f64>, width: usize) -> Vec<f64> {
    features.resize(width, 0.0);
    features
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 {
        return Err(Error::ShapeMismatch {
            expected: "classifier input width > 0".to_string(),
            got: "0".to_string(),
        });
    }
    Ok(())
}

fn check_finite(features: Vec<f64>) -> Result<Vec<f64>> {
    if features.iter().all(|v| v.is_finite()) {
        Ok(features)
    } else {
        Err(Error::NonFiniteFeature { name: "combined" })
    }
}

/// Build the classifier input from both feature families.
///
/// # Errors
///
/// - `Error::ShapeMismatch` if `target_width` is zero
/// - `Error::NonFiniteFeature` if any value is NaN or infinite
pub fn combine(
    spectrogram: &MelSpectrogram,
    glottal: &GlottalFeatures,
    target_width: usize,
) -> Result<Vec<f64>> {
    check_width(target_width)?;
    let mut features = normalized_flat(spectrogram);
    features.extend_from_slice(&glottal.to_vector());
    check_finite(fit_length(features, target_width))
}

/// Build the classifier input from the spectrogram alone.
///
/// Used for short streaming chunks where glottal statistics are not
/// computed.
pub fn spectral_only(spectrogram: &MelSpectrogram, target_width: usize) -> Result<Vec<f64>> {
    check_width(target_width)?;
    check_finite(fit_length(normalized_flat(spectrogram), target_width))
}
