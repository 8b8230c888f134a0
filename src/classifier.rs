//! Classifier boundary: feature scaling and the injected model handle.
//!
//! The model itself is opaque to this crate. Callers load it once and pass
//! it in as a long-lived [`Classifier`] implementation together with the
//! [`StandardScaler`] fitted alongside it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A real/synthetic voice classifier.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use; a single handle is
/// shared by every worker.
pub trait Classifier: Send + Sync {
    /// Width of the feature vector the model expects.
    fn input_width(&self) -> usize;

    /// Class probabilities for one scaled feature vector.
    ///
    /// Index 0 is the "real" class.
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Per-feature standardization, `(x - mean) / scale`.
///
/// Serialized as `{ "mean": [...], "scale": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from fitted parameters.
    ///
    /// Zero (or non-finite) scale entries are replaced with 1.0, the
    /// convention for constant features.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} scale entries", mean.len()),
                got: scale.len().to_string(),
            });
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("scaler mean contains non-finite values".to_string()));
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    /// A scaler that leaves `width` features unchanged.
    pub fn identity(width: usize) -> Self {
        Self {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }

    /// Parse fitted parameters from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.mean, raw.scale)
    }

    /// Read fitted parameters from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of features this scaler was fitted on.
    #[inline]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Whether the scaler has no features.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Standardize one feature vector.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} features", self.len()),
                got: features.len().to_string(),
            });
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }
}

/// Predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Argmax over class probabilities; index 0 is `Real`.
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self> {
        let best = probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .ok_or_else(|| {
                Error::Classifier("classifier returned no finite probabilities".to_string())
            })?;
        Ok(if best == 0 { Label::Real } else { Label::Fake })
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Real => write!(f, "Real"),
            Label::Fake => write!(f, "Fake"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(vec![1.0, 2.0], vec![2.0, 0.5]).unwrap();
        let out = scaler.transform(&[3.0, 1.0]).unwrap();
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], -2.0);
    }

    #[test]
    fn test_zero_scale_is_identity() {
        let scaler = StandardScaler::new(vec![0.5], vec![0.0]).unwrap();
        assert_relative_eq!(scaler.transform(&[2.0]).unwrap()[0], 1.5);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            StandardScaler::new(vec![0.0; 3], vec![1.0; 2]),
            Err(Error::ShapeMismatch { .. })
        ));
        let scaler = StandardScaler::identity(3);
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_json() {
        let scaler = StandardScaler::from_json_str(r#"{ "mean": [0.0, 1.0], "scale": [1.0, 1.0] }"#).unwrap();
        assert_eq!(scaler.len(), 2);
        assert!(matches!(
            StandardScaler::from_json_str(r#"{ "mean": [0.0] }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_label_argmax() {
        assert_eq!(Label::from_probabilities(&[0.9, 0.1]).unwrap(), Label::Real);
        assert_eq!(Label::from_probabilities(&[0.2, 0.8]).unwrap(), Label::Fake);
        assert_eq!(Label::from_probabilities(&[0.7]).unwrap(), Label::Real);
        assert!(Label::from_probabilities(&[]).is_err());
        assert_eq!(Label::Fake.to_string(), "Fake");
    }
}
