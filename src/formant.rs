//! Formant - resonance frequencies from LPC polynomial roots.
//!
//! Documentation sources:
//! - Markel & Gray (1976): root-to-formant conversion
//!
//! Key facts:
//! - Roots of a real polynomial come in conjugate pairs; only the upper
//!   half-plane (im >= 0) is kept
//! - Frequency = arg(z) × sample_rate / (2π), always within [0, Nyquist]
//! - The lowest three frequencies form the formant set

use num_complex::Complex64;

use crate::error::Result;
use crate::lpc::lpc_coefficients;

/// Number of formant slots in a feature vector.
pub const MAX_FORMANTS: usize = 3;

/// Up to three formant frequencies in Hz, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormantSet {
    frequencies: Vec<f64>,
}

impl FormantSet {
    /// An empty set, used when no formants could be estimated.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary frequencies: sorted ascending and
    /// truncated to [`MAX_FORMANTS`].
    pub fn from_frequencies(mut frequencies: Vec<f64>) -> Self {
        frequencies.retain(|f| f.is_finite());
        frequencies.sort_by(f64::total_cmp);
        frequencies.truncate(MAX_FORMANTS);
        Self { frequencies }
    }

    /// The estimated frequencies.
    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Number of formants found.
    #[inline]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Whether no formant was found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Get formant n (1-based index).
    pub fn get(&self, n: usize) -> Option<f64> {
        if n >= 1 {
            self.frequencies.get(n - 1).copied()
        } else {
            None
        }
    }

    /// Exactly [`MAX_FORMANTS`] slots, missing formants as 0.0.
    pub fn padded(&self) -> [f64; MAX_FORMANTS] {
        let mut slots = [0.0; MAX_FORMANTS];
        for (slot, &f) in slots.iter_mut().zip(&self.frequencies) {
            *slot = f;
        }
        slots
    }
}

/// Convert complex roots to frequencies in Hz.
///
/// For a root z = r * exp(i*theta) with theta in [0, π]:
/// frequency = theta * sample_rate / (2*pi)
///
/// Lower half-plane roots are dropped. Real roots map to 0 Hz (positive)
/// or Nyquist (negative).
pub fn roots_to_frequencies(roots: &[Complex64], sample_rate: u32) -> Vec<f64> {
    let mut freqs: Vec<f64> = roots
        .iter()
        .filter(|root| root.is_finite() && root.im >= 0.0)
        // |im| keeps a signed zero from turning into -π
        .map(|root| root.im.abs().atan2(root.re))
        .map(|theta| theta * sample_rate as f64 / (2.0 * std::f64::consts::PI))
        .collect();

    freqs.sort_by(f64::total_cmp);
    freqs
}

/// Estimate formants with LPC analysis.
///
/// Algorithm steps:
/// 1. Autocorrelation of the signal, lags 0..=order
/// 2. Solve the Toeplitz normal equations for the predictor
/// 3. Find all roots of `[1, a₁, …, a_order]`
/// 4. Keep upper half-plane roots and map their angles to Hz
/// 5. Return the lowest three
///
/// The signal is used as given; callers apply pre-emphasis first.
///
/// # Errors
///
/// `Error::SingularSystem` for rank-deficient input (e.g. silence).
pub fn estimate_formants(signal: &[f64], sample_rate: u32, order: usize) -> Result<FormantSet> {
    let lpc = lpc_coefficients(signal, order)?;
    let roots = lpc.roots();
    let mut freqs = roots_to_frequencies(&roots, sample_rate);
    freqs.truncate(MAX_FORMANTS);

    tracing::trace!(order, n_roots = roots.len(), formants = ?freqs, "lpc formants");

    Ok(FormantSet { frequencies: freqs })
}
