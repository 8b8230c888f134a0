//! First-order pre-emphasis.
//!
//! ```text
//! y[0] = x[0]
//! y[i] = x[i] - α × x[i-1]
//! ```
//!
//! Voiced speech falls off at roughly -6 dB/octave. Pre-emphasis flattens
//! that tilt so LPC analysis and the glottal statistics are not dominated
//! by low-frequency energy.

use crate::error::{Error, Result};

/// Apply pre-emphasis to a signal.
///
/// The output has the same length as the input and `output[0] == input[0]`.
///
/// # Errors
///
/// `Error::EmptyWaveform` if `samples` is empty.
pub fn pre_emphasize(samples: &[f64], alpha: f64) -> Result<Vec<f64>> {
    if samples.is_empty() {
        return Err(Error::EmptyWaveform);
    }
    Ok(pre_emphasize_nonempty(samples, alpha))
}

/// Pre-emphasis for callers that already guarantee a non-empty signal.
pub(crate) fn pre_emphasize_nonempty(samples: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(samples.len());
    if let Some(&first) = samples.first() {
        out.push(first);
        out.extend(samples.windows(2).map(|w| w[1] - alpha * w[0]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_sample_and_length_preserved() {
        let x: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin() + 0.3).collect();
        let y = pre_emphasize(&x, 0.97).unwrap();
        assert_eq!(y.len(), x.len());
        assert_eq!(y[0], x[0]);
    }

    #[test]
    fn test_difference_equation() {
        let y = pre_emphasize(&[1.0, 2.0, 4.0], 0.5).unwrap();
        assert_relative_eq!(y[1], 1.5);
        assert_relative_eq!(y[2], 3.0);
    }

    #[test]
    fn test_constant_signal_is_attenuated() {
        let y = pre_emphasize(&[1.0; 10], 0.97).unwrap();
        for &v in &y[1..] {
            assert_relative_eq!(v, 0.03, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(pre_emphasize(&[0.25], 0.97).unwrap(), vec![0.25]);
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(pre_emphasize(&[], 0.97), Err(Error::EmptyWaveform)));
    }
}
