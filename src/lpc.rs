//! Linear prediction by the autocorrelation method.
//!
//! Documentation sources:
//! - Makhoul (1975): "Linear Prediction: A Tutorial Review" (normal equations)
//! - Numerical Recipes Ch. 2.1 (Gaussian elimination with partial pivoting)
//! - Aberth (1973), Ehrlich (1967): simultaneous polynomial root iteration
//! - Numerical Recipes Ch. 9.5 (Newton polishing of roots)
//!
//! The prediction coefficients solve the normal equations
//!
//! ```text
//! R · a = -r[1..=p]        R[i][j] = r[|i - j|]
//! ```
//!
//! so that `A(z) = 1 + a₁z⁻¹ + … + a_p z⁻ᵖ` is the inverse filter of a stable
//! all-pole model. The roots of `zᵖ A(z)` then lie inside or near the unit
//! circle and their angles are the resonance frequencies.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};

/// Relative pivot size below which the normal equations count as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Maximum number of Aberth sweeps.
const MAX_ROOT_ITERATIONS: usize = 500;

/// LPC polynomial coefficients `[1, a₁, …, a_p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LpcCoefficients {
    coeffs: Vec<f64>,
}

impl LpcCoefficients {
    /// Wrap prediction coefficients `a₁…a_p`, prepending the leading 1.
    pub fn from_predictor(predictor: &[f64]) -> Self {
        let mut coeffs = Vec::with_capacity(predictor.len() + 1);
        coeffs.push(1.0);
        coeffs.extend_from_slice(predictor);
        Self { coeffs }
    }

    /// All `order + 1` coefficients, leading 1 included.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.coeffs
    }

    /// Model order `p`.
    #[inline]
    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Complex roots of `zᵖ + a₁zᵖ⁻¹ + … + a_p`.
    pub fn roots(&self) -> Vec<Complex64> {
        polynomial_roots(&self.coeffs)
    }
}

/// Non-negative lags `r[0..=max_lag]` of the full autocorrelation.
///
/// `r[k] = Σ x[n] x[n+k]`. Lags beyond the signal length are zero. This is
/// the right half of the two-sided correlation of the signal with itself,
/// computed only for the lags the model needs.
pub fn autocorrelation(signal: &[f64], max_lag: usize) -> Vec<f64> {
    let n = signal.len();
    (0..=max_lag)
        .map(|k| {
            if k >= n {
                0.0
            } else {
                signal[..n - k]
                    .iter()
                    .zip(&signal[k..])
                    .map(|(a, b)| a * b)
                    .sum()
            }
        })
        .collect()
}

/// Compute LPC coefficients of the given order.
///
/// # Errors
///
/// - `Error::InvalidParameter` if `order` is zero
/// - `Error::SingularSystem` if the autocorrelation matrix is rank-deficient
pub fn lpc_coefficients(signal: &[f64], order: usize) -> Result<LpcCoefficients> {
    if order == 0 {
        return Err(Error::InvalidParameter("LPC order must be positive".to_string()));
    }

    let r = autocorrelation(signal, order);
    if r[0] <= 0.0 || !r[0].is_finite() {
        return Err(Error::SingularSystem(format!(
            "zero-energy signal (r[0] = {})",
            r[0]
        )));
    }

    let matrix = Array2::from_shape_fn((order, order), |(i, j)| r[i.abs_diff(j)]);
    let rhs = Array1::from_iter(r[1..=order].iter().map(|&v| -v));
    let predictor = solve_linear(matrix, rhs, r[0] * SINGULAR_TOLERANCE)?;

    Ok(LpcCoefficients::from_predictor(&predictor.to_vec()))
}

/// Solve `A·x = b` by Gaussian elimination with partial pivoting.
///
/// A pivot whose magnitude does not exceed `tolerance` makes the system
/// singular.
fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>, tolerance: f64) -> Result<Array1<f64>> {
    let n = b.len();

    for col in 0..n {
        // Partial pivoting: bring the largest remaining entry to the diagonal
        let mut pivot_row = col;
        for row in col + 1..n {
            if a[[row, col]].abs() > a[[pivot_row, col]].abs() {
                pivot_row = row;
            }
        }
        let pivot = a[[pivot_row, col]];
        if pivot.abs() <= tolerance || !pivot.is_finite() {
            return Err(Error::SingularSystem(format!(
                "pivot {pivot:e} in column {col} below tolerance {tolerance:e}"
            )));
        }
        if pivot_row != col {
            for j in 0..n {
                a.swap([col, j], [pivot_row, j]);
            }
            b.swap(col, pivot_row);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for j in row + 1..n {
            sum -= a[[row, j]] * x[j];
        }
        x[row] = sum / a[[row, row]];
    }

    Ok(x)
}

/// Evaluate a monic polynomial and its derivative at z.
///
/// The polynomial is: P(z) = z^p + a[1]*z^{p-1} + ... + a[p]
fn eval_polynomial(a: &[f64], z: Complex64) -> (Complex64, Complex64) {
    // Horner's method
    let mut p_val = Complex64::new(1.0, 0.0);
    let mut dp_val = Complex64::new(0.0, 0.0);

    for &coeff in a.iter().skip(1) {
        dp_val = p_val + z * dp_val;
        p_val = p_val * z + coeff;
    }

    (p_val, dp_val)
}

/// Polish a root using Newton-Raphson iteration.
fn polish_root(a: &[f64], mut z: Complex64, max_iter: usize, tol: f64) -> Complex64 {
    for _ in 0..max_iter {
        let (p_val, dp_val) = eval_polynomial(a, z);

        if dp_val.norm() < 1e-30 {
            break;
        }

        let delta = p_val / dp_val;
        let candidate = z - delta;
        if !candidate.is_finite() {
            break;
        }
        z = candidate;

        if delta.norm() <= tol * z.norm().max(1.0) {
            break;
        }
    }

    z
}

/// Fujiwara's upper bound on the root magnitudes of a monic polynomial.
fn root_radius_bound(a: &[f64]) -> f64 {
    let p = a.len() - 1;
    let bound = a
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &c)| {
            let c = if i == p { c.abs() / 2.0 } else { c.abs() };
            c.powf(1.0 / i as f64)
        })
        .fold(0.0f64, f64::max);
    (2.0 * bound).max(1e-3)
}

/// Find all roots of a monic polynomial `[1, a₁, …, a_p]`.
///
/// Uses the Aberth–Ehrlich method from starting points spread on a circle
/// of radius given by Fujiwara's bound, then polishes each root with
/// Newton's method. Roots within a relative `1e-9` of the real axis are
/// snapped onto it, since the coefficients are real.
pub fn polynomial_roots(a: &[f64]) -> Vec<Complex64> {
    let order = a.len().saturating_sub(1);
    if order < 1 {
        return Vec::new();
    }
    if order == 1 {
        return vec![Complex64::new(-a[1], 0.0)];
    }

    let radius = root_radius_bound(a);
    // The angular offset keeps the starting set from being conjugate-symmetric.
    let mut roots: Vec<Complex64> = (0..order)
        .map(|k| {
            let theta = 2.0 * std::f64::consts::PI * k as f64 / order as f64 + 0.4;
            Complex64::from_polar(radius, theta)
        })
        .collect();

    for _ in 0..MAX_ROOT_ITERATIONS {
        let mut max_step = 0.0f64;

        for k in 0..order {
            let z = roots[k];
            let (p_val, dp_val) = eval_polynomial(a, z);
            if p_val.norm() == 0.0 {
                continue;
            }
            if dp_val.norm() < 1e-300 {
                // Stationary point: nudge off it and retry next sweep.
                roots[k] = z + Complex64::new(1e-6, 1e-6) * z.norm().max(1.0);
                max_step = f64::INFINITY;
                continue;
            }

            let newton = p_val / dp_val;
            let repulsion: Complex64 = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != k)
                .map(|(_, &other)| z - other)
                .filter(|d| d.norm() > 1e-300)
                .map(|d| d.inv())
                .sum();

            let denom = Complex64::new(1.0, 0.0) - newton * repulsion;
            let step = if denom.norm() > 1e-300 { newton / denom } else { newton };
            if !step.is_finite() {
                continue;
            }

            roots[k] = z - step;
            max_step = max_step.max(step.norm() / z.norm().max(1.0));
        }

        if max_step < 1e-14 {
            break;
        }
    }

    roots
        .into_iter()
        .map(|z| {
            let z = polish_root(a, z, 10, 1e-14);
            if z.im.abs() <= 1e-9 * z.norm().max(1.0) {
                Complex64::new(z.re, 0.0)
            } else {
                z
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sorted_re(mut roots: Vec<Complex64>) -> Vec<Complex64> {
        roots.sort_by(|a, b| {
            a.re.partial_cmp(&b.re)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.im.partial_cmp(&b.im).unwrap_or(std::cmp::Ordering::Equal))
        });
        roots
    }

    #[test]
    fn test_autocorrelation_small() {
        let r = autocorrelation(&[1.0, 2.0, 3.0], 4);
        assert_eq!(r, vec![14.0, 8.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_solve_linear_known_system() {
        let a = Array2::from_shape_vec((3, 3), vec![2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0])
            .unwrap();
        let b = Array1::from_vec(vec![8.0, -11.0, -3.0]);
        let x = solve_linear(a, b, 1e-12).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-10);
        assert_relative_eq!(x[2], -1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_linear_singular() {
        let a = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 4.0]).unwrap();
        let b = Array1::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            solve_linear(a, b, 1e-12),
            Err(Error::SingularSystem(_))
        ));
    }

    #[test]
    fn test_lpc_zero_signal_is_singular() {
        assert!(matches!(
            lpc_coefficients(&[0.0; 256], 16),
            Err(Error::SingularSystem(_))
        ));
    }

    #[test]
    fn test_lpc_leading_coefficient_and_length() {
        let signal: Vec<f64> = (0..400).map(|i| ((i * 7919) % 101) as f64 / 50.0 - 1.0).collect();
        let lpc = lpc_coefficients(&signal, 16).unwrap();
        assert_eq!(lpc.order(), 16);
        assert_eq!(lpc.as_slice().len(), 17);
        assert_eq!(lpc.as_slice()[0], 1.0);
    }

    #[test]
    fn test_lpc_recovers_ar1_process() {
        // x[n] = 0.9 x[n-1], started from an impulse: A(z) = 1 - 0.9 z^-1
        let signal: Vec<f64> = (0..2000).map(|n| 0.9f64.powi(n)).collect();
        let lpc = lpc_coefficients(&signal, 1).unwrap();
        assert_relative_eq!(lpc.as_slice()[1], -0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_roots_of_quadratic() {
        // z^2 - 3z + 2 = (z - 1)(z - 2)
        let roots = sorted_re(polynomial_roots(&[1.0, -3.0, 2.0]));
        assert_relative_eq!(roots[0].re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(roots[1].re, 2.0, epsilon = 1e-10);
        assert_eq!(roots[0].im, 0.0);
        assert_eq!(roots[1].im, 0.0);
    }

    #[test]
    fn test_roots_complex_pair_on_unit_circle() {
        // z^2 - 2cos(w) z + 1 has roots exp(±iw)
        let w = 0.3f64;
        let roots = polynomial_roots(&[1.0, -2.0 * w.cos(), 1.0]);
        assert_eq!(roots.len(), 2);
        for root in &roots {
            assert_relative_eq!(root.norm(), 1.0, epsilon = 1e-9);
            assert_relative_eq!(root.arg().abs(), w, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_roots_high_order_residuals() {
        // Product of four resonator sections, degree 8
        let mut poly = vec![1.0];
        for &(radius, angle) in &[(0.95, 0.2), (0.9, 0.9), (0.97, 1.7), (0.8, 2.6)] {
            let section = [1.0, -2.0 * radius * f64::cos(angle), radius * radius];
            let mut next = vec![0.0; poly.len() + 2];
            for (i, &p) in poly.iter().enumerate() {
                for (j, &s) in section.iter().enumerate() {
                    next[i + j] += p * s;
                }
            }
            poly = next;
        }
        let roots = polynomial_roots(&poly);
        assert_eq!(roots.len(), 8);
        for root in roots {
            let (p, _) = eval_polynomial(&poly, root);
            assert!(p.norm() < 1e-9, "residual {} at {}", p.norm(), root);
        }
    }

    #[test]
    fn test_zero_root_from_trailing_coefficient() {
        // z^3 - z^2 = z^2 (z - 1)
        let roots = sorted_re(polynomial_roots(&[1.0, -1.0, 0.0, 0.0]));
        assert_relative_eq!(roots[2].re, 1.0, epsilon = 1e-6);
        assert!(roots[0].norm() < 1e-4);
        assert!(roots[1].norm() < 1e-4);
    }
}
