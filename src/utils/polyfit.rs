//! Least-squares polynomial fitting.
//!
//! The abscissa is mapped onto `[-1, 1]` before fitting, so that also higher degree fits over small
//! coordinate ranges (e.g. screen positions of a few micrometers) stay well conditioned.
use crate::error::{HyResult, HybridError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// A polynomial `p(x) = sum c_i * t^i` with the normalized abscissa `t = (x - center) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    center: f64,
    scale: f64,
}
impl Polynomial {
    /// Fit a polynomial of the given degree to the data points `(x, y)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `x` and `y` have different lengths
    ///   - there are less than `degree + 1` data points
    ///   - the data contains non-finite values
    ///   - the least-squares problem cannot be solved
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> HyResult<Self> {
        if x.len() != y.len() {
            return Err(HybridError::Numerical(
                "polynomial fit: number of abscissas and values differ".into(),
            ));
        }
        if x.len() <= degree {
            return Err(HybridError::Numerical(format!(
                "polynomial fit: at least {} points needed for degree {degree}",
                degree + 1
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(HybridError::Numerical(
                "polynomial fit: data contains non-finite values".into(),
            ));
        }
        let (min, max) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
                (min.min(*v), max.max(*v))
            });
        let center = 0.5 * (min + max);
        let scale = if max > min { 0.5 * (max - min) } else { 1.0 };
        let vandermonde = DMatrix::from_fn(x.len(), degree + 1, |row, col| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            ((x[row] - center) / scale).powi(col as i32)
        });
        let rhs = DVector::from_column_slice(y);
        let coefficients = vandermonde
            .svd(true, true)
            .solve(&rhs, 1.0e-14)
            .map_err(|e| HybridError::Numerical(format!("polynomial fit failed: {e}")))?;
        Ok(Self {
            coefficients: coefficients.iter().copied().collect(),
            center,
            scale,
        })
    }
    /// Returns the degree of this [`Polynomial`].
    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
    /// Evaluate the polynomial at `x` (Horner scheme).
    #[must_use]
    pub fn value(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc.mul_add(t, *c))
    }
    /// Evaluate the polynomial at all given abscissas.
    #[must_use]
    pub fn values(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| self.value(*v)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    #[test]
    fn fit_exact_cubic() {
        let x: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.1 - 1.0).collect();
        let y: Vec<f64> = x.iter().map(|x| 2.0 - x + 0.5 * x * x * x).collect();
        let p = Polynomial::fit(&x, &y, 3).unwrap();
        assert_eq!(p.degree(), 3);
        for (x, y) in x.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p.value(*x), *y, epsilon = 1e-10);
        }
        assert_abs_diff_eq!(p.value(0.25), 2.0 - 0.25 + 0.5 * 0.25_f64.powi(3), epsilon = 1e-10);
    }
    #[test]
    fn fit_small_range_high_degree() {
        let x: Vec<f64> = (0..100).map(|i| f64::from(i).mul_add(1.0e-6, -5.0e-5)).collect();
        let y: Vec<f64> = x.iter().map(|x| 1.0e3 * x + 3.0).collect();
        let p = Polynomial::fit(&x, &y, 6).unwrap();
        assert_abs_diff_eq!(p.value(1.0e-5), 3.01, epsilon = 1e-9);
    }
    #[test]
    fn fit_least_squares() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 0.0, 1.0];
        let p = Polynomial::fit(&x, &y, 1).unwrap();
        let values = p.values(&x);
        assert_abs_diff_eq!(values[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(values[3], 0.8, epsilon = 1e-12);
    }
    #[test]
    fn fit_wrong_input() {
        assert!(Polynomial::fit(&[0.0, 1.0], &[0.0], 1).is_err());
        assert!(Polynomial::fit(&[0.0, 1.0], &[0.0, 1.0], 2).is_err());
        assert!(Polynomial::fit(&[0.0, f64::NAN, 2.0], &[0.0, 1.0, 2.0], 1).is_err());
    }
    #[test]
    fn fit_constant_abscissa() {
        let p = Polynomial::fit(&[1.0, 1.0, 1.0], &[2.0, 2.0, 2.0], 0).unwrap();
        assert_abs_diff_eq!(p.value(5.0), 2.0, epsilon = 1e-12);
    }
}
