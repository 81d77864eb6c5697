#![warn(missing_docs)]
//! Complex 1D wavefronts and their Fresnel propagation
//!
//! A [`Wavefront1D`] stores the complex electric field on a uniform grid. Free-space propagation uses the
//! transfer function method: the field is Fourier transformed, multiplied by `exp(-i*pi*lambda*z*f^2)` and
//! transformed back.
use std::f64::consts::PI;

use nalgebra::DVector;
use num::complex::Complex64;
use rayon::prelude::*;
use rustfft::FftPlanner;

use crate::{
    error::{HyResult, HybridError},
    scaled::ScaledArray,
    utils::usize_to_f64,
};

/// A complex 1D wavefront sampled on a uniform grid.
#[derive(Debug, Clone)]
pub struct Wavefront1D {
    field: DVector<Complex64>,
    offset: f64,
    delta: f64,
    wavelength: f64,
}
impl Wavefront1D {
    /// Creates a plane wave of unit amplitude with `len` points over `min..=max`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `len < 2`
    ///   - `max <= min` or the range is not finite
    ///   - the wavelength is not positive and finite
    pub fn plane_wave(min: f64, max: f64, len: usize, wavelength: f64) -> HyResult<Self> {
        if len < 2 {
            return Err(HybridError::Numerical(
                "a wavefront needs at least two points".into(),
            ));
        }
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(HybridError::Numerical(format!(
                "invalid wavefront range {min}..{max}"
            )));
        }
        if !wavelength.is_normal() || wavelength.is_sign_negative() {
            return Err(HybridError::Numerical(
                "wavelength must be positive and finite".into(),
            ));
        }
        Ok(Self {
            field: DVector::from_element(len, Complex64::new(1.0, 0.0)),
            offset: min,
            delta: (max - min) / usize_to_f64(len - 1),
            wavelength,
        })
    }
    /// Returns the number of sample points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.field.len()
    }
    /// Returns `true` if the wavefront has no sample points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }
    /// Returns the wavelength.
    #[must_use]
    pub const fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Returns the grid step.
    #[must_use]
    pub const fn delta(&self) -> f64 {
        self.delta
    }
    /// Returns the position of sample point `i`.
    #[must_use]
    pub fn abscissa(&self, i: usize) -> f64 {
        usize_to_f64(i).mul_add(self.delta, self.offset)
    }
    /// Returns the smallest and largest position of the grid.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.offset, self.abscissa(self.len() - 1))
    }
    /// Returns the complex field.
    #[must_use]
    pub const fn field(&self) -> &DVector<Complex64> {
        &self.field
    }
    /// Set the modulus of the field to the given function of the position. The phase is kept.
    pub fn set_amplitude<F: Fn(f64) -> f64 + Sync>(&mut self, amplitude: F) {
        let (offset, delta) = (self.offset, self.delta);
        self.field
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, e)| {
                let x = usize_to_f64(i).mul_add(delta, offset);
                *e = Complex64::from_polar(amplitude(x), e.arg());
            });
    }
    /// Add the phase given by a function of the position.
    pub fn add_phase_shift<F: Fn(f64) -> f64 + Sync>(&mut self, phase: F) {
        let (offset, delta) = (self.offset, self.delta);
        self.field
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, e)| {
                let x = usize_to_f64(i).mul_add(delta, offset);
                *e *= Complex64::from_polar(1.0, phase(x));
            });
    }
    /// Apply the phase of an ideal thin lens `exp(-i*k*x^2/(2*f))`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the focal length is zero or not finite.
    pub fn apply_ideal_lens(&mut self, focal_length: f64) -> HyResult<()> {
        if !focal_length.is_normal() {
            return Err(HybridError::Numerical(
                "focal length must be non-zero and finite".into(),
            ));
        }
        let k = 2.0 * PI / self.wavelength;
        self.add_phase_shift(|x| -k * x * x / (2.0 * focal_length));
        Ok(())
    }
    /// Returns the intensity `|E|^2` at all sample points.
    #[must_use]
    pub fn intensity(&self) -> DVector<f64> {
        self.field.map(|e| e.norm_sqr())
    }
    /// Returns the linearly interpolated intensity at `x` (zero outside the grid).
    #[must_use]
    pub fn interpolated_intensity(&self, x: f64) -> f64 {
        let t = (x - self.offset) / self.delta;
        let last = usize_to_f64(self.len() - 1);
        if !t.is_finite() || t < 0.0 || t > last {
            return 0.0;
        }
        let idx = crate::utils::f64_to_usize(t.floor()).min(self.len() - 2);
        let frac = t - usize_to_f64(idx);
        let i0 = self.field[idx].norm_sqr();
        let i1 = self.field[idx + 1].norm_sqr();
        frac.mul_add(i1 - i0, i0)
    }
    /// Sample the intensity on the grid of the given [`ScaledArray`] with the abscissas scaled by `scale`.
    ///
    /// The abscissa `a` of the array corresponds to the position `a * scale` of the wavefront.
    pub fn sample_intensity(&self, target: &mut ScaledArray, scale: f64) {
        let values: Vec<f64> = (0..target.len())
            .map(|i| self.interpolated_intensity(target.abscissa(i) * scale))
            .collect();
        target.values_mut().copy_from_slice(&values);
    }
    /// Propagate the wavefront over the given distance (Fresnel approximation, transfer function method).
    ///
    /// # Errors
    ///
    /// This function will return an error if the distance is not finite or the propagated field contains
    /// non-finite values.
    pub fn propagate_fresnel(&mut self, distance: f64) -> HyResult<()> {
        if !distance.is_finite() {
            return Err(HybridError::Numerical(
                "propagation distance must be finite".into(),
            ));
        }
        let n = self.len();
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);
        let mut buffer: Vec<Complex64> = self.field.iter().copied().collect();
        fft.process(&mut buffer);
        let length = usize_to_f64(n) * self.delta;
        let chirp = -PI * self.wavelength * distance;
        buffer.par_iter_mut().enumerate().for_each(|(i, e)| {
            let frequency = fft_frequency(i, n, length);
            *e *= Complex64::from_polar(1.0, chirp * frequency * frequency);
        });
        ifft.process(&mut buffer);
        let norm = 1.0 / usize_to_f64(n);
        if buffer.iter().any(|e| !e.re.is_finite() || !e.im.is_finite()) {
            return Err(HybridError::Numerical(
                "Fresnel propagation produced non-finite field values".into(),
            ));
        }
        self.field = DVector::from_iterator(n, buffer.into_iter().map(|e| e * norm));
        Ok(())
    }
}

/// Frequency of FFT bin `i` for `n` samples over a total length (positive frequencies first).
fn fft_frequency(i: usize, n: usize, length: f64) -> f64 {
    if i < n.div_ceil(2) {
        usize_to_f64(i) / length
    } else {
        -usize_to_f64(n - i) / length
    }
}
