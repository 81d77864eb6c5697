#![warn(missing_docs)]
//! Uniformly sampled 1D and 2D functions
//!
//! A [`ScaledArray`] stores the values of a function `f(x)` at the abscissas `offset + i * delta`. A
//! [`ScaledMatrix`] does the same for a function `f(x, y)` on a rectangular grid. Both support linear
//! interpolation. Outside the sampled range the functions are zero.
use std::path::Path;

use csv::WriterBuilder;
use kahan::KahanSum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{
    error::{HyResult, HybridError},
    utils::{f64_to_usize, usize_to_f64},
};

fn check_grid(offset: f64, delta: f64) -> HyResult<()> {
    if !offset.is_finite() || !delta.is_normal() || delta.is_sign_negative() {
        return Err(HybridError::Other(format!(
            "invalid grid: offset {offset}, delta {delta}"
        )));
    }
    Ok(())
}

/// Position of `x` on a grid as (lower index, fraction) or `None` if outside.
fn grid_position(x: f64, offset: f64, delta: f64, len: usize) -> Option<(usize, f64)> {
    if len == 0 || !x.is_finite() {
        return None;
    }
    let t = (x - offset) / delta;
    let last = usize_to_f64(len - 1);
    if t < 0.0 || t > last {
        return None;
    }
    if len == 1 {
        return Some((0, 0.0));
    }
    let idx = f64_to_usize(t.floor()).min(len - 2);
    Some((idx, t - usize_to_f64(idx)))
}

/// A uniformly sampled 1D function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledArray {
    values: DVector<f64>,
    offset: f64,
    delta: f64,
}
impl ScaledArray {
    /// Creates a new [`ScaledArray`] from values, the first abscissa and the step width.
    ///
    /// # Errors
    ///
    /// This function will return an error if the offset is not finite or the step width is not positive.
    pub fn new(values: DVector<f64>, offset: f64, delta: f64) -> HyResult<Self> {
        check_grid(offset, delta)?;
        Ok(Self {
            values,
            offset,
            delta,
        })
    }
    /// Creates a new [`ScaledArray`] with the values sampled over `min..=max`.
    ///
    /// # Errors
    ///
    /// This function will return an error if there are less than two values or `max <= min`.
    pub fn from_range(values: DVector<f64>, min: f64, max: f64) -> HyResult<Self> {
        if values.len() < 2 {
            return Err(HybridError::Other(
                "a scaled array needs at least two values".into(),
            ));
        }
        let delta = (max - min) / usize_to_f64(values.len() - 1);
        Self::new(values, min, delta)
    }
    /// Creates a zero-valued [`ScaledArray`] with `len` points over `min..=max`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `len < 2` or `max <= min`.
    pub fn zeros(len: usize, min: f64, max: f64) -> HyResult<Self> {
        Self::from_range(DVector::zeros(len), min, max)
    }
    /// Creates a [`ScaledArray`] over `min..=max` with values calculated by the given function.
    ///
    /// # Errors
    ///
    /// This function will return an error if `len < 2` or `max <= min`.
    pub fn from_fn<F: Fn(f64) -> f64>(len: usize, min: f64, max: f64, f: F) -> HyResult<Self> {
        let mut array = Self::zeros(len, min, max)?;
        for i in 0..len {
            array.values[i] = f(array.abscissa(i));
        }
        Ok(array)
    }
    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }
    /// Returns `true` if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// Returns the first abscissa.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }
    /// Returns the step width.
    #[must_use]
    pub const fn delta(&self) -> f64 {
        self.delta
    }
    /// Returns the abscissa of sample `i`.
    #[must_use]
    pub fn abscissa(&self, i: usize) -> f64 {
        usize_to_f64(i).mul_add(self.delta, self.offset)
    }
    /// Returns all abscissas.
    #[must_use]
    pub fn abscissas(&self) -> DVector<f64> {
        DVector::from_fn(self.len(), |i, _| self.abscissa(i))
    }
    /// Returns the largest abscissa.
    #[must_use]
    pub fn max_abscissa(&self) -> f64 {
        self.abscissa(self.len().saturating_sub(1))
    }
    /// Returns the sampled values.
    #[must_use]
    pub const fn values(&self) -> &DVector<f64> {
        &self.values
    }
    /// Returns the sampled values (mutable).
    pub fn values_mut(&mut self) -> &mut DVector<f64> {
        &mut self.values
    }
    /// Linear interpolation at `x`. Returns zero outside the sampled range.
    #[must_use]
    pub fn interpolate(&self, x: f64) -> f64 {
        match grid_position(x, self.offset, self.delta, self.len()) {
            Some((i, _)) if self.len() == 1 => self.values[i],
            Some((i, t)) => t.mul_add(self.values[i + 1] - self.values[i], self.values[i]),
            None => 0.0,
        }
    }
    /// Slope of the linear interpolation at `x`. Returns zero outside the sampled range.
    #[must_use]
    pub fn slope(&self, x: f64) -> f64 {
        match grid_position(x, self.offset, self.delta, self.len()) {
            Some((i, _)) if self.len() > 1 => (self.values[i + 1] - self.values[i]) / self.delta,
            _ => 0.0,
        }
    }
    /// Linear interpolation at all given abscissas.
    #[must_use]
    pub fn interpolate_values(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|x| self.interpolate(*x)).collect()
    }
    /// Returns a new [`ScaledArray`] on the same grid containing the running (compensated) sum of the values.
    #[must_use]
    pub fn cumulative_sum(&self) -> Self {
        let mut sum = KahanSum::new();
        let values = self.values.map(|v| {
            sum += v;
            sum.sum()
        });
        Self {
            values,
            offset: self.offset,
            delta: self.delta,
        }
    }
    /// Write the function as CSV table (`abscissa,value`) to the given path.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> HyResult<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| HybridError::Io(format!("cannot create {}: {e}", path.display())))?;
        for (i, value) in self.values.iter().enumerate() {
            writer.serialize((self.abscissa(i), *value))?;
        }
        writer
            .flush()
            .map_err(|e| HybridError::Io(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }
}

/// A uniformly sampled 2D function. Rows correspond to `x`, columns to `y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledMatrix {
    values: DMatrix<f64>,
    x_offset: f64,
    x_delta: f64,
    y_offset: f64,
    y_delta: f64,
}
impl ScaledMatrix {
    /// Creates a new [`ScaledMatrix`] with the values sampled over `x_min..=x_max` and `y_min..=y_max`.
    ///
    /// # Errors
    ///
    /// This function will return an error if there are less than two samples along an axis or a range is empty.
    pub fn from_ranges(
        values: DMatrix<f64>,
        (x_min, x_max): (f64, f64),
        (y_min, y_max): (f64, f64),
    ) -> HyResult<Self> {
        if values.nrows() < 2 || values.ncols() < 2 {
            return Err(HybridError::Other(
                "a scaled matrix needs at least two samples per axis".into(),
            ));
        }
        let x_delta = (x_max - x_min) / usize_to_f64(values.nrows() - 1);
        let y_delta = (y_max - y_min) / usize_to_f64(values.ncols() - 1);
        check_grid(x_min, x_delta)?;
        check_grid(y_min, y_delta)?;
        Ok(Self {
            values,
            x_offset: x_min,
            x_delta,
            y_offset: y_min,
            y_delta,
        })
    }
    /// Returns the sampled values.
    #[must_use]
    pub const fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
    /// Returns the abscissas along `x`.
    #[must_use]
    pub fn x_abscissas(&self) -> DVector<f64> {
        DVector::from_fn(self.values.nrows(), |i, _| {
            usize_to_f64(i).mul_add(self.x_delta, self.x_offset)
        })
    }
    /// Returns the abscissas along `y`.
    #[must_use]
    pub fn y_abscissas(&self) -> DVector<f64> {
        DVector::from_fn(self.values.ncols(), |i, _| {
            usize_to_f64(i).mul_add(self.y_delta, self.y_offset)
        })
    }
    /// Returns the step widths along `x` and `y`.
    #[must_use]
    pub const fn deltas(&self) -> (f64, f64) {
        (self.x_delta, self.y_delta)
    }
    /// Bilinear interpolation at `(x, y)`. Returns zero outside the sampled range.
    #[must_use]
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let Some((i, tx)) = grid_position(x, self.x_offset, self.x_delta, self.values.nrows())
        else {
            return 0.0;
        };
        let Some((j, ty)) = grid_position(y, self.y_offset, self.y_delta, self.values.ncols())
        else {
            return 0.0;
        };
        let v = &self.values;
        let lower = tx.mul_add(v[(i + 1, j)] - v[(i, j)], v[(i, j)]);
        let upper = tx.mul_add(v[(i + 1, j + 1)] - v[(i, j + 1)], v[(i, j + 1)]);
        ty.mul_add(upper - lower, lower)
    }
    /// Slope along `y` of the bilinear interpolation at `(x, y)`. Returns zero outside the sampled range.
    #[must_use]
    pub fn slope_y(&self, x: f64, y: f64) -> f64 {
        let Some((i, tx)) = grid_position(x, self.x_offset, self.x_delta, self.values.nrows())
        else {
            return 0.0;
        };
        let Some((j, _)) = grid_position(y, self.y_offset, self.y_delta, self.values.ncols())
        else {
            return 0.0;
        };
        let v = &self.values;
        let lower = tx.mul_add(v[(i + 1, j)] - v[(i, j)], v[(i, j)]);
        let upper = tx.mul_add(v[(i + 1, j + 1)] - v[(i, j + 1)], v[(i, j + 1)]);
        (upper - lower) / self.y_delta
    }
    /// Cut along `x` at the given `y`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the grid is invalid.
    pub fn slice_along_x(&self, y: f64) -> HyResult<ScaledArray> {
        let values = DVector::from_fn(self.values.nrows(), |i, _| {
            self.interpolate(usize_to_f64(i).mul_add(self.x_delta, self.x_offset), y)
        });
        ScaledArray::new(values, self.x_offset, self.x_delta)
    }
    /// Cut along `y` at the given `x`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the grid is invalid.
    pub fn slice_along_y(&self, x: f64) -> HyResult<ScaledArray> {
        let values = DVector::from_fn(self.values.ncols(), |j, _| {
            self.interpolate(x, usize_to_f64(j).mul_add(self.y_delta, self.y_offset))
        });
        ScaledArray::new(values, self.y_offset, self.y_delta)
    }
}
