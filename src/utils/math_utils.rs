//! Small numerical helpers shared by the hybrid stages.
use itertools::{Itertools, MinMaxResult};
use kahan::KahanSummator;

#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}

/// Returns the (compensated) sum of the given values.
#[must_use]
pub fn kahan_sum(values: &[f64]) -> f64 {
    let sum: kahan::KahanSum<f64> = values.iter().kahan_sum();
    sum.sum()
}

/// Returns the arithmetic mean of the values or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(kahan_sum(values) / usize_to_f64(values.len()))
    }
}

/// Returns the root mean square of the values around their mean (standard deviation).
#[must_use]
pub fn rms_spread(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let squares: Vec<f64> = values.iter().map(|v| (v - avg) * (v - avg)).collect();
    mean(&squares).map(f64::sqrt)
}

/// Returns the root mean square of the values.
#[must_use]
pub fn rms(values: &[f64]) -> Option<f64> {
    let squares: Vec<f64> = values.iter().map(|v| v * v).collect();
    mean(&squares).map(f64::sqrt)
}

/// Returns the minimum and maximum of all finite values or `None` if there are none.
#[must_use]
pub fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    match values.iter().filter(|v| v.is_finite()).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((*v, *v)),
        MinMaxResult::MinMax(min, max) => Some((*min, *max)),
    }
}

/// First derivative of uniformly sampled values (forward differences, `len - 1` elements).
#[must_use]
pub fn forward_differences(values: &[f64], step: f64) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / step).collect()
}
