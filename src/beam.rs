#![warn(missing_docs)]
//! Module for handling ray ensembles ("beams")
//!
//! A [`Beam`] is an ordered collection of [`Ray`]s together with an optional initial flux and the
//! append-only trace [`HistoryEntry`] list. Beams can be persisted as CSV ray tables. As with
//! classic ray files, the history is not part of the stored file.
use std::{ops::Range, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use kahan::KahanSummator;
use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{HyResult, HybridError},
    history::HistoryEntry,
    ray::{Column, Ray},
    utils::{f64_to_usize, math_utils::finite_min_max, usize_to_f64},
};

/// Weighting of the rays when histogramming a [`Beam`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// each ray counts as 1
    #[default]
    None,
    /// each ray is weighted by its intensity
    Intensity,
}

/// A 1D histogram of a ray column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    bin_centers: DVector<f64>,
    counts: DVector<f64>,
    bin_width: f64,
}
impl Histogram {
    /// Create a weighted histogram of the given values.
    ///
    /// If no range is given, the full range of the (finite) values is used. Values outside the range are
    /// ignored, values on the upper border are counted in the last bin.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the number of bins is zero
    ///   - the number of values and weights differ
    ///   - there are no values and no range is given
    ///   - the range is empty or not finite
    pub fn from_values(
        values: &[f64],
        weights: &[f64],
        bins: usize,
        range: Option<Range<f64>>,
    ) -> HyResult<Self> {
        if bins == 0 {
            return Err(HybridError::Beam(
                "number of histogram bins must be > 0".into(),
            ));
        }
        if values.len() != weights.len() {
            return Err(HybridError::Beam(
                "number of histogram values and weights differ".into(),
            ));
        }
        let range = if let Some(range) = range {
            range
        } else {
            let (min, max) = finite_min_max(values).ok_or_else(|| {
                HybridError::Beam("cannot determine histogram range without values".into())
            })?;
            min..max
        };
        if !range.start.is_finite() || !range.end.is_finite() || range.end < range.start {
            return Err(HybridError::Beam(format!(
                "invalid histogram range {}..{}",
                range.start, range.end
            )));
        }
        // a degenerated range (all values equal) gets an artificial width
        let (start, end) = if range.end > range.start {
            (range.start, range.end)
        } else {
            let half = if range.start.abs() > 0.0 {
                range.start.abs() * 1.0e-6
            } else {
                1.0e-12
            };
            (range.start - half, range.start + half)
        };
        let bin_width = (end - start) / usize_to_f64(bins);
        let mut counts = DVector::<f64>::zeros(bins);
        for (value, weight) in values.iter().zip(weights) {
            if !(start..=end).contains(value) {
                continue;
            }
            let idx = f64_to_usize((value - start) / bin_width).min(bins - 1);
            counts[idx] += weight;
        }
        let bin_centers =
            DVector::from_fn(bins, |i, _| (usize_to_f64(i) + 0.5).mul_add(bin_width, start));
        Ok(Self {
            bin_centers,
            counts,
            bin_width,
        })
    }
    /// Returns the bin centers of this [`Histogram`].
    #[must_use]
    pub const fn bin_centers(&self) -> &DVector<f64> {
        &self.bin_centers
    }
    /// Returns the (weighted) counts of this [`Histogram`].
    #[must_use]
    pub const fn counts(&self) -> &DVector<f64> {
        &self.counts
    }
    /// Returns the bin width of this [`Histogram`].
    #[must_use]
    pub const fn bin_width(&self) -> f64 {
        self.bin_width
    }
    /// Returns the number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }
    /// Returns `true` if the histogram has no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
    /// Returns the sum of all bin counts.
    #[must_use]
    pub fn total(&self) -> f64 {
        let sum: kahan::KahanSum<f64> = self.counts.iter().kahan_sum();
        sum.sum()
    }
    /// Returns the fraction of the total counts whose bin centers lie outside the given range.
    ///
    /// An empty histogram returns 0.0.
    #[must_use]
    pub fn fraction_outside(&self, range: &Range<f64>) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let outside: f64 = self
            .bin_centers
            .iter()
            .zip(self.counts.iter())
            .filter(|(center, _)| **center < range.start || **center > range.end)
            .map(|(_, count)| *count)
            .sum();
        outside / total
    }
    /// Returns the full width at half maximum of this [`Histogram`].
    ///
    /// The width is determined from the outermost bins above half of the maximum value. Returns `None`
    /// for empty histograms or histograms without positive counts.
    #[must_use]
    pub fn fwhm(&self) -> Option<f64> {
        let max = self.counts.max();
        if self.counts.is_empty() || max <= 0.0 {
            return None;
        }
        let above: Vec<usize> = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c >= 0.5 * max)
            .map(|(i, _)| i)
            .collect();
        let first = above.first()?;
        let last = above.last()?;
        Some(self.bin_width * usize_to_f64(last - first + 1))
    }
}

///Struct containing all rays of a beam plus its trace history
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct Beam {
    rays: Vec<Ray>,
    initial_flux: Option<f64>,
    history: Vec<HistoryEntry>,
}
impl Beam {
    /// Creates a new [`Beam`] from the given rays with an empty history.
    #[must_use]
    pub const fn new(rays: Vec<Ray>) -> Self {
        Self {
            rays,
            initial_flux: None,
            history: Vec::new(),
        }
    }
    /// Duplicate this [`Beam`].
    ///
    /// Depending on the flags, the rays and / or the history are deep-copied. Otherwise the new beam contains
    /// no rays / an empty history. The initial flux is always copied.
    #[must_use]
    pub fn duplicate(&self, copy_rays: bool, copy_history: bool) -> Self {
        Self {
            rays: if copy_rays {
                self.rays.clone()
            } else {
                Vec::new()
            },
            initial_flux: self.initial_flux,
            history: if copy_history {
                self.history.clone()
            } else {
                Vec::new()
            },
        }
    }
    /// Returns a reference to the rays of this [`Beam`].
    #[must_use]
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }
    /// Returns a mutable reference to the rays of this [`Beam`].
    pub fn rays_mut(&mut self) -> &mut [Ray] {
        &mut self.rays
    }
    /// Add a single ray to the beam.
    pub fn add_ray(&mut self, ray: Ray) {
        self.rays.push(ray);
    }
    /// Returns the total number of rays (good and lost).
    #[must_use]
    pub fn number_of_rays(&self) -> usize {
        self.rays.len()
    }
    /// Returns the number of good (not lost) rays.
    #[must_use]
    pub fn number_of_good_rays(&self) -> usize {
        self.rays.iter().filter(|r| r.valid()).count()
    }
    /// Returns the initial flux of this [`Beam`].
    #[must_use]
    pub const fn initial_flux(&self) -> Option<f64> {
        self.initial_flux
    }
    /// Sets the initial flux of this [`Beam`].
    pub fn set_initial_flux(&mut self, initial_flux: Option<f64>) {
        self.initial_flux = initial_flux;
    }
    /// Returns the values of a given column of all (or only the good) rays.
    #[must_use]
    pub fn column(&self, column: Column, good_only: bool) -> Vec<f64> {
        self.rays
            .iter()
            .filter(|r| !good_only || r.valid())
            .map(|r| r.column(column))
            .collect()
    }
    /// Returns the minimum and maximum value of a given column or `None` if there are no (finite) values.
    #[must_use]
    pub fn column_range(&self, column: Column, good_only: bool) -> Option<(f64, f64)> {
        finite_min_max(&self.column(column, good_only))
    }
    /// Create a 1D histogram of a given column (see [`Histogram::from_values`]).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the number of bins is zero
    ///   - there are no (good) rays and no range is given
    ///   - the range is empty or not finite
    pub fn histogram(
        &self,
        column: Column,
        bins: usize,
        range: Option<Range<f64>>,
        good_only: bool,
        weighting: Weighting,
    ) -> HyResult<Histogram> {
        let (values, weights): (Vec<f64>, Vec<f64>) = self
            .rays
            .iter()
            .filter(|r| !good_only || r.valid())
            .map(|r| {
                let weight = match weighting {
                    Weighting::None => 1.0,
                    Weighting::Intensity => r.intensity(),
                };
                (r.column(column), weight)
            })
            .unzip();
        Histogram::from_values(&values, &weights, bins, range)
    }
    /// Propagate all rays freely to a plane at the given distance along `y`.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the rays cannot be retraced (see [`Ray::retrace`]).
    pub fn retrace(&mut self, distance: f64) -> HyResult<()> {
        self.rays
            .par_iter_mut()
            .try_for_each(|ray| ray.retrace(distance))
    }
    /// Returns the trace history of this [`Beam`].
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
    /// Returns the history entry of the optical element with the given number.
    #[must_use]
    pub fn history_entry(&self, oe_number: usize) -> Option<&HistoryEntry> {
        self.history.iter().find(|e| e.oe_number() == oe_number)
    }
    /// Append a new entry to the trace history.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
    /// Replace the complete history of this [`Beam`].
    pub fn set_history(&mut self, history: Vec<HistoryEntry>) {
        self.history = history;
    }
    /// Write the rays of this [`Beam`] as CSV table (18 columns, one ray per row) to the given path.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> HyResult<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| HybridError::Io(format!("cannot create {}: {e}", path.display())))?;
        for ray in &self.rays {
            writer.serialize(ray.to_columns())?;
        }
        writer
            .flush()
            .map_err(|e| HybridError::Io(format!("cannot write {}: {e}", path.display())))?;
        debug!("wrote {} rays to {}", self.rays.len(), path.display());
        Ok(())
    }
    /// Load a [`Beam`] from a CSV ray table (18 columns, one ray per row).
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or contains invalid ray data.
    pub fn load_csv(path: &Path) -> HyResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| HybridError::Io(format!("cannot open {}: {e}", path.display())))?;
        let mut rays = Vec::new();
        for (line, record) in reader.deserialize::<[f64; 18]>().enumerate() {
            let columns = record.map_err(|e| {
                HybridError::Io(format!("{}: line {}: {e}", path.display(), line + 1))
            })?;
            rays.push(Ray::from_columns(&columns)?);
        }
        debug!("read {} rays from {}", rays.len(), path.display());
        Ok(Self::new(rays))
    }
}
