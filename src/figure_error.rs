#![warn(missing_docs)]
//! Surface (figure) error profiles
//!
//! Figure errors are read from whitespace-delimited text files:
//! - 1D: one `position height` pair per line (position along the element)
//! - 2D: SHADOW presurface layout: `nx ny`, followed by the `ny` positions along the element and `nx`
//!   records of the form `x h_1 ... h_ny`.
//!
//! All values are given in the user length unit.
use std::{fs, path::Path};

use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{
    error::{HyResult, HybridError},
    optical_element::{ProfileDimension, SurfaceError},
    scaled::{ScaledArray, ScaledMatrix},
    utils::math_utils::{forward_differences, rms},
};

/// A loaded surface error profile.
#[derive(Debug, Clone, PartialEq)]
pub enum FigureError {
    /// height vs. position along the element
    Profile(ScaledArray),
    /// height map (rows: sagittal position, columns: position along the element)
    Map(ScaledMatrix),
}
impl FigureError {
    /// Load the figure error referenced by a [`SurfaceError`].
    ///
    /// # Errors
    ///
    /// This function will return a [`HybridError::Configuration`] if the file is missing or malformed.
    pub fn load(surface_error: &SurfaceError) -> HyResult<Self> {
        let path = surface_error.path();
        let content = fs::read_to_string(path).map_err(|e| {
            HybridError::Configuration(format!(
                "cannot read figure error file {}: {e}",
                path.display()
            ))
        })?;
        let figure_error = match surface_error.dimension() {
            ProfileDimension::OneD => Self::parse_profile(&content),
            ProfileDimension::TwoD => Self::parse_map(&content),
        }
        .map_err(|e| {
            HybridError::Configuration(format!(
                "malformed figure error file {}: {e}",
                path.display()
            ))
        })?;
        debug!("loaded {} figure error from {}", surface_error.dimension(), path.display());
        Ok(figure_error)
    }
    fn parse_profile(content: &str) -> Result<Self, String> {
        let mut points = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = parse_numbers(line).map_err(|e| format!("line {}: {e}", line_no + 1))?;
            if values.len() != 2 {
                return Err(format!("line {}: expected two columns", line_no + 1));
            }
            points.push((values[0], values[1]));
        }
        if points.len() < 2 {
            return Err("at least two points needed".into());
        }
        let points: Vec<(f64, f64)> = points
            .into_iter()
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect();
        let min = points[0].0;
        let max = points[points.len() - 1].0;
        let profile = ScaledArray::from_fn(points.len(), min, max, |x| {
            let idx = points.partition_point(|p| p.0 < x).clamp(1, points.len() - 1);
            let (x0, y0) = points[idx - 1];
            let (x1, y1) = points[idx];
            if x1 > x0 {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            } else {
                y1
            }
        })
        .map_err(|e| e.to_string())?;
        Ok(Self::Profile(profile))
    }
    fn parse_map(content: &str) -> Result<Self, String> {
        let numbers = parse_numbers(content)?;
        let mut iter = numbers.into_iter();
        let mut next = || iter.next().ok_or_else(|| "unexpected end of file".to_string());
        let nx = count(next()?)?;
        let ny = count(next()?)?;
        let y: Vec<f64> = (0..ny).map(|_| next()).collect::<Result<_, _>>()?;
        let mut x = Vec::with_capacity(nx);
        let mut heights = DMatrix::<f64>::zeros(nx, ny);
        for i in 0..nx {
            x.push(next()?);
            for j in 0..ny {
                heights[(i, j)] = next()?;
            }
        }
        if next().is_ok() {
            return Err("too many values".into());
        }
        let (x_min, x_max) = (x[0], x[nx - 1]);
        let (y_min, y_max) = (y[0], y[ny - 1]);
        ScaledMatrix::from_ranges(heights, (x_min, x_max), (y_min, y_max))
            .map(Self::Map)
            .map_err(|e| e.to_string())
    }
    /// RMS slope error along the element (rad).
    #[must_use]
    pub fn rms_slope(&self) -> f64 {
        match self {
            Self::Profile(profile) => rms_slope(profile),
            Self::Map(map) => {
                let (_, y_delta) = map.deltas();
                let slopes: Vec<f64> = map
                    .values()
                    .row_iter()
                    .flat_map(|row| {
                        let heights: Vec<f64> = row.iter().copied().collect();
                        forward_differences(&heights, y_delta)
                    })
                    .collect();
                rms(&slopes).unwrap_or_default()
            }
        }
    }
    /// Height error profile along the element, for maps at the given sagittal position.
    ///
    /// # Errors
    ///
    /// This function will return an error if the map cannot be sliced.
    pub fn longitudinal_profile(&self, sagittal_position: f64) -> HyResult<ScaledArray> {
        match self {
            Self::Profile(profile) => Ok(profile.clone()),
            Self::Map(map) => map.slice_along_y(sagittal_position),
        }
    }
    /// Sagittal height error profile at the given position along the element or `None` for 1D profiles.
    ///
    /// # Errors
    ///
    /// This function will return an error if the map cannot be sliced.
    pub fn sagittal_profile(&self, position: f64) -> HyResult<Option<ScaledArray>> {
        match self {
            Self::Profile(_) => Ok(None),
            Self::Map(map) => map.slice_along_x(position).map(Some),
        }
    }
    /// Height at the given element coordinates.
    #[must_use]
    pub fn height(&self, width: f64, length: f64) -> f64 {
        match self {
            Self::Profile(profile) => profile.interpolate(length),
            Self::Map(map) => map.interpolate(width, length),
        }
    }
    /// Slope along the element at the given element coordinates.
    #[must_use]
    pub fn slope(&self, width: f64, length: f64) -> f64 {
        match self {
            Self::Profile(profile) => profile.slope(length),
            Self::Map(map) => map.slope_y(width, length),
        }
    }
}

/// RMS of the first derivative of a height profile.
#[must_use]
pub fn rms_slope(profile: &ScaledArray) -> f64 {
    rms(&forward_differences(profile.values().as_slice(), profile.delta())).unwrap_or_default()
}

fn parse_numbers(text: &str) -> Result<Vec<f64>, String> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{token}'"))
        })
        .collect()
}

fn count(value: f64) -> Result<usize, String> {
    if value.fract() == 0.0 && value >= 2.0 && value < 1.0e7 {
        Ok(crate::utils::f64_to_usize(value))
    } else {
        Err(format!("invalid number of points {value}"))
    }
}

/// Write a 1D profile in the text format read by [`FigureError::load`].
///
/// # Errors
///
/// This function will return an error if the file cannot be written.
pub fn write_profile(path: &Path, positions: &DVector<f64>, heights: &DVector<f64>) -> HyResult<()> {
    let content: String = positions
        .iter()
        .zip(heights.iter())
        .map(|(x, h)| format!("{x:e} {h:e}\n"))
        .collect();
    fs::write(path, content)
        .map_err(|e| HybridError::Io(format!("cannot write {}: {e}", path.display())))
}
