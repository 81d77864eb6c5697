//! Initialization of the per-plane calculation
use std::f64::consts::PI;

use log::debug;

use crate::{
    beam::Histogram,
    error::{HyResult, HybridError},
    figure_error::rms_slope,
    ray::Plane,
    scaled::ScaledArray,
    utils::{f64_to_usize, usize_to_f64},
};

use super::{
    calculation::PlaneCalculation,
    input_parameters::HybridInputParameters,
    readback::Readback,
};

/// Smallest number of histogram bins.
pub const MIN_BINS: usize = 10;
/// Number of rays per histogram bin aimed at.
pub const RAYS_PER_BIN: usize = 20;
/// Width factor of a diffraction peak (`2 * 0.88`).
pub const PEAK_WIDTH_FACTOR: f64 = 1.76;

/// Returns the mean wavelength and the wavenumber in the length unit of the parameters.
#[must_use]
pub fn wavelength_and_wavenumber(readback: &Readback, params: &HybridInputParameters) -> (f64, f64) {
    let wavelength = readback.wavelength() * params.length_unit.factor_from_centimeter();
    (wavelength, 2.0 * PI / wavelength)
}

/// Returns the number of histogram bins used for `good_rays` rays.
#[must_use]
pub fn number_of_bins(configured: usize, good_rays: usize) -> usize {
    let by_rays = f64_to_usize((usize_to_f64(good_rays) / usize_to_f64(RAYS_PER_BIN)).round());
    configured.min(by_rays).max(MIN_BINS)
}

/// Focal length of the ideal lens which maps the far field onto the screen so that `npeak` diffraction peaks
/// of an aperture of the given extent are resolved.
///
/// # Errors
///
/// This function will return an error if the extent touches or encloses the axis only on one side
/// (zero width).
pub fn far_field_focal_length(extent: (f64, f64), npeak: usize, wavelength: f64) -> HyResult<f64> {
    let width = 2.0 * extent.0.abs().min(extent.1.abs());
    if !width.is_normal() {
        return Err(HybridError::Numerical(format!(
            "cannot derive far field focal length from extent {extent:?}"
        )));
    }
    Ok(width * width / (usize_to_f64(npeak) * PEAK_WIDTH_FACTOR * wavelength))
}

fn normalized_histogram(
    positions: &[f64],
    weights: &[f64],
    bins: usize,
    extent: (f64, f64),
) -> HyResult<ScaledArray> {
    let histogram = Histogram::from_values(positions, weights, bins, Some(extent.0..extent.1))?;
    let peak = histogram.counts().max();
    if !peak.is_normal() || peak.is_sign_negative() {
        return Err(HybridError::Numerical(
            "intensity histogram of the screen is empty".into(),
        ));
    }
    ScaledArray::new(
        histogram.counts() / peak,
        histogram.bin_centers()[0],
        histogram.bin_width(),
    )
}

/// Set up the calculation of one diffraction plane.
///
/// # Errors
///
/// This function will return an error if
///   - the intensity histogram is empty
///   - the far field focal length cannot be derived
///   - the figure error cannot be sliced
pub fn initialize_plane(
    readback: &Readback,
    plane: Plane,
    cut: bool,
    params: &HybridInputParameters,
) -> HyResult<PlaneCalculation> {
    let (wavelength, _) = wavelength_and_wavenumber(readback, params);
    let screen = readback.screen_beam();
    let extent = readback.extent(plane);
    let positions = readback.positions(plane);
    let weights: Vec<f64> = screen
        .rays()
        .iter()
        .filter(|r| r.valid())
        .map(crate::ray::Ray::intensity)
        .collect();
    let bins = number_of_bins(params.nbins(plane), positions.len());
    let histogram = normalized_histogram(&positions, &weights, bins, extent)?;
    let element = readback.element();
    let distance = params.distance.unwrap_or_else(|| element.image_distance());
    let near_field_focal_length = params.focal_length.or_else(|| element.focal_length(plane));
    let far_field_focal_length = far_field_focal_length(extent, params.npeak, wavelength)?;
    let figure_error_slice = match (readback.figure_error(), plane) {
        (Some(figure_error), Plane::Z) => Some(figure_error.longitudinal_profile(0.0)?),
        (Some(figure_error), Plane::X) => figure_error.sagittal_profile(0.0)?,
        (None, _) => None,
    };
    let rms_slope = figure_error_slice.as_ref().map_or(0.0, rms_slope);
    debug!(
        "plane {plane}: {bins} bins, extent {extent:?}, far field focal length {far_field_focal_length:.6e}, rms slope {rms_slope:.3e}"
    );
    Ok(PlaneCalculation {
        plane,
        cut,
        histogram,
        extent,
        distance,
        near_field_focal_length,
        far_field_focal_length,
        fft_size: 0,
        scale_factor: 1.0,
        figure_error_slice,
        rms_slope,
        far_field: None,
        near_field: None,
        far_field_offsets: Vec::new(),
        near_field_offsets: Vec::new(),
    })
}
