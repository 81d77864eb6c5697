//! Wave optical propagation of the screen wavefront
//!
//! For every diffraction plane a 1D wavefront is built over the extent of the beam at the screen. The far field
//! is obtained by focusing the wavefront with an ideal lens of focal length `f_ff` and propagating it over `f_ff`:
//! the intensity at position `x` of the focal plane is the far field intensity at the angle `x / f_ff`. The near
//! field is the wavefront propagated over the image distance, focused by the focal length of the element.
use std::f64::consts::PI;

use log::{debug, warn};

use crate::{
    error::{HyResult, HybridError},
    ray::Plane,
    scaled::ScaledArray,
    utils::{f64_to_usize, usize_to_f64},
    wavefront::Wavefront1D,
};

use super::{
    calculation::PlaneCalculation,
    init::PEAK_WIDTH_FACTOR,
    input_parameters::{CalculationType, HybridInputParameters, FFT_POINTS_LIMIT, FFT_POINTS_MIN},
    readback::Readback,
};

/// Factor `0.88` of the sampling criterion of the far field grid.
const SAMPLING_FACTOR: f64 = 0.88;
/// Number of grid points per Fresnel zone aimed at.
const POINTS_PER_ZONE: f64 = 100.0;
/// Number of sub-apertures resolved along a figure error profile.
const FIGURE_ERROR_SEGMENTS: f64 = 16.0;

/// Reduce the far field focal length for reflective figure error calculations so that the angular spread
/// caused by the figure error stays inside the propagated window.
#[must_use]
pub fn clip_focal_length(
    focal_length: f64,
    extent_width: f64,
    rms_slope: f64,
    grazing_angle: f64,
) -> f64 {
    if rms_slope > 0.0 && grazing_angle > 0.0 {
        let limit = extent_width / FIGURE_ERROR_SEGMENTS / rms_slope / (grazing_angle / 1000.0).sin();
        focal_length.min(limit)
    } else {
        focal_length
    }
}

/// Returns the number of wavefront points and the grid scale factor.
///
/// The number of points resolves the Fresnel zones of the far field propagation, is bounded by the configured
/// maximum and at least [`FFT_POINTS_MIN`]. For planes not cut by the element the grid (and the number of points)
/// is enlarged by the conditioning factor. The result never exceeds [`FFT_POINTS_LIMIT`].
#[must_use]
pub fn fft_size(
    extent_width: f64,
    wavelength: f64,
    focal_length: f64,
    cut: bool,
    params: &HybridInputParameters,
) -> (usize, f64) {
    let zones = POINTS_PER_ZONE * extent_width * extent_width
        / (wavelength * focal_length * SAMPLING_FACTOR);
    let points = zones
        .min(usize_to_f64(params.fft_points))
        .round()
        .max(usize_to_f64(FFT_POINTS_MIN));
    let (points, scale) = if cut {
        (points, 1.0)
    } else {
        let factor = params.uncut_conditioning_factor;
        ((points * factor).ceil(), factor)
    };
    (f64_to_usize(points).min(FFT_POINTS_LIMIT), scale)
}

/// Phase shift caused by the figure (thickness) error of the element.
struct FigurePhase<'a> {
    calculation_type: CalculationType,
    plane: Plane,
    readback: &'a Readback,
    slice: &'a ScaledArray,
    wavelength: f64,
}
impl FigurePhase<'_> {
    fn phase(&self, x: f64) -> f64 {
        if self.calculation_type.is_reflective() {
            let factor = -4.0 * PI / self.wavelength;
            match (self.plane, self.readback.angle_fit(), self.readback.length_fit()) {
                (Plane::Z, Some(angle_fit), Some(length_fit)) => {
                    factor
                        * (angle_fit.value(x) / 1000.0).sin()
                        * self.slice.interpolate(length_fit.value(x))
                }
                _ => {
                    factor
                        * (self.readback.mean_grazing_angle() / 1000.0).sin()
                        * self.slice.interpolate(x)
                }
            }
        } else {
            let element = self.readback.element();
            -2.0 * PI / self.wavelength
                * element.refractive_decrement()
                * usize_to_f64(element.number_of_lenses())
                * self.slice.interpolate(x)
        }
    }
}

fn initial_wavefront(
    calculation: &PlaneCalculation,
    wavelength: f64,
) -> HyResult<Wavefront1D> {
    let (min, max) = calculation.extent;
    let scale = calculation.scale_factor;
    let mut wavefront =
        Wavefront1D::plane_wave(min * scale, max * scale, calculation.fft_size, wavelength)?;
    // a rescaled grid keeps the flat amplitude of the plane wave
    if (scale - 1.0).abs() < f64::EPSILON {
        let histogram = &calculation.histogram;
        wavefront.set_amplitude(|x| histogram.interpolate(x).max(0.0).sqrt());
    }
    Ok(wavefront)
}

fn grid_points(half_width: f64, delta: f64) -> usize {
    f64_to_usize((2.0 * half_width / delta).round() + 1.0).max(2)
}

/// Propagate the far field (and the near field if requested) of one diffraction plane.
///
/// The results are stored in the given [`PlaneCalculation`].
///
/// # Errors
///
/// This function will return an error if the wavefront cannot be created or propagated.
pub fn propagate_plane(
    calculation: &mut PlaneCalculation,
    readback: &Readback,
    params: &HybridInputParameters,
    wavelength: f64,
) -> HyResult<()> {
    let calculation_type = params.calculation_type;
    if calculation_type.has_figure_error() && calculation_type.is_reflective() {
        calculation.far_field_focal_length = clip_focal_length(
            calculation.far_field_focal_length,
            calculation.extent_width(),
            calculation.rms_slope,
            readback.mean_grazing_angle(),
        );
    }
    let f_ff = calculation.far_field_focal_length;
    let (fft_size, scale_factor) = fft_size(
        calculation.extent_width(),
        wavelength,
        f_ff,
        calculation.cut,
        params,
    );
    calculation.fft_size = fft_size;
    calculation.scale_factor = scale_factor;
    if fft_size == FFT_POINTS_LIMIT {
        warn!(
            "plane {}: number of wavefront points limited to {FFT_POINTS_LIMIT}",
            calculation.plane
        );
    }
    debug!(
        "plane {}: {fft_size} wavefront points, scale factor {scale_factor}, far field focal length {f_ff:.6e}",
        calculation.plane
    );
    let figure_phase = calculation
        .figure_error_slice
        .as_ref()
        .map(|slice| FigurePhase {
            calculation_type,
            plane: calculation.plane,
            readback,
            slice,
            wavelength,
        });

    let mut wavefront = initial_wavefront(calculation, wavelength)?;
    wavefront.apply_ideal_lens(f_ff)?;
    if let Some(figure_phase) = &figure_phase {
        wavefront.add_phase_shift(|x| figure_phase.phase(x));
    }
    wavefront.propagate_fresnel(f_ff)?;
    let (min, max) = calculation.extent;
    let half_width = min.abs().min(max.abs());
    let delta = wavefront.delta();
    let mut far_field = ScaledArray::zeros(
        grid_points(half_width, delta),
        -half_width / f_ff,
        half_width / f_ff,
    )?;
    wavefront.sample_intensity(&mut far_field, f_ff);

    let near_field = if params.near_field && calculation_type != CalculationType::SimpleAperture {
        let distance = calculation.distance;
        let focal_length = calculation.near_field_focal_length;
        let mut wavefront = initial_wavefront(calculation, wavelength)?;
        if let Some(f) = focal_length {
            wavefront.apply_ideal_lens(f)?;
        }
        if let Some(figure_phase) = &figure_phase {
            wavefront.add_phase_shift(|x| figure_phase.phase(x));
        }
        wavefront.propagate_fresnel(distance)?;
        let width = calculation.extent_width();
        let npeak = usize_to_f64(params.npeak);
        let f = focal_length.unwrap_or(distance);
        let focus = npeak * PEAK_WIDTH_FACTOR * wavelength * f.abs() / width;
        let defocus = focal_length.map_or(width, |f| (width * (distance - f) / f).abs());
        let figure = FIGURE_ERROR_SEGMENTS * calculation.rms_slope * distance.abs();
        let (grid_min, grid_max) = wavefront.range();
        let half_width = (focus.max(defocus).max(figure) / 2.0).min((grid_max - grid_min) / 2.0);
        let mut near_field =
            ScaledArray::zeros(grid_points(half_width, delta), -half_width, half_width)?;
        wavefront.sample_intensity(&mut near_field, 1.0);
        Some(near_field)
    } else {
        None
    };
    if far_field.values().iter().any(|v| !v.is_finite())
        || near_field
            .as_ref()
            .is_some_and(|n| n.values().iter().any(|v| !v.is_finite()))
    {
        return Err(HybridError::Numerical(format!(
            "plane {}: propagated intensity contains non-finite values",
            calculation.plane
        )));
    }
    calculation.far_field = Some(far_field);
    calculation.near_field = near_field;
    Ok(())
}
