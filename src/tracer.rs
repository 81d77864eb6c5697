#![warn(missing_docs)]
//! Ray tracing through optical elements
//!
//! The hybrid calculation only needs a tracer for "trace beam through optical element". The
//! [`RayTracer`] trait is this boundary, [`GeometricTracer`] a simple built-in implementation based on
//! ideal (thin) elements.
use log::debug;

use crate::{
    beam::Beam,
    error::HyResult,
    figure_error::FigureError,
    history::{Footprint, HistoryEntry},
    optical_element::{ElementKind, OpticalElementState},
    ray::Plane,
};

/// Trace a [`Beam`] through an optical element.
pub trait RayTracer {
    /// Trace the beam through the given optical element and return the traced beam.
    ///
    /// The input beam is expected at the plane of the previous element. The returned beam is located at the
    /// image plane of the element and carries the history of the input beam plus one new entry with the
    /// given element number.
    ///
    /// # Errors
    ///
    /// This function will return an error if the element configuration is invalid or the rays cannot be traced.
    fn trace(
        &self,
        beam: &Beam,
        element: &OpticalElementState,
        oe_number: usize,
    ) -> HyResult<Beam>;
}

/// Geometric tracer for ideal optical elements.
///
/// - slits remove all rays outside the aperture
/// - mirrors and gratings clip the footprint on the surface, focus ideally and apply the slope of an
///   enabled surface error (twice, due to reflection) in the tangential plane
/// - compound refractive lenses clip, focus ideally in both planes and apply the gradient of an enabled
///   thickness error (scaled by the refractive decrement and the number of lenses)
///
/// The beam is unfolded, i.e. it continues along `y` behind reflective elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricTracer;

impl RayTracer for GeometricTracer {
    fn trace(
        &self,
        beam: &Beam,
        element: &OpticalElementState,
        oe_number: usize,
    ) -> HyResult<Beam> {
        element.validate()?;
        let mut traced = beam.duplicate(true, true);
        traced.retrace(element.source_distance())?;
        let figure_error = match element.surface_error() {
            Some(surface_error) if surface_error.enabled() => {
                Some(FigureError::load(surface_error)?)
            }
            _ => None,
        };
        let reflective = element.kind().is_reflective();
        let n = traced.number_of_rays();
        let (mut width, mut length, mut grazing) = (
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        );
        for ray in traced.rays_mut() {
            let point = element.aperture_coordinates(ray);
            if reflective {
                width.push(point.x);
                length.push(point.y);
                grazing.push(ray.angle_z().mul_add(1000.0, element.grazing_angle()));
            }
            if !ray.valid() {
                continue;
            }
            if let Some(aperture) = element.aperture() {
                if !aperture.contains(&point) {
                    ray.set_lost();
                    continue;
                }
            }
            let position = ray.position();
            let direction = ray.direction();
            let mut tan_x = direction.x / direction.y;
            let mut tan_z = direction.z / direction.y;
            if let Some(f) = element.focal_length(Plane::X) {
                tan_x -= position.x / f;
            }
            if let Some(f) = element.focal_length(Plane::Z) {
                tan_z -= position.z / f;
            }
            if let Some(figure_error) = &figure_error {
                let kick = match element.kind() {
                    ElementKind::Mirror | ElementKind::Grating => {
                        2.0 * figure_error.slope(point.x, point.y)
                    }
                    ElementKind::CompoundRefractiveLens => {
                        -element.refractive_decrement()
                            * crate::utils::usize_to_f64(element.number_of_lenses())
                            * figure_error.slope(point.x, point.y)
                    }
                    ElementKind::ScreenSlit => 0.0,
                };
                tan_z = (tan_z.atan() + kick).tan();
            }
            ray.set_direction_from_tangents(tan_x, tan_z)?;
        }
        traced.retrace(element.image_distance())?;
        debug!(
            "traced beam through element {oe_number} ({}): {} of {} rays good",
            element.kind(),
            traced.number_of_good_rays(),
            traced.number_of_rays()
        );
        let footprint = reflective.then(|| Footprint::new(width, length, grazing));
        traced.push_history(HistoryEntry::new(
            oe_number,
            beam,
            element.clone(),
            element.clone(),
            footprint,
        ));
        Ok(traced)
    }
}
