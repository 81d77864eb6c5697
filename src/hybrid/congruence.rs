//! Check whether a diffraction calculation is necessary at all
//!
//! A correction is only meaningful if the optical element truncates the beam. The intensity-weighted
//! footprint of the incident beam is histogrammed in aperture coordinates; if less than
//! [`CUT_THRESHOLD`] of the intensity lies outside the aperture in a direction, the beam is considered
//! "not cut" in that direction. Figure error calculations keep a plane that is not cut as long as the surface
//! error varies in that plane.
use log::info;

use crate::{
    beam::{Beam, Histogram},
    error::{HyResult, HybridError},
    optical_element::ProfileDimension,
    ray::Plane,
};

use super::input_parameters::HybridInputParameters;

/// Number of histogram bins used for the footprint analysis.
pub const FOOTPRINT_BINS: usize = 500;
/// Fraction of the intensity outside the aperture below which a direction counts as "not cut".
pub const CUT_THRESHOLD: f64 = 0.05;

/// Cut state of the beam in both directions and the planes to be calculated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutState {
    cut_x: bool,
    cut_z: bool,
    planes: Vec<Plane>,
}
impl CutState {
    /// Returns `true` if the beam is cut by the element in the given plane.
    #[must_use]
    pub const fn is_cut(&self, plane: Plane) -> bool {
        match plane {
            Plane::X => self.cut_x,
            Plane::Z => self.cut_z,
        }
    }
    /// Returns the planes for which the diffraction has to be calculated.
    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }
}

/// Result of the congruence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Congruence {
    /// a diffraction calculation is needed for the planes given in the [`CutState`]
    Necessary(CutState),
    /// no calculation is needed (with the reason)
    NotNecessary(String),
}

/// Decide whether the diffraction at the optical element `oe_number` of the (traced) beam has to be calculated.
///
/// # Errors
///
/// This function will return a [`HybridError::Configuration`] if the beam has no history entry for the
/// element or the calculation type does not fit the element kind.
pub fn check_congruence(
    beam: &Beam,
    oe_number: usize,
    params: &HybridInputParameters,
) -> HyResult<Congruence> {
    let entry = beam.history_entry(oe_number).ok_or_else(|| {
        HybridError::Configuration(format!(
            "beam has no history entry for optical element {oe_number}"
        ))
    })?;
    let element = entry.oe_before();
    if !params.calculation_type.matches(element.kind()) {
        return Err(HybridError::Configuration(format!(
            "calculation type {} cannot be applied to {}",
            params.calculation_type,
            element.kind()
        )));
    }
    let Some(aperture) = element.aperture() else {
        return Ok(Congruence::NotNecessary(
            "optical element has an infinite extent".into(),
        ));
    };
    let good_before = entry.input_beam().number_of_good_rays();
    let good_after = beam.number_of_good_rays();
    if good_before == good_after {
        return Ok(Congruence::NotNecessary(
            "no rays lost at the optical element".into(),
        ));
    }
    let mut incident = entry.input_beam().duplicate(true, false);
    incident.retrace(element.source_distance())?;
    let (mut first, mut second, mut weights) = (Vec::new(), Vec::new(), Vec::new());
    for ray in incident.rays().iter().filter(|r| r.valid()) {
        let point = element.aperture_coordinates(ray);
        first.push(point.x);
        second.push(point.y);
        weights.push(ray.intensity());
    }
    let is_cut = |values: &[f64], plane: Plane| -> HyResult<bool> {
        let histogram = Histogram::from_values(values, &weights, FOOTPRINT_BINS, None)?;
        let (lower, upper) = aperture.bounds(plane);
        Ok(histogram.fraction_outside(&(lower..upper)) >= CUT_THRESHOLD)
    };
    let cut_x = is_cut(&first, Plane::X)?;
    let cut_z = is_cut(&second, Plane::Z)?;
    let cut = |plane: Plane| match plane {
        Plane::X => cut_x,
        Plane::Z => cut_z,
    };
    // a 1D figure error only varies along the element (Z), a map in both directions
    let figure_error_in = |plane: Plane| {
        params.calculation_type.has_figure_error()
            && element.surface_error().is_some_and(|surface_error| {
                plane == Plane::Z || surface_error.dimension() == ProfileDimension::TwoD
            })
    };
    let planes: Vec<Plane> = params
        .diffraction_plane
        .planes()
        .into_iter()
        .filter(|p| cut(*p) || figure_error_in(*p))
        .collect();
    if planes.is_empty() {
        return Ok(Congruence::NotNecessary(format!(
            "beam not cut by the optical element in the requested plane(s) ({})",
            params.diffraction_plane
        )));
    }
    if planes.len() < params.diffraction_plane.planes().len() {
        info!(
            "beam not cut in all requested planes, calculating plane {} only",
            planes[0]
        );
    }
    Ok(Congruence::Necessary(CutState {
        cut_x,
        cut_z,
        planes,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        hybrid::input_parameters::{CalculationType, DiffractionPlane},
        optical_element::{ElementKind, OpticalElementState, RectangularAperture, SurfaceError},
        source::UniformSource,
        tracer::{GeometricTracer, RayTracer},
    };
    use assert_matches::assert_matches;
    use std::path::Path;

    fn trace(element: &OpticalElementState) -> Beam {
        let beam = UniformSource::new(1000, 1.0, 1.0, 0.0, 1.0e8)
            .unwrap()
            .generate(25)
            .unwrap();
        GeometricTracer.trace(&beam, element, 1).unwrap()
    }
    fn slit(half_width_x: f64, half_width_z: f64) -> OpticalElementState {
        OpticalElementState::new(ElementKind::ScreenSlit)
            .with_distances(100.0, 100.0)
            .with_aperture(RectangularAperture::new(half_width_x, half_width_z).unwrap())
    }
    #[test]
    fn missing_history() {
        let beam = Beam::default();
        assert_matches!(
            check_congruence(&beam, 1, &HybridInputParameters::default()),
            Err(HybridError::Configuration(_))
        );
    }
    #[test]
    fn wrong_calculation_type() {
        let beam = trace(&slit(0.3, 0.3));
        let params = HybridInputParameters {
            calculation_type: CalculationType::CrlSize,
            ..Default::default()
        };
        assert_matches!(
            check_congruence(&beam, 1, &params),
            Err(HybridError::Configuration(_))
        );
    }
    #[test]
    fn infinite_extent() {
        let beam = trace(&OpticalElementState::new(ElementKind::ScreenSlit));
        assert_matches!(
            check_congruence(&beam, 1, &HybridInputParameters::default()).unwrap(),
            Congruence::NotNecessary(_)
        );
    }
    #[test]
    fn no_rays_lost() {
        let beam = trace(&slit(2.0, 2.0));
        assert_matches!(
            check_congruence(&beam, 1, &HybridInputParameters::default()).unwrap(),
            Congruence::NotNecessary(_)
        );
    }
    #[test]
    fn cut_in_z() {
        let beam = trace(&slit(2.0, 0.3));
        let Congruence::Necessary(cut) =
            check_congruence(&beam, 1, &HybridInputParameters::default()).unwrap()
        else {
            panic!("calculation should be necessary")
        };
        assert!(cut.is_cut(Plane::Z));
        assert!(!cut.is_cut(Plane::X));
        assert_eq!(cut.planes(), &[Plane::Z]);
    }
    #[test]
    fn single_plane_not_cut() {
        let beam = trace(&slit(2.0, 0.3));
        let params = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Sagittal,
            ..Default::default()
        };
        assert_matches!(
            check_congruence(&beam, 1, &params).unwrap(),
            Congruence::NotNecessary(_)
        );
    }
    #[test]
    fn marginal_cut() {
        // 2% of the intensity outside in z
        let beam = trace(&slit(2.0, 0.98));
        assert_matches!(
            check_congruence(&beam, 1, &HybridInputParameters::default()).unwrap(),
            Congruence::NotNecessary(_)
        );
    }
    #[test]
    fn two_planes_narrowed() {
        let beam = trace(&slit(2.0, 0.3));
        for plane in [DiffractionPlane::Both1D, DiffractionPlane::Both2D] {
            let params = HybridInputParameters {
                diffraction_plane: plane,
                ..Default::default()
            };
            let Congruence::Necessary(cut) = check_congruence(&beam, 1, &params).unwrap() else {
                panic!("calculation should be necessary")
            };
            assert_eq!(cut.planes(), &[Plane::Z]);
        }
        let beam = trace(&slit(0.5, 0.3));
        let params = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both1D,
            ..Default::default()
        };
        let Congruence::Necessary(cut) = check_congruence(&beam, 1, &params).unwrap() else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::X, Plane::Z]);
    }
    #[test]
    fn mirror_aperture_coordinates() {
        let mirror = OpticalElementState::new(ElementKind::Mirror)
            .with_distances(100.0, 100.0)
            .with_grazing_angle(3.0)
            .with_aperture(RectangularAperture::new(5.0, 100.0).unwrap());
        let beam = trace(&mirror);
        let params = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both2D,
            calculation_type: CalculationType::MirrorOrGratingSize,
            ..Default::default()
        };
        let Congruence::Necessary(cut) = check_congruence(&beam, 1, &params).unwrap() else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::Z]);
    }
    fn mirror_with_error(dimension: ProfileDimension) -> OpticalElementState {
        // the tracer does not load a disabled surface error
        OpticalElementState::new(ElementKind::Mirror)
            .with_distances(100.0, 100.0)
            .with_grazing_angle(3.0)
            .with_aperture(RectangularAperture::new(5.0, 100.0).unwrap())
            .with_surface_error(SurfaceError::new(Path::new("error.dat"), dimension))
            .without_builtin_surface_error()
    }
    fn figure_error_params(diffraction_plane: DiffractionPlane) -> HybridInputParameters {
        HybridInputParameters {
            diffraction_plane,
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..Default::default()
        }
    }
    #[test]
    fn figure_error_profile_not_cut_sagittally() {
        let beam = trace(&mirror_with_error(ProfileDimension::OneD));
        let Congruence::Necessary(cut) =
            check_congruence(&beam, 1, &figure_error_params(DiffractionPlane::Both1D)).unwrap()
        else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::Z]);
        assert_matches!(
            check_congruence(&beam, 1, &figure_error_params(DiffractionPlane::Sagittal)).unwrap(),
            Congruence::NotNecessary(_)
        );
    }
    #[test]
    fn figure_error_map_not_cut_sagittally() {
        let beam = trace(&mirror_with_error(ProfileDimension::TwoD));
        let Congruence::Necessary(cut) =
            check_congruence(&beam, 1, &figure_error_params(DiffractionPlane::Both1D)).unwrap()
        else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::X, Plane::Z]);
        assert!(!cut.is_cut(Plane::X));
        let Congruence::Necessary(cut) =
            check_congruence(&beam, 1, &figure_error_params(DiffractionPlane::Sagittal)).unwrap()
        else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::X]);
    }
    #[test]
    fn figure_error_without_reference() {
        // no surface error: only the cut plane remains
        let mirror = OpticalElementState::new(ElementKind::Mirror)
            .with_distances(100.0, 100.0)
            .with_grazing_angle(3.0)
            .with_aperture(RectangularAperture::new(5.0, 100.0).unwrap());
        let beam = trace(&mirror);
        let Congruence::Necessary(cut) =
            check_congruence(&beam, 1, &figure_error_params(DiffractionPlane::Both2D)).unwrap()
        else {
            panic!("calculation should be necessary")
        };
        assert_eq!(cut.planes(), &[Plane::Z]);
    }
}
