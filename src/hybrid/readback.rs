//! Read back the ray data needed by the hybrid calculation
//!
//! The beam entering the optical element is taken from the trace history and re-traced through a
//! modified copy of the element (image distance 0, built-in surface error disabled) in order to get
//! the beam directly behind the element (the "screen") together with its footprint on the element.
use std::f64::consts::PI;

use log::debug;

use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    figure_error::FigureError,
    history::Footprint,
    optical_element::OpticalElementState,
    ray::{Column, Plane},
    tracer::RayTracer,
    utils::{math_utils::mean, polyfit::Polynomial},
};

use super::input_parameters::{CalculationType, HybridInputParameters};

/// Degree of the polynomial fit of the grazing angle vs. the screen position.
pub const ANGLE_FIT_DEGREE: usize = 3;
/// Degree of the polynomial fit of the mirror coordinate vs. the screen position.
pub const LENGTH_FIT_DEGREE: usize = 6;

/// Ray data and element configuration at the screen plane.
#[derive(Debug, Clone)]
pub struct Readback {
    element: OpticalElementState,
    screen_beam: Beam,
    wavelength: f64,
    extent_x: (f64, f64),
    extent_z: (f64, f64),
    mean_grazing_angle: f64,
    figure_error: Option<FigureError>,
    angle_fit: Option<Polynomial>,
    length_fit: Option<Polynomial>,
}
impl Readback {
    /// Returns the state of the optical element (as recorded in the history).
    #[must_use]
    pub const fn element(&self) -> &OpticalElementState {
        &self.element
    }
    /// Returns the beam at the screen plane directly behind the element.
    #[must_use]
    pub const fn screen_beam(&self) -> &Beam {
        &self.screen_beam
    }
    /// Returns the mean wavelength of the good rays in cm.
    #[must_use]
    pub const fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Returns the spatial extent (min, max) of the beam at the screen in the given plane.
    #[must_use]
    pub const fn extent(&self, plane: Plane) -> (f64, f64) {
        match plane {
            Plane::X => self.extent_x,
            Plane::Z => self.extent_z,
        }
    }
    /// Returns the mean grazing angle (mrad) of the rays on a reflective element.
    #[must_use]
    pub const fn mean_grazing_angle(&self) -> f64 {
        self.mean_grazing_angle
    }
    /// Returns the figure error of the element (figure error calculations only).
    #[must_use]
    pub const fn figure_error(&self) -> Option<&FigureError> {
        self.figure_error.as_ref()
    }
    /// Returns the fit of the grazing angle (mrad) vs. the screen position `z`.
    #[must_use]
    pub const fn angle_fit(&self) -> Option<&Polynomial> {
        self.angle_fit.as_ref()
    }
    /// Returns the fit of the coordinate along the element vs. the screen position `z`.
    #[must_use]
    pub const fn length_fit(&self) -> Option<&Polynomial> {
        self.length_fit.as_ref()
    }
    /// Returns the ray angles (rad) of the good rays at the screen in the given plane.
    #[must_use]
    pub fn angles(&self, plane: Plane) -> Vec<f64> {
        self.screen_beam.column(plane.angle_column(), true)
    }
    /// Returns the positions of the good rays at the screen in the given plane.
    #[must_use]
    pub fn positions(&self, plane: Plane) -> Vec<f64> {
        self.screen_beam.column(plane.position_column(), true)
    }
}

fn good_values(values: &[f64], beam: &Beam) -> Vec<f64> {
    values
        .iter()
        .zip(beam.rays())
        .filter(|(_, r)| r.valid())
        .map(|(v, _)| *v)
        .collect()
}

/// Extract the screen beam and all element data needed by the calculation.
///
/// # Errors
///
/// This function will return an error if
///   - the beam has no history entry for the element
///   - a figure error calculation is requested, but the element has no enabled surface error
///   - the figure error file cannot be read
///   - no good rays arrive at the screen
///   - the polynomial fits fail
pub fn read_back(
    tracer: &dyn RayTracer,
    beam: &Beam,
    oe_number: usize,
    params: &HybridInputParameters,
) -> HyResult<Readback> {
    let entry = beam.history_entry(oe_number).ok_or_else(|| {
        HybridError::Configuration(format!(
            "beam has no history entry for optical element {oe_number}"
        ))
    })?;
    let element = entry.oe_before().clone();
    let calculation_type = params.calculation_type;
    let figure_error = if calculation_type.has_figure_error() {
        let surface_error = element
            .surface_error()
            .filter(|s| s.enabled())
            .ok_or_else(|| {
                HybridError::Configuration(format!(
                    "calculation type {calculation_type} needs an enabled surface error on optical element {oe_number}"
                ))
            })?;
        Some(FigureError::load(surface_error)?)
    } else {
        None
    };
    let mut screen_element = element.with_image_distance(0.0);
    if figure_error.is_some() {
        screen_element = screen_element.without_builtin_surface_error();
    }
    let screen_beam = tracer.trace(entry.input_beam(), &screen_element, oe_number)?;
    let footprint = screen_beam
        .history()
        .last()
        .and_then(|e| e.footprint())
        .cloned();
    let wavelengths: Vec<f64> = screen_beam
        .column(Column::Wavenumber, true)
        .iter()
        .map(|k| 2.0 * PI / k)
        .collect();
    let wavelength = mean(&wavelengths)
        .ok_or_else(|| HybridError::Beam("no good rays at the optical element".into()))?;
    let (extent_x, extent_z) = if calculation_type == CalculationType::SimpleAperture {
        let aperture = element.aperture().ok_or_else(|| {
            HybridError::Configuration("simple aperture calculation needs a slit".into())
        })?;
        (aperture.bounds(Plane::X), aperture.bounds(Plane::Z))
    } else {
        let extent = |plane: Plane| {
            screen_beam
                .column_range(plane.position_column(), true)
                .ok_or_else(|| HybridError::Beam("no good rays at the optical element".into()))
        };
        (extent(Plane::X)?, extent(Plane::Z)?)
    };
    let mut mean_grazing_angle = element.grazing_angle();
    let (mut angle_fit, mut length_fit) = (None, None);
    if calculation_type.is_reflective() {
        let footprint: Footprint = footprint.ok_or_else(|| {
            HybridError::Configuration("tracer did not record a footprint on the element".into())
        })?;
        let angles = good_values(footprint.grazing_angles(), &screen_beam);
        mean_grazing_angle = mean(&angles).unwrap_or(mean_grazing_angle);
        if figure_error.is_some() {
            let z = screen_beam.column(Column::Z, true);
            let lengths = good_values(footprint.length(), &screen_beam);
            angle_fit = Some(Polynomial::fit(&z, &angles, ANGLE_FIT_DEGREE)?);
            length_fit = Some(Polynomial::fit(&z, &lengths, LENGTH_FIT_DEGREE)?);
        }
    }
    debug!(
        "read back {} good rays, wavelength {:.6e} cm, extent x {:?}, extent z {:?}",
        screen_beam.number_of_good_rays(),
        wavelength,
        extent_x,
        extent_z
    );
    Ok(Readback {
        element,
        screen_beam,
        wavelength,
        extent_x,
        extent_z,
        mean_grazing_angle,
        figure_error,
        angle_fit,
        length_fit,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        optical_element::{ElementKind, ProfileDimension, RectangularAperture, SurfaceError},
        source::UniformSource,
        tracer::GeometricTracer,
    };
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn traced(element: &OpticalElementState) -> Beam {
        let beam = UniformSource::new(1000, 1.0, 1.0, 0.0, 2.0 * PI / 1.0e-5)
            .unwrap()
            .generate(25)
            .unwrap();
        GeometricTracer.trace(&beam, element, 1).unwrap()
    }
    fn mirror() -> OpticalElementState {
        OpticalElementState::new(ElementKind::Mirror)
            .with_distances(100.0, 1000.0)
            .with_grazing_angle(3.0)
            .with_aperture(RectangularAperture::new(5.0, 100.0).unwrap())
    }
    #[test]
    fn simple_aperture() {
        let slit = OpticalElementState::new(ElementKind::ScreenSlit)
            .with_distances(100.0, 1000.0)
            .with_aperture(RectangularAperture::new(2.0, 0.3).unwrap());
        let beam = traced(&slit);
        let r = read_back(&GeometricTracer, &beam, 1, &HybridInputParameters::default()).unwrap();
        assert_eq!(r.extent(Plane::Z), (-0.3, 0.3));
        assert_eq!(r.extent(Plane::X), (-2.0, 2.0));
        assert_abs_diff_eq!(r.wavelength(), 1.0e-5, epsilon = 1e-18);
        assert_eq!(r.screen_beam().number_of_good_rays(), beam.number_of_good_rays());
        for z in r.positions(Plane::Z) {
            assert!(z.abs() <= 0.3);
        }
        assert!(r.angles(Plane::Z).iter().all(|a| *a == 0.0));
        assert!(r.angle_fit().is_none());
        assert_eq!(r.element(), &slit);
    }
    #[test]
    fn mirror_size() {
        let beam = traced(&mirror());
        let params = HybridInputParameters {
            calculation_type: CalculationType::MirrorOrGratingSize,
            ..Default::default()
        };
        let r = read_back(&GeometricTracer, &beam, 1, &params).unwrap();
        let (min, max) = r.extent(Plane::Z);
        assert!(min >= -0.3 && max <= 0.3);
        assert_abs_diff_eq!(r.mean_grazing_angle(), 3.0, epsilon = 1e-12);
        assert!(r.figure_error().is_none());
        assert!(r.length_fit().is_none());
    }
    #[test]
    fn mirror_figure_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "-100.0 0.0\n0.0 1.0e-6\n100.0 0.0").unwrap();
        let element =
            mirror().with_surface_error(SurfaceError::new(file.path(), ProfileDimension::OneD));
        let beam = traced(&element);
        let params = HybridInputParameters {
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..Default::default()
        };
        let r = read_back(&GeometricTracer, &beam, 1, &params).unwrap();
        assert!(r.figure_error().is_some());
        assert_abs_diff_eq!(r.angle_fit().unwrap().value(0.1), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            r.length_fit().unwrap().value(0.1),
            0.1 / 0.003_f64.sin(),
            epsilon = 1e-6
        );
        // the screen beam is traced without the built-in surface error
        assert!(r.angles(Plane::Z).iter().all(|a| a.abs() < 1e-15));
        assert!(beam.history().len() == 1);
    }
    #[test]
    fn mirror_figure_error_missing() {
        let beam = traced(&mirror());
        let params = HybridInputParameters {
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..Default::default()
        };
        assert_matches!(
            read_back(&GeometricTracer, &beam, 1, &params),
            Err(HybridError::Configuration(_))
        );
        let element = mirror()
            .with_surface_error(SurfaceError::new(
                std::path::Path::new("error.dat"),
                ProfileDimension::OneD,
            ))
            .without_builtin_surface_error();
        let beam = traced(&element);
        assert_matches!(
            read_back(&GeometricTracer, &beam, 1, &params),
            Err(HybridError::Configuration(_))
        );
    }
    #[test]
    fn missing_history() {
        assert_matches!(
            read_back(
                &GeometricTracer,
                &Beam::default(),
                3,
                &HybridInputParameters::default()
            ),
            Err(HybridError::Configuration(_))
        );
    }
}
