#![warn(missing_docs)]
//! The hybrid screen: wave optical correction of ray traced beams
//!
//! A beam traced through an optical element with a finite aperture (slit, mirror, grating or compound
//! refractive lens) shows no diffraction. [`HybridScreen::run`] calculates the diffraction of the element in one
//! or two planes and returns a copy of the beam with corrected ray directions (far field) and optionally
//! corrected positions (near field):
//!
//! 1. check whether the element truncates the beam at all ([`congruence`])
//! 2. re-trace the beam onto the screen directly behind the element ([`readback`])
//! 3. per plane: build the intensity profile ([`init`]), propagate a wavefront ([`propagation`]) and draw
//!    random offsets from the propagated intensity ([`sampler`])
//! 4. apply the offsets to the rays ([`reconstruct`])
//!
//! ```rust
//! use hybrid_screen::{
//!     hybrid::{HybridInputParameters, HybridOutcome, HybridScreen},
//!     optical_element::{ElementKind, OpticalElementState, RectangularAperture},
//!     source::UniformSource,
//!     tracer::{GeometricTracer, RayTracer},
//! };
//!
//! let beam = UniformSource::new(1000, 1.0, 1.0, 0.0, 6.0e5).unwrap().generate(1).unwrap();
//! let slit = OpticalElementState::new(ElementKind::ScreenSlit)
//!     .with_distances(100.0, 1000.0)
//!     .with_aperture(RectangularAperture::new(2.0, 0.3).unwrap());
//! let traced = GeometricTracer.trace(&beam, &slit, 1).unwrap();
//! let outcome = HybridScreen::new(&GeometricTracer)
//!     .run(&traced, 1, &HybridInputParameters::default())
//!     .unwrap();
//! assert!(matches!(outcome, HybridOutcome::Corrected(_)));
//! ```
pub mod calculation;
pub mod congruence;
pub mod init;
pub mod input_parameters;
pub mod propagation;
pub mod readback;
pub mod reconstruct;
pub mod sampler;

pub use calculation::{CalculationParameters, PlaneCalculation};
pub use input_parameters::{CalculationType, DiffractionPlane, HybridInputParameters};

use log::{debug, warn};

use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    progress::{LogProgress, ProgressObserver},
    ray::Plane,
    tracer::RayTracer,
    utils::usize_to_f64,
};
use congruence::{check_congruence, Congruence};
use sampler::{plane_rng, InverseCdfSampler};

/// Result of a hybrid calculation.
#[derive(Debug, Clone)]
pub enum HybridOutcome {
    /// the beam was corrected
    Corrected(Box<HybridResult>),
    /// no correction necessary, the beam is returned unchanged
    NotNecessary {
        /// the (unchanged) input beam
        beam: Beam,
        /// why no calculation was done
        reason: String,
    },
}
impl HybridOutcome {
    /// Returns the beam to be used for further tracing: the far field beam of a corrected calculation or the
    /// unchanged input beam.
    #[must_use]
    pub fn beam(&self) -> &Beam {
        match self {
            Self::Corrected(result) => result.far_field_beam(),
            Self::NotNecessary { beam, .. } => beam,
        }
    }
}

/// Output beams and intermediate results of a corrected calculation.
#[derive(Debug, Clone)]
pub struct HybridResult {
    calculation: CalculationParameters,
}
impl HybridResult {
    /// Returns the beam at the image plane with diffraction corrected directions.
    #[must_use]
    pub const fn far_field_beam(&self) -> &Beam {
        &self.calculation.far_field_beam
    }
    /// Returns the beam at the image plane with diffraction corrected positions (if calculated).
    #[must_use]
    pub const fn near_field_beam(&self) -> Option<&Beam> {
        self.calculation.near_field_beam.as_ref()
    }
    /// Returns all intermediate results of the calculation.
    #[must_use]
    pub const fn calculation(&self) -> &CalculationParameters {
        &self.calculation
    }
}

/// Attach plane and stage to numerical errors.
fn at_stage(plane: Plane, stage: &'static str) -> impl Fn(HybridError) -> HybridError {
    move |e| match e {
        HybridError::Numerical(m) => HybridError::Numerical(format!("plane {plane}, {stage}: {m}")),
        e => e,
    }
}

/// The hybrid screen calculation.
pub struct HybridScreen<'a> {
    tracer: &'a dyn RayTracer,
    observer: &'a dyn ProgressObserver,
}
impl<'a> HybridScreen<'a> {
    /// Creates a new [`HybridScreen`] using the given ray tracer and reporting progress to the log.
    #[must_use]
    pub fn new(tracer: &'a dyn RayTracer) -> Self {
        Self {
            tracer,
            observer: &LogProgress,
        }
    }
    /// Report the progress to the given observer.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }
    /// Calculate the diffraction of the optical element `oe_number` of a traced beam.
    ///
    /// The beam must carry a history entry for the element. The returned beams have the same number of rays and
    /// the same history as the input beam.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the parameters are invalid or do not fit the element ([`HybridError::Configuration`])
    ///   - a surface error file is missing or malformed ([`HybridError::Configuration`])
    ///   - a calculation stage fails numerically ([`HybridError::Numerical`])
    ///   - no good rays arrive at the screen ([`HybridError::Beam`])
    ///   - the diagnostic files cannot be written ([`HybridError::Io`])
    pub fn run(
        &self,
        beam: &Beam,
        oe_number: usize,
        params: &HybridInputParameters,
    ) -> HyResult<HybridOutcome> {
        params.validate()?;
        if params.diffraction_plane == DiffractionPlane::Both2D {
            warn!("coupled 2D propagation is not available, calculating two decoupled 1D planes");
        }
        self.observer.progress(0, "checking the necessity of the calculation");
        let cut_state = match check_congruence(beam, oe_number, params)? {
            Congruence::Necessary(cut_state) => cut_state,
            Congruence::NotNecessary(reason) => {
                self.observer.progress(100, &format!("no calculation necessary: {reason}"));
                return Ok(HybridOutcome::NotNecessary {
                    beam: beam.clone(),
                    reason,
                });
            }
        };
        self.observer.progress(10, "reading back the beam at the screen");
        let readback = readback::read_back(self.tracer, beam, oe_number, params)?;
        let (wavelength, wavenumber) = init::wavelength_and_wavenumber(&readback, params);
        let good_rays = readback.screen_beam().number_of_good_rays();
        let planes = cut_state.planes();
        let mut calculations = Vec::with_capacity(planes.len());
        for (n, plane) in planes.iter().enumerate() {
            let plane = *plane;
            let base = 20.0 + 60.0 * usize_to_f64(n) / usize_to_f64(planes.len());
            let step = 60.0 / usize_to_f64(planes.len()) / 3.0;
            self.observer
                .progress(percent(base), &format!("plane {plane}: initializing"));
            let mut calculation =
                init::initialize_plane(&readback, plane, cut_state.is_cut(plane), params)
                    .map_err(at_stage(plane, "initialization"))?;
            self.observer
                .progress(percent(base + step), &format!("plane {plane}: propagating"));
            propagation::propagate_plane(&mut calculation, &readback, params, wavelength)
                .map_err(at_stage(plane, "propagation"))?;
            self.observer
                .progress(percent(base + 2.0 * step), &format!("plane {plane}: sampling"));
            let mut rng = plane_rng(params.random_seed, plane);
            if let Some(far_field) = &calculation.far_field {
                calculation.far_field_offsets = InverseCdfSampler::new(far_field)
                    .map_err(at_stage(plane, "far field sampling"))?
                    .sample_n(&mut rng, good_rays);
            }
            if let Some(near_field) = &calculation.near_field {
                calculation.near_field_offsets = InverseCdfSampler::new(near_field)
                    .map_err(at_stage(plane, "near field sampling"))?
                    .sample_n(&mut rng, good_rays);
            }
            calculations.push(calculation);
        }
        self.observer.progress(80, "reconstructing the beams");
        let distance = params
            .distance
            .unwrap_or_else(|| readback.element().image_distance());
        let plane_refs: Vec<&PlaneCalculation> = calculations.iter().collect();
        let mut far_field_beam =
            reconstruct::far_field_beam(readback.screen_beam(), &plane_refs, distance)?;
        let mut near_field_beam = if calculations.iter().any(|c| c.near_field.is_some()) {
            let near_planes: Vec<&PlaneCalculation> = calculations
                .iter()
                .filter(|c| c.near_field.is_some())
                .collect();
            Some(reconstruct::near_field_beam(
                readback.screen_beam(),
                &far_field_beam,
                &near_planes,
            )?)
        } else {
            if params.near_field {
                debug!("no near field calculation for {}", params.calculation_type);
            }
            None
        };
        far_field_beam.set_history(beam.history().to_vec());
        if let Some(near_field_beam) = near_field_beam.as_mut() {
            near_field_beam.set_history(beam.history().to_vec());
        }
        let (mut plane_x, mut plane_z) = (None, None);
        for calculation in calculations {
            match calculation.plane {
                Plane::X => plane_x = Some(calculation),
                Plane::Z => plane_z = Some(calculation),
            }
        }
        let calculation = CalculationParameters {
            wavelength,
            wavenumber,
            cut_x: cut_state.is_cut(Plane::X),
            cut_z: cut_state.is_cut(Plane::Z),
            screen_beam: readback.screen_beam().clone(),
            angle_fit: readback.angle_fit().cloned(),
            length_fit: readback.length_fit().cloned(),
            plane_x,
            plane_z,
            far_field_beam,
            near_field_beam,
        };
        if let Some(directory) = &params.diagnostics_directory {
            self.observer.progress(90, "writing diagnostic files");
            calculation.write_diagnostics(directory)?;
        }
        self.observer.progress(100, "hybrid calculation finished");
        Ok(HybridOutcome::Corrected(Box::new(HybridResult { calculation })))
    }
}

fn percent(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = value.round().clamp(0.0, 100.0) as u8;
    percent
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        figure_error::write_profile,
        optical_element::{
            ElementKind, OpticalElementState, ProfileDimension, RectangularAperture, SurfaceError,
        },
        progress::NoProgress,
        ray::Column,
        scaled::ScaledArray,
        source::UniformSource,
        tracer::GeometricTracer,
        units::LengthUnit,
        utils::{math_utils::rms_spread, test_helper::test_helper::check_warnings},
    };
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use assert_matches::assert_matches;
    use nalgebra::DVector;
    use std::{cell::RefCell, f64::consts::PI};
    use tempfile::{tempdir, NamedTempFile};

    /// wavelength 1e-5 cm = 1e-4 mm
    fn source_beam() -> Beam {
        UniformSource::new(1000, 1.0, 1.0, 0.0, 2.0 * PI / 1.0e-5)
            .unwrap()
            .generate(25)
            .unwrap()
    }
    fn params() -> HybridInputParameters {
        HybridInputParameters {
            length_unit: LengthUnit::Millimeter,
            ..Default::default()
        }
    }
    fn slit(half_width_z: f64) -> OpticalElementState {
        OpticalElementState::new(ElementKind::ScreenSlit)
            .with_distances(100.0, 1000.0)
            .with_aperture(RectangularAperture::new(2.0, half_width_z).unwrap())
    }
    fn mirror() -> OpticalElementState {
        OpticalElementState::new(ElementKind::Mirror)
            .with_distances(100.0, 1000.0)
            .with_grazing_angle(3.0)
            .with_focal_lengths(None, Some(1000.0))
            .with_aperture(RectangularAperture::new(5.0, 100.0).unwrap())
    }
    fn trace(element: &OpticalElementState) -> Beam {
        GeometricTracer.trace(&source_beam(), element, 1).unwrap()
    }
    fn run(beam: &Beam, params: &HybridInputParameters) -> HyResult<HybridOutcome> {
        HybridScreen::new(&GeometricTracer)
            .with_observer(&NoProgress)
            .run(beam, 1, params)
    }
    fn corrected(outcome: HybridOutcome) -> HybridResult {
        match outcome {
            HybridOutcome::Corrected(result) => *result,
            HybridOutcome::NotNecessary { reason, .. } => {
                panic!("calculation should be necessary: {reason}")
            }
        }
    }
    #[test]
    fn narrow_slit() {
        let traced = trace(&slit(0.3));
        let result = corrected(run(&traced, &params()).unwrap());
        let beam = result.far_field_beam();
        assert_eq!(beam.number_of_rays(), 1000);
        assert_eq!(beam.number_of_good_rays(), traced.number_of_good_rays());
        for ray in beam.rays() {
            assert_abs_diff_eq!(ray.direction().norm(), 1.0, epsilon = 1e-10);
        }
        let geometric = rms_spread(&traced.column(Column::Z, true)).unwrap();
        let hybrid = rms_spread(&beam.column(Column::Z, true)).unwrap();
        assert!(hybrid > geometric);
        let calculation = result.calculation();
        assert!(calculation.cut_z);
        assert!(!calculation.cut_x);
        assert!(calculation.plane(Plane::X).is_none());
        assert!(result.near_field_beam().is_none());
        assert_eq!(
            calculation.plane(Plane::Z).unwrap().far_field_offsets.len(),
            traced.number_of_good_rays()
        );
    }
    #[test]
    fn focal_length_derivation() {
        let traced = trace(&slit(0.3));
        let result = corrected(run(&traced, &params()).unwrap());
        let calculation = result.calculation();
        let expected = (2.0 * 0.3) * (2.0 * 0.3) / (20.0 * 2.0 * 0.88 * calculation.wavelength);
        assert_relative_eq!(
            calculation.plane(Plane::Z).unwrap().far_field_focal_length,
            expected,
            max_relative = 1e-12
        );
        assert_relative_eq!(calculation.wavelength, 1.0e-4, max_relative = 1e-12);
    }
    #[test]
    fn history_restored() {
        let traced = trace(&slit(0.3));
        let result = corrected(run(&traced, &params()).unwrap());
        assert_eq!(result.far_field_beam().history(), traced.history());
        assert!(result.calculation().screen_beam.history().len() == 1);
    }
    #[test]
    fn deterministic() {
        let traced = trace(&slit(0.3));
        let a = corrected(run(&traced, &params()).unwrap());
        let b = corrected(run(&traced, &params()).unwrap());
        assert_eq!(a.far_field_beam(), b.far_field_beam());
        let p = HybridInputParameters {
            random_seed: 7,
            ..params()
        };
        let c = corrected(run(&traced, &p).unwrap());
        assert_ne!(a.far_field_beam(), c.far_field_beam());
    }
    #[test]
    fn infinite_element() {
        let traced = trace(&OpticalElementState::new(ElementKind::ScreenSlit));
        let outcome = run(&traced, &params()).unwrap();
        assert_matches!(&outcome, HybridOutcome::NotNecessary { .. });
        assert_eq!(outcome.beam(), &traced);
    }
    #[test]
    fn not_cut_in_requested_plane() {
        let traced = trace(&mirror());
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Sagittal,
            calculation_type: CalculationType::MirrorOrGratingSize,
            ..params()
        };
        let outcome = run(&traced, &p).unwrap();
        let HybridOutcome::NotNecessary { beam, reason } = outcome else {
            panic!("no calculation expected")
        };
        assert_eq!(beam, traced);
        assert!(reason.contains("not cut"));
    }
    #[test]
    fn two_planes_narrowed() {
        let traced = trace(&mirror());
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both1D,
            calculation_type: CalculationType::MirrorOrGratingSize,
            ..params()
        };
        let result = corrected(run(&traced, &p).unwrap());
        assert!(result.calculation().plane_x.is_none());
        assert!(result.calculation().plane_z.is_some());
        assert_eq!(result.far_field_beam().number_of_rays(), 1000);
    }
    #[test]
    fn both_2d_warning() {
        testing_logger::setup();
        let traced = trace(&slit(0.3));
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both2D,
            ..params()
        };
        let result = corrected(run(&traced, &p).unwrap());
        assert!(result.calculation().plane_z.is_some());
        check_warnings(&[
            "coupled 2D propagation is not available, calculating two decoupled 1D planes",
        ]);
    }
    #[test]
    fn configuration_errors() {
        let traced = trace(&slit(0.3));
        let p = HybridInputParameters {
            calculation_type: CalculationType::MirrorOrGratingSize,
            ..params()
        };
        assert_matches!(run(&traced, &p), Err(HybridError::Configuration(_)));
        assert_matches!(
            HybridScreen::new(&GeometricTracer).run(&traced, 2, &params()),
            Err(HybridError::Configuration(_))
        );
        let p = HybridInputParameters {
            npeak: 0,
            ..params()
        };
        assert_matches!(run(&traced, &p), Err(HybridError::Configuration(_)));
        let traced = trace(&mirror());
        let p = HybridInputParameters {
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..params()
        };
        assert_matches!(run(&traced, &p), Err(HybridError::Configuration(_)));
    }
    #[test]
    fn mirror_figure_error_near_field() {
        let file = NamedTempFile::new().unwrap();
        let length = DVector::from_fn(201, |i, _| -100.0 + usize_to_f64(i));
        let heights = length.map(|l| 1.0e-6 * (2.0 * PI * l / 50.0).sin());
        write_profile(file.path(), &length, &heights).unwrap();
        let element =
            mirror().with_surface_error(SurfaceError::new(file.path(), ProfileDimension::OneD));
        let traced = trace(&element);
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both1D,
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            near_field: true,
            ..params()
        };
        let result = corrected(run(&traced, &p).unwrap());
        let calculation = result.calculation();
        assert!(calculation.angle_fit.is_some());
        // a 1D profile has no sagittal component: the uncut plane X is dropped
        assert!(!calculation.cut_x);
        assert!(calculation.plane(Plane::X).is_none());
        let z = calculation.plane(Plane::Z).unwrap();
        assert!(z.cut);
        assert!(z.rms_slope > 0.0);
        assert!(z.near_field.is_some());
        let near_field = result.near_field_beam().unwrap();
        assert_eq!(near_field.number_of_rays(), 1000);
        assert_eq!(near_field.history(), traced.history());
        for ray in near_field.rays() {
            assert_abs_diff_eq!(ray.direction().norm(), 1.0, epsilon = 1e-10);
        }
    }
    #[test]
    fn figure_error_profile_not_cut_sagittally() {
        let file = NamedTempFile::new().unwrap();
        let length = DVector::from_fn(201, |i, _| -100.0 + usize_to_f64(i));
        let heights = length.map(|l| 1.0e-6 * (2.0 * PI * l / 50.0).sin());
        write_profile(file.path(), &length, &heights).unwrap();
        let element =
            mirror().with_surface_error(SurfaceError::new(file.path(), ProfileDimension::OneD));
        let traced = trace(&element);
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Sagittal,
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..params()
        };
        let outcome = run(&traced, &p).unwrap();
        let HybridOutcome::NotNecessary { beam, .. } = outcome else {
            panic!("no calculation expected")
        };
        assert_eq!(beam, traced);
    }
    /// Second moment of a (non-negative) distribution around zero.
    fn spread(distribution: &ScaledArray) -> f64 {
        let (weighted, total) = distribution
            .abscissas()
            .iter()
            .zip(distribution.values().iter())
            .fold((0.0, 0.0), |(w, t), (x, v)| (w + v * x * x, t + v));
        (weighted / total).sqrt()
    }
    /// Presurface map with heights `h(x)` independent of the position along the mirror.
    fn write_sagittal_map(path: &std::path::Path, amplitude: f64) {
        let mut content = String::from("201 3\n-100.0 0.0 100.0\n");
        for i in 0..201 {
            let x = -5.0 + 0.05 * usize_to_f64(i);
            let h = amplitude * (2.0 * PI * x / 0.5).sin();
            content.push_str(&format!("{x:e} {h:e} {h:e} {h:e}\n"));
        }
        std::fs::write(path, content).unwrap();
    }
    #[test]
    fn mirror_figure_error_map() {
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Sagittal,
            calculation_type: CalculationType::MirrorSizeAndErrorProfile,
            ..params()
        };
        let sagittal_far_field = |amplitude: f64| {
            let file = NamedTempFile::new().unwrap();
            write_sagittal_map(file.path(), amplitude);
            let element =
                mirror().with_surface_error(SurfaceError::new(file.path(), ProfileDimension::TwoD));
            let traced = trace(&element);
            let result = corrected(run(&traced, &p).unwrap());
            assert_eq!(result.far_field_beam().number_of_rays(), 1000);
            result.calculation().plane(Plane::X).unwrap().clone()
        };
        let flat = sagittal_far_field(0.0);
        let rippled = sagittal_far_field(3.4e-3);
        // the map diffracts sagittally although the mirror does not cut the beam
        assert!(!rippled.cut);
        assert_eq!(rippled.scale_factor, 2.0);
        assert!(rippled.figure_error_slice.is_some());
        assert!(rippled.rms_slope > 0.0);
        assert_eq!(flat.rms_slope, 0.0);
        let (flat, rippled) = (
            spread(flat.far_field.as_ref().unwrap()),
            spread(rippled.far_field.as_ref().unwrap()),
        );
        assert!(rippled > 2.0 * flat, "{rippled} <= 2 * {flat}");
    }
    #[test]
    fn lens_thickness_error() {
        let file = NamedTempFile::new().unwrap();
        let z = DVector::from_fn(201, |i, _| -1.0 + 0.01 * usize_to_f64(i));
        let thickness = z.map(|z| 0.04 * (2.0 * PI * z / 0.2).sin());
        write_profile(file.path(), &z, &thickness).unwrap();
        let lens = OpticalElementState::new(ElementKind::CompoundRefractiveLens)
            .with_distances(100.0, 1000.0)
            .with_focal_lengths(Some(1000.0), Some(1000.0))
            .with_lenses(1.0e-5, 50)
            .with_aperture(RectangularAperture::new(0.5, 0.5).unwrap())
            .with_surface_error(SurfaceError::new(file.path(), ProfileDimension::OneD));
        let traced = trace(&lens);
        let tangential_far_field = |calculation_type: CalculationType| {
            let p = HybridInputParameters {
                diffraction_plane: DiffractionPlane::Tangential,
                calculation_type,
                ..params()
            };
            let result = corrected(run(&traced, &p).unwrap());
            assert_eq!(result.far_field_beam().history(), traced.history());
            result.calculation().plane(Plane::Z).unwrap().clone()
        };
        let ideal = tangential_far_field(CalculationType::CrlSize);
        let with_error = tangential_far_field(CalculationType::CrlSizeAndErrorProfile);
        assert!(ideal.figure_error_slice.is_none());
        assert!(with_error.figure_error_slice.is_some());
        // no focal length clipping for lenses
        assert_eq!(ideal.far_field_focal_length, with_error.far_field_focal_length);
        let (ideal, with_error) = (
            spread(ideal.far_field.as_ref().unwrap()),
            spread(with_error.far_field.as_ref().unwrap()),
        );
        assert!(with_error > 2.0 * ideal, "{with_error} <= 2 * {ideal}");
    }
    #[test]
    fn lens_near_field() {
        let lens = OpticalElementState::new(ElementKind::CompoundRefractiveLens)
            .with_distances(100.0, 1000.0)
            .with_focal_lengths(Some(1000.0), Some(1000.0))
            .with_lenses(1.0e-6, 10)
            .with_aperture(RectangularAperture::new(0.5, 0.5).unwrap());
        let traced = trace(&lens);
        let p = HybridInputParameters {
            diffraction_plane: DiffractionPlane::Both1D,
            calculation_type: CalculationType::CrlSize,
            near_field: true,
            ..params()
        };
        let result = corrected(run(&traced, &p).unwrap());
        assert!(result.calculation().plane_x.is_some());
        assert!(result.calculation().plane_z.is_some());
        let near_field = result.near_field_beam().unwrap();
        assert_eq!(near_field.number_of_good_rays(), traced.number_of_good_rays());
        // focused beam: all near field positions lie inside the image window
        for plane in result.calculation().planes() {
            let half_width = plane.near_field.as_ref().unwrap().max_abscissa();
            for value in near_field.column(plane.plane.position_column(), true) {
                assert!(value.abs() <= half_width + 1e-9);
            }
        }
    }
    #[test]
    fn simple_aperture_without_near_field() {
        let traced = trace(&slit(0.3));
        let p = HybridInputParameters {
            near_field: true,
            ..params()
        };
        let result = corrected(run(&traced, &p).unwrap());
        assert!(result.near_field_beam().is_none());
    }
    #[test]
    fn diagnostics() {
        let dir = tempdir().unwrap();
        let traced = trace(&slit(0.3));
        let p = HybridInputParameters {
            diagnostics_directory: Some(dir.path().join("diagnostics")),
            ..params()
        };
        corrected(run(&traced, &p).unwrap());
        for file in ["screen.csv", "hybrid_ff.csv", "histogram_z.csv", "far_field_z.csv"] {
            assert!(dir.path().join("diagnostics").join(file).exists());
        }
        assert!(!dir.path().join("diagnostics").join("hybrid_nf.csv").exists());
    }
    #[test]
    fn progress() {
        struct Recorder(RefCell<Vec<u8>>);
        impl ProgressObserver for Recorder {
            fn progress(&self, percent: u8, _message: &str) {
                self.0.borrow_mut().push(percent);
            }
        }
        let recorder = Recorder(RefCell::new(Vec::new()));
        let traced = trace(&slit(0.3));
        HybridScreen::new(&GeometricTracer)
            .with_observer(&recorder)
            .run(&traced, 1, &params())
            .unwrap();
        let reports = recorder.0.into_inner();
        assert_eq!(reports.first(), Some(&0));
        assert_eq!(reports.last(), Some(&100));
        assert!(reports.windows(2).all(|w| w[1] >= w[0]));
    }
}
