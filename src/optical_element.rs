#![warn(missing_docs)]
//! Configuration snapshots of optical elements
//!
//! An [`OpticalElementState`] holds all configuration values of one optical element as needed by the ray
//! tracer and the hybrid calculation. States are plain values: modifications for "what-if" recalculations
//! are done by transforms returning new values (see [`OpticalElementState::without_builtin_surface_error`]
//! and [`OpticalElementState::with_image_distance`]).
//!
//! ```rust
//! use hybrid_screen::optical_element::{ElementKind, OpticalElementState, RectangularAperture};
//!
//! let slit = OpticalElementState::new(ElementKind::ScreenSlit)
//!     .with_aperture(RectangularAperture::new(1.0, 0.3).unwrap());
//! assert!(slit.aperture().is_some());
//! ```
use std::{
    fs::File,
    path::{Path, PathBuf},
};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    error::{HyResult, HybridError},
    ray::{Plane, Ray},
};

/// Kind of an optical element
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum ElementKind {
    /// an empty element with a slit. This is the default.
    #[default]
    ScreenSlit,
    /// a (grazing incidence) mirror
    Mirror,
    /// a (grazing incidence) grating
    Grating,
    /// a compound refractive lens
    CompoundRefractiveLens,
}
impl ElementKind {
    /// Returns `true` for mirrors and gratings.
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        matches!(self, Self::Mirror | Self::Grating)
    }
}

/// A rectangular aperture defined by its half widths and center point.
///
/// The first axis is the sagittal direction (`x`). The second axis is the tangential direction (`z`) for
/// slits and lenses and the coordinate along the surface for reflective elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularAperture {
    half_width_x: f64,
    half_width_z: f64,
    #[serde(default = "origin")]
    center: Point2<f64>,
}
fn origin() -> Point2<f64> {
    Point2::origin()
}
impl RectangularAperture {
    /// Create a new [`RectangularAperture`] centered at the origin.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the half widths is negative, zero, NaN or Infinity.
    pub fn new(half_width_x: f64, half_width_z: f64) -> HyResult<Self> {
        if half_width_x.is_normal()
            && half_width_x.is_sign_positive()
            && half_width_z.is_normal()
            && half_width_z.is_sign_positive()
        {
            Ok(Self {
                half_width_x,
                half_width_z,
                center: Point2::origin(),
            })
        } else {
            Err(HybridError::Configuration(
                "aperture half widths must be positive".into(),
            ))
        }
    }
    /// Move the center of this [`RectangularAperture`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the center point is not finite.
    pub fn with_center(mut self, center: Point2<f64>) -> HyResult<Self> {
        if !center.x.is_finite() || !center.y.is_finite() {
            return Err(HybridError::Configuration(
                "aperture center must be finite".into(),
            ));
        }
        self.center = center;
        Ok(self)
    }
    /// Returns the lower and upper bound of the aperture along the given plane.
    #[must_use]
    pub fn bounds(&self, plane: Plane) -> (f64, f64) {
        match plane {
            Plane::X => (
                self.center.x - self.half_width_x,
                self.center.x + self.half_width_x,
            ),
            Plane::Z => (
                self.center.y - self.half_width_z,
                self.center.y + self.half_width_z,
            ),
        }
    }
    /// Returns `true` if the given point (aperture coordinates) lies inside the aperture (borders included).
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        (point.x - self.center.x).abs() <= self.half_width_x
            && (point.y - self.center.y).abs() <= self.half_width_z
    }
}

/// Dimension of a surface error profile
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ProfileDimension {
    /// height vs. position (along the element)
    #[default]
    OneD,
    /// height map over the element surface
    TwoD,
}

/// Reference to a surface (figure) error file of an optical element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceError {
    path: PathBuf,
    #[serde(default)]
    dimension: ProfileDimension,
    /// if `false` the tracer does not apply the error
    #[serde(default = "enabled_default")]
    enabled: bool,
}
const fn enabled_default() -> bool {
    true
}
impl SurfaceError {
    /// Creates a new (enabled) [`SurfaceError`] reference.
    #[must_use]
    pub fn new(path: &Path, dimension: ProfileDimension) -> Self {
        Self {
            path: path.to_path_buf(),
            dimension,
            enabled: true,
        }
    }
    /// Returns the path of the surface error file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// Returns the dimension of the surface error profile.
    #[must_use]
    pub const fn dimension(&self) -> ProfileDimension {
        self.dimension
    }
    /// Returns `true` if the surface error is applied during ray tracing.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Snapshot of all configuration values of an optical element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalElementState {
    kind: ElementKind,
    source_distance: f64,
    image_distance: f64,
    aperture: Option<RectangularAperture>,
    grazing_angle: f64,
    focal_length_x: Option<f64>,
    focal_length_z: Option<f64>,
    refractive_decrement: f64,
    number_of_lenses: usize,
    surface_error: Option<SurfaceError>,
}
impl OpticalElementState {
    /// Creates a new [`OpticalElementState`] of the given kind.
    ///
    /// The element has no aperture (infinite extent), zero distances and no focusing power.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            number_of_lenses: usize::from(kind == ElementKind::CompoundRefractiveLens),
            ..Self::default()
        }
    }
    /// Read an [`OpticalElementState`] from a YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be opened, cannot be parsed or the values
    /// are inconsistent (see [`OpticalElementState::validate`]).
    pub fn from_yaml_file(path: &Path) -> HyResult<Self> {
        let file = File::open(path).map_err(|e| {
            HybridError::Configuration(format!("cannot open {}: {e}", path.display()))
        })?;
        let state: Self = serde_yaml::from_reader(file).map_err(|e| {
            HybridError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        state.validate()?;
        Ok(state)
    }
    /// Check the consistency of this [`OpticalElementState`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - a distance is negative or not finite
    ///   - a reflective element has no grazing angle in `(0, 1000*pi/2]` mrad
    ///   - a focal length is zero or not finite
    ///   - a lens has no lenses or a negative refractive decrement
    pub fn validate(&self) -> HyResult<()> {
        if !self.source_distance.is_finite()
            || self.source_distance.is_sign_negative()
            || !self.image_distance.is_finite()
            || self.image_distance.is_sign_negative()
        {
            return Err(HybridError::Configuration(
                "source and image distance must be >= 0 and finite".into(),
            ));
        }
        if self.kind.is_reflective()
            && !(self.grazing_angle > 0.0 && self.grazing_angle <= 1000.0 * std::f64::consts::FRAC_PI_2)
        {
            return Err(HybridError::Configuration(format!(
                "invalid grazing angle {} mrad for {}",
                self.grazing_angle, self.kind
            )));
        }
        for f in [self.focal_length_x, self.focal_length_z].into_iter().flatten() {
            if !f.is_normal() {
                return Err(HybridError::Configuration(
                    "focal length must be non-zero and finite".into(),
                ));
            }
        }
        if self.kind == ElementKind::CompoundRefractiveLens
            && (self.number_of_lenses == 0
                || !self.refractive_decrement.is_finite()
                || self.refractive_decrement.is_sign_negative())
        {
            return Err(HybridError::Configuration(
                "lens needs at least one lens and a refractive decrement >= 0".into(),
            ));
        }
        Ok(())
    }
    /// Returns the kind of this optical element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }
    /// Returns the distance from the previous plane to this element.
    #[must_use]
    pub const fn source_distance(&self) -> f64 {
        self.source_distance
    }
    /// Returns the distance from this element to its image plane.
    #[must_use]
    pub const fn image_distance(&self) -> f64 {
        self.image_distance
    }
    /// Returns the aperture or `None` for an element of infinite extent.
    #[must_use]
    pub const fn aperture(&self) -> Option<&RectangularAperture> {
        self.aperture.as_ref()
    }
    /// Returns the grazing angle (mrad) of a reflective element.
    #[must_use]
    pub const fn grazing_angle(&self) -> f64 {
        self.grazing_angle
    }
    /// Returns the ideal focal length in the given plane (`None` = no focusing).
    #[must_use]
    pub const fn focal_length(&self, plane: Plane) -> Option<f64> {
        match plane {
            Plane::X => self.focal_length_x,
            Plane::Z => self.focal_length_z,
        }
    }
    /// Returns the refractive decrement `delta` of a single lens.
    #[must_use]
    pub const fn refractive_decrement(&self) -> f64 {
        self.refractive_decrement
    }
    /// Returns the number of lenses of a compound refractive lens.
    #[must_use]
    pub const fn number_of_lenses(&self) -> usize {
        self.number_of_lenses
    }
    /// Returns the surface error reference of this element.
    #[must_use]
    pub const fn surface_error(&self) -> Option<&SurfaceError> {
        self.surface_error.as_ref()
    }
    /// Set the source and image distances.
    #[must_use]
    pub const fn with_distances(mut self, source_distance: f64, image_distance: f64) -> Self {
        self.source_distance = source_distance;
        self.image_distance = image_distance;
        self
    }
    /// Set the aperture of this element.
    #[must_use]
    pub fn with_aperture(mut self, aperture: RectangularAperture) -> Self {
        self.aperture = Some(aperture);
        self
    }
    /// Set the grazing angle (mrad).
    #[must_use]
    pub const fn with_grazing_angle(mut self, grazing_angle: f64) -> Self {
        self.grazing_angle = grazing_angle;
        self
    }
    /// Set the ideal focal lengths in both planes.
    #[must_use]
    pub const fn with_focal_lengths(
        mut self,
        focal_length_x: Option<f64>,
        focal_length_z: Option<f64>,
    ) -> Self {
        self.focal_length_x = focal_length_x;
        self.focal_length_z = focal_length_z;
        self
    }
    /// Set the lens parameters of a compound refractive lens.
    #[must_use]
    pub const fn with_lenses(mut self, refractive_decrement: f64, number_of_lenses: usize) -> Self {
        self.refractive_decrement = refractive_decrement;
        self.number_of_lenses = number_of_lenses;
        self
    }
    /// Set the surface error reference.
    #[must_use]
    pub fn with_surface_error(mut self, surface_error: SurfaceError) -> Self {
        self.surface_error = Some(surface_error);
        self
    }
    /// Returns a copy of this state with the surface error disabled for ray tracing.
    ///
    /// The file reference is kept, so that the error can still be applied externally.
    #[must_use]
    pub fn without_builtin_surface_error(&self) -> Self {
        let mut state = self.clone();
        if let Some(surface_error) = state.surface_error.as_mut() {
            surface_error.enabled = false;
        }
        state
    }
    /// Returns a copy of this state with the given image distance.
    #[must_use]
    pub fn with_image_distance(&self, image_distance: f64) -> Self {
        let mut state = self.clone();
        state.image_distance = image_distance;
        state
    }
    /// Coordinates of a ray (positioned on the element plane) in the frame of the aperture.
    ///
    /// For reflective elements the second coordinate is projected onto the element surface
    /// (`z / sin(grazing angle)`).
    #[must_use]
    pub fn aperture_coordinates(&self, ray: &Ray) -> Point2<f64> {
        let position = ray.position();
        if self.kind.is_reflective() {
            Point2::new(position.x, position.z / (self.grazing_angle / 1000.0).sin())
        } else {
            Point2::new(position.x, position.z)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use nalgebra::{point, vector, Vector3};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn aperture_new() {
        assert!(RectangularAperture::new(1.0, 0.0).is_err());
        assert!(RectangularAperture::new(-1.0, 1.0).is_err());
        assert!(RectangularAperture::new(f64::INFINITY, 1.0).is_err());
        let a = RectangularAperture::new(1.0, 0.5).unwrap();
        assert_eq!(a.bounds(Plane::X), (-1.0, 1.0));
        assert_eq!(a.bounds(Plane::Z), (-0.5, 0.5));
    }
    #[test]
    fn aperture_contains() {
        let a = RectangularAperture::new(1.0, 0.5)
            .unwrap()
            .with_center(point![1.0, 0.0])
            .unwrap();
        assert!(a.contains(&point![0.0, 0.5]));
        assert!(a.contains(&point![2.0, -0.5]));
        assert!(!a.contains(&point![-0.1, 0.0]));
        assert!(!a.contains(&point![1.0, 0.6]));
        assert!(RectangularAperture::new(1.0, 0.5)
            .unwrap()
            .with_center(point![f64::NAN, 0.0])
            .is_err());
    }
    #[test]
    fn new() {
        let s = OpticalElementState::new(ElementKind::Mirror);
        assert_eq!(s.kind(), ElementKind::Mirror);
        assert!(s.aperture().is_none());
        assert_eq!(s.focal_length(Plane::X), None);
        assert_eq!(s.number_of_lenses(), 0);
        let s = OpticalElementState::new(ElementKind::CompoundRefractiveLens);
        assert_eq!(s.number_of_lenses(), 1);
    }
    #[test]
    fn transforms() {
        let s = OpticalElementState::new(ElementKind::Mirror)
            .with_distances(1000.0, 500.0)
            .with_surface_error(SurfaceError::new(
                Path::new("error.dat"),
                ProfileDimension::OneD,
            ));
        let s2 = s.without_builtin_surface_error();
        assert!(s.surface_error().unwrap().enabled());
        assert!(!s2.surface_error().unwrap().enabled());
        assert_eq!(s2.surface_error().unwrap().path(), Path::new("error.dat"));
        let s3 = s.with_image_distance(0.0);
        assert_eq!(s3.image_distance(), 0.0);
        assert_eq!(s.image_distance(), 500.0);
    }
    #[test]
    fn validate() {
        assert!(OpticalElementState::default().validate().is_ok());
        assert!(OpticalElementState::new(ElementKind::Mirror).validate().is_err());
        assert!(OpticalElementState::new(ElementKind::Mirror)
            .with_grazing_angle(3.0)
            .validate()
            .is_ok());
        assert!(OpticalElementState::default()
            .with_distances(-1.0, 0.0)
            .validate()
            .is_err());
        assert!(OpticalElementState::default()
            .with_focal_lengths(Some(0.0), None)
            .validate()
            .is_err());
        assert!(OpticalElementState::new(ElementKind::CompoundRefractiveLens)
            .with_lenses(1.0e-6, 0)
            .validate()
            .is_err());
    }
    #[test]
    fn aperture_coordinates() {
        let ray = Ray::new(0, vector![0.1, 0.0, 0.003], Vector3::y(), 1.0e8).unwrap();
        let slit = OpticalElementState::default();
        assert_eq!(slit.aperture_coordinates(&ray), point![0.1, 0.003]);
        let mirror = OpticalElementState::new(ElementKind::Mirror).with_grazing_angle(3.0);
        let p = mirror.aperture_coordinates(&ray);
        assert_abs_diff_eq!(p.y, 0.003 / 0.003_f64.sin(), epsilon = 1e-12);
    }
    #[test]
    fn from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "kind: Mirror\nsource_distance: 3000.0\nimage_distance: 1000.0\ngrazing_angle: 3.0\naperture:\n  half_width_x: 5.0\n  half_width_z: 50.0\nfocal_length_z: 750.0"
        )
        .unwrap();
        let s = OpticalElementState::from_yaml_file(file.path()).unwrap();
        assert_eq!(s.kind(), ElementKind::Mirror);
        assert_eq!(s.focal_length(Plane::Z), Some(750.0));
        assert_eq!(s.aperture().unwrap().bounds(Plane::Z), (-50.0, 50.0));
        assert_matches!(
            OpticalElementState::from_yaml_file(Path::new("./invalid_file.yaml")),
            Err(HybridError::Configuration(_))
        );
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "kind: Mirror").unwrap();
        assert_matches!(
            OpticalElementState::from_yaml_file(file.path()),
            Err(HybridError::Configuration(_))
        );
    }
}
