//! User parameters of a hybrid calculation
use std::{fs::File, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    error::{HyResult, HybridError},
    optical_element::ElementKind,
    ray::Plane,
    units::LengthUnit,
};

/// Hard upper limit of the number of FFT points.
pub const FFT_POINTS_LIMIT: usize = 16_777_216;
/// Smallest number of FFT points.
pub const FFT_POINTS_MIN: usize = 256;

/// Plane(s) in which diffraction is calculated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum DiffractionPlane {
    /// sagittal plane (X)
    Sagittal,
    /// tangential plane (Z)
    #[default]
    Tangential,
    /// both planes, coupled 2D propagation (calculated as two decoupled 1D planes)
    Both2D,
    /// both planes, two independent 1D propagations
    Both1D,
}
impl DiffractionPlane {
    /// Returns the planes of this selection.
    #[must_use]
    pub fn planes(&self) -> Vec<Plane> {
        match self {
            Self::Sagittal => vec![Plane::X],
            Self::Tangential => vec![Plane::Z],
            Self::Both2D | Self::Both1D => vec![Plane::X, Plane::Z],
        }
    }
    /// Returns `true` if both planes are requested.
    #[must_use]
    pub const fn is_two_plane(&self) -> bool {
        matches!(self, Self::Both2D | Self::Both1D)
    }
}

/// Type of the hybrid calculation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum CalculationType {
    /// diffraction at a simple aperture (slit)
    #[default]
    SimpleAperture,
    /// diffraction by the finite size of a mirror or grating
    MirrorOrGratingSize,
    /// diffraction by the finite size and the figure error of a mirror or grating
    MirrorSizeAndErrorProfile,
    /// diffraction by the finite size of a compound refractive lens
    CrlSize,
    /// diffraction by the finite size and the thickness error of a compound refractive lens
    CrlSizeAndErrorProfile,
}
impl CalculationType {
    /// Returns `true` if the calculation includes a figure (thickness) error.
    #[must_use]
    pub const fn has_figure_error(&self) -> bool {
        matches!(
            self,
            Self::MirrorSizeAndErrorProfile | Self::CrlSizeAndErrorProfile
        )
    }
    /// Returns `true` if the calculation is done for a mirror or grating.
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        matches!(
            self,
            Self::MirrorOrGratingSize | Self::MirrorSizeAndErrorProfile
        )
    }
    /// Returns `true` if this calculation type can be applied to the given element kind.
    #[must_use]
    pub const fn matches(&self, kind: ElementKind) -> bool {
        match self {
            Self::SimpleAperture => matches!(kind, ElementKind::ScreenSlit),
            Self::MirrorOrGratingSize | Self::MirrorSizeAndErrorProfile => {
                matches!(kind, ElementKind::Mirror | ElementKind::Grating)
            }
            Self::CrlSize | Self::CrlSizeAndErrorProfile => {
                matches!(kind, ElementKind::CompoundRefractiveLens)
            }
        }
    }
}

/// User parameters of a hybrid calculation.
///
/// All fields are optional in YAML files and fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridInputParameters {
    /// plane(s) in which diffraction is calculated
    pub diffraction_plane: DiffractionPlane,
    /// type of the calculation
    pub calculation_type: CalculationType,
    /// calculate the near field (position correction) in addition to the far field
    pub near_field: bool,
    /// focal length of the near field calculation (default: focal length of the element)
    pub focal_length: Option<f64>,
    /// propagation distance (default: image distance of the element)
    pub distance: Option<f64>,
    /// number of histogram bins in the sagittal plane
    pub nbins_x: usize,
    /// number of histogram bins in the tangential plane
    pub nbins_z: usize,
    /// number of diffraction peaks resolved by the far field calculation
    pub npeak: usize,
    /// maximum number of FFT points
    pub fft_points: usize,
    /// length unit of the beam and element coordinates
    pub length_unit: LengthUnit,
    /// seed of the random generators
    pub random_seed: u64,
    /// grid enlargement for planes in which the beam is not cut by the element
    pub uncut_conditioning_factor: f64,
    /// directory for diagnostic output (beams and distributions), no output if `None`
    pub diagnostics_directory: Option<PathBuf>,
}
impl Default for HybridInputParameters {
    fn default() -> Self {
        Self {
            diffraction_plane: DiffractionPlane::default(),
            calculation_type: CalculationType::default(),
            near_field: false,
            focal_length: None,
            distance: None,
            nbins_x: 200,
            nbins_z: 200,
            npeak: 20,
            fft_points: 4_000_000,
            length_unit: LengthUnit::default(),
            random_seed: 25,
            uncut_conditioning_factor: 2.0,
            diagnostics_directory: None,
        }
    }
}
impl HybridInputParameters {
    /// Read [`HybridInputParameters`] from a YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or parsed or the parameters are invalid.
    pub fn from_yaml_file(path: &Path) -> HyResult<Self> {
        let file = File::open(path).map_err(|e| {
            HybridError::Configuration(format!("cannot open {}: {e}", path.display()))
        })?;
        let params: Self = serde_yaml::from_reader(file).map_err(|e| {
            HybridError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        params.validate()?;
        Ok(params)
    }
    /// Check the parameters for consistency.
    ///
    /// # Errors
    ///
    /// This function will return a [`HybridError::Configuration`] if
    ///   - a bin count, the number of peaks or the number of FFT points is zero
    ///   - the number of FFT points exceeds [`FFT_POINTS_LIMIT`]
    ///   - the focal length or the distance is zero or not finite
    ///   - the conditioning factor is < 1.0 or not finite
    pub fn validate(&self) -> HyResult<()> {
        if self.nbins_x == 0 || self.nbins_z == 0 {
            return Err(HybridError::Configuration(
                "number of bins must be > 0".into(),
            ));
        }
        if self.npeak == 0 {
            return Err(HybridError::Configuration(
                "number of diffraction peaks must be > 0".into(),
            ));
        }
        if self.fft_points == 0 || self.fft_points > FFT_POINTS_LIMIT {
            return Err(HybridError::Configuration(format!(
                "number of FFT points must be in 1..={FFT_POINTS_LIMIT}"
            )));
        }
        if let Some(f) = self.focal_length {
            if !f.is_normal() {
                return Err(HybridError::Configuration(
                    "focal length must be non-zero and finite".into(),
                ));
            }
        }
        if let Some(d) = self.distance {
            if !d.is_normal() {
                return Err(HybridError::Configuration(
                    "propagation distance must be non-zero and finite".into(),
                ));
            }
        }
        if !self.uncut_conditioning_factor.is_finite() || self.uncut_conditioning_factor < 1.0 {
            return Err(HybridError::Configuration(
                "conditioning factor must be >= 1.0".into(),
            ));
        }
        Ok(())
    }
    /// Returns the number of histogram bins configured for the given plane.
    #[must_use]
    pub const fn nbins(&self, plane: Plane) -> usize {
        match plane {
            Plane::X => self.nbins_x,
            Plane::Z => self.nbins_z,
        }
    }
}
