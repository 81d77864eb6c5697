#![warn(missing_docs)]
//! Module for handling single optical rays
//!
//! A [`Ray`] is the fixed-width record used by the ray tracing boundary. It carries 18 columns,
//! addressable by [`Column`] using the traditional (1-based) column numbers of SHADOW ray files:
//!
//! | column | content |
//! |---|---|
//! | 1-3 | position x, y, z |
//! | 4-6 | direction cosines |
//! | 7-9 | s-polarized electric field amplitude |
//! | 10 | good (1) / lost (-1) flag |
//! | 11 | wavenumber in `1/cm` |
//! | 12 | ray index |
//! | 13 | optical path |
//! | 14-15 | phase of the s and p field |
//! | 16-18 | p-polarized electric field amplitude |
//!
//! The beam propagates along `y`, `x` is the sagittal and `z` the tangential transverse coordinate.
use std::{f64::consts::PI, fmt::Display};

use nalgebra::Vector3;
use num::Zero;
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumIter};
use uom::si::f64::{Energy, Length};

use crate::{
    centimeter, electronvolt,
    error::{HyResult, HybridError},
};

/// `h * c` in `eV * cm`.
pub const HC_EV_CM: f64 = 1.239_841_984_332_003e-4;

/// Columns of a [`Ray`] record (SHADOW numbering) plus derived quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumIter, Serialize, Deserialize)]
pub enum Column {
    /// position x (sagittal)
    X,
    /// position y (along the beam)
    Y,
    /// position z (tangential)
    Z,
    /// direction cosine x
    Vx,
    /// direction cosine y
    Vy,
    /// direction cosine z
    Vz,
    /// s-polarized field, x component
    EsX,
    /// s-polarized field, y component
    EsY,
    /// s-polarized field, z component
    EsZ,
    /// good / lost flag
    Flag,
    /// wavenumber in `1/cm`
    Wavenumber,
    /// ray index
    Index,
    /// optical path
    OpticalPath,
    /// phase of the s-polarized field
    PhaseS,
    /// phase of the p-polarized field
    PhaseP,
    /// p-polarized field, x component
    EpX,
    /// p-polarized field, y component
    EpY,
    /// p-polarized field, z component
    EpZ,
    /// derived: total intensity `|Es|^2 + |Ep|^2`
    Intensity,
    /// derived: angle in the sagittal plane `atan(vx/vy)`
    AngleX,
    /// derived: angle in the tangential plane `atan(vz/vy)`
    AngleZ,
}
impl Column {
    /// Returns the column for a SHADOW column number (1..=18).
    #[must_use]
    pub const fn from_number(number: usize) -> Option<Self> {
        match number {
            1 => Some(Self::X),
            2 => Some(Self::Y),
            3 => Some(Self::Z),
            4 => Some(Self::Vx),
            5 => Some(Self::Vy),
            6 => Some(Self::Vz),
            7 => Some(Self::EsX),
            8 => Some(Self::EsY),
            9 => Some(Self::EsZ),
            10 => Some(Self::Flag),
            11 => Some(Self::Wavenumber),
            12 => Some(Self::Index),
            13 => Some(Self::OpticalPath),
            14 => Some(Self::PhaseS),
            15 => Some(Self::PhaseP),
            16 => Some(Self::EpX),
            17 => Some(Self::EpY),
            18 => Some(Self::EpZ),
            _ => None,
        }
    }
}

/// Transverse plane of a beam in which diffraction is calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumIter)]
pub enum Plane {
    /// sagittal plane (`x`)
    X,
    /// tangential plane (`z`)
    Z,
}
impl Plane {
    /// Returns the position [`Column`] of this [`Plane`].
    #[must_use]
    pub const fn position_column(&self) -> Column {
        match self {
            Self::X => Column::X,
            Self::Z => Column::Z,
        }
    }
    /// Returns the angle [`Column`] of this [`Plane`].
    #[must_use]
    pub const fn angle_column(&self) -> Column {
        match self {
            Self::X => Column::AngleX,
            Self::Z => Column::AngleZ,
        }
    }
    /// Running number of the plane (X: 0, Z: 1).
    #[must_use]
    pub const fn index(&self) -> u64 {
        match self {
            Self::X => 0,
            Self::Z => 1,
        }
    }
}

/// Struct that contains all information about an optical ray
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ray {
    /// position of the ray in the local frame of the current plane
    pos: Vector3<f64>,
    /// propagation direction (direction cosines)
    dir: Vector3<f64>,
    /// s-polarized electric field amplitude
    e_s: Vector3<f64>,
    /// p-polarized electric field amplitude
    e_p: Vector3<f64>,
    phase_s: f64,
    phase_p: f64,
    /// wavenumber in `1/cm`
    wavenumber: f64,
    index: usize,
    optical_path: f64,
    /// true if the ray is "good", false if it was lost at an aperture
    valid: bool,
}
impl Ray {
    /// Creates a new [`Ray`] with a unit s-polarized field.
    ///
    /// The direction vector is normalized and thus stored as direction cosines.
    ///
    /// # Errors
    /// This function returns an error if
    ///  - the wavenumber is <= 0.0, `NaN` or +inf
    ///  - the position is not finite
    ///  - the direction vector has a zero length or is not finite
    pub fn new(
        index: usize,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        wavenumber: f64,
    ) -> HyResult<Self> {
        if !wavenumber.is_normal() || wavenumber.is_sign_negative() {
            return Err(HybridError::Beam("wavenumber must be >0 and finite".into()));
        }
        if position.iter().any(|c| !c.is_finite()) {
            return Err(HybridError::Beam("position must be finite".into()));
        }
        if direction.norm().is_zero() || !direction.norm().is_finite() {
            return Err(HybridError::Beam(
                "length of direction must be >0 and finite".into(),
            ));
        }
        Ok(Self {
            pos: position,
            dir: direction.normalize(),
            e_s: Vector3::x(),
            e_p: Vector3::zeros(),
            phase_s: 0.0,
            phase_p: 0.0,
            wavenumber,
            index,
            optical_path: 0.0,
            valid: true,
        })
    }
    /// Creates a new [`Ray`] from a given photon energy.
    ///
    /// # Errors
    /// This function returns an error if the energy is not positive or the other parameters are invalid
    /// (see [`Ray::new`]).
    pub fn from_energy(
        index: usize,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        energy: Energy,
    ) -> HyResult<Self> {
        let energy_ev = energy.get::<uom::si::energy::electronvolt>();
        if !energy_ev.is_normal() || energy_ev.is_sign_negative() {
            return Err(HybridError::Beam("energy must be >0 and finite".into()));
        }
        Self::new(index, position, direction, 2.0 * PI * energy_ev / HC_EV_CM)
    }
    /// Create a [`Ray`] from the 18 column values.
    ///
    /// # Errors
    /// This function returns an error if the values do not represent a valid ray (see [`Ray::new`]).
    pub fn from_columns(columns: &[f64; 18]) -> HyResult<Self> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = columns[11].max(0.0).round() as usize;
        let mut ray = Self::new(
            index,
            Vector3::new(columns[0], columns[1], columns[2]),
            Vector3::new(columns[3], columns[4], columns[5]),
            columns[10],
        )?;
        ray.e_s = Vector3::new(columns[6], columns[7], columns[8]);
        ray.valid = columns[9] > 0.0;
        ray.optical_path = columns[12];
        ray.phase_s = columns[13];
        ray.phase_p = columns[14];
        ray.e_p = Vector3::new(columns[15], columns[16], columns[17]);
        Ok(ray)
    }
    /// Returns the 18 column values of this [`Ray`].
    #[must_use]
    pub fn to_columns(&self) -> [f64; 18] {
        [
            self.pos.x,
            self.pos.y,
            self.pos.z,
            self.dir.x,
            self.dir.y,
            self.dir.z,
            self.e_s.x,
            self.e_s.y,
            self.e_s.z,
            if self.valid { 1.0 } else { -1.0 },
            self.wavenumber,
            crate::utils::usize_to_f64(self.index),
            self.optical_path,
            self.phase_s,
            self.phase_p,
            self.e_p.x,
            self.e_p.y,
            self.e_p.z,
        ]
    }
    /// Returns the value of the given [`Column`].
    #[must_use]
    pub fn column(&self, column: Column) -> f64 {
        match column {
            Column::Intensity => self.intensity(),
            Column::AngleX => self.angle_x(),
            Column::AngleZ => self.angle_z(),
            Column::X => self.pos.x,
            Column::Y => self.pos.y,
            Column::Z => self.pos.z,
            Column::Vx => self.dir.x,
            Column::Vy => self.dir.y,
            Column::Vz => self.dir.z,
            Column::EsX => self.e_s.x,
            Column::EsY => self.e_s.y,
            Column::EsZ => self.e_s.z,
            Column::Flag => {
                if self.valid {
                    1.0
                } else {
                    -1.0
                }
            }
            Column::Wavenumber => self.wavenumber,
            Column::Index => crate::utils::usize_to_f64(self.index),
            Column::OpticalPath => self.optical_path,
            Column::PhaseS => self.phase_s,
            Column::PhaseP => self.phase_p,
            Column::EpX => self.e_p.x,
            Column::EpY => self.e_p.y,
            Column::EpZ => self.e_p.z,
        }
    }
    /// Returns the position of this [`Ray`].
    #[must_use]
    pub const fn position(&self) -> Vector3<f64> {
        self.pos
    }
    /// Sets the position of this [`Ray`].
    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.pos = position;
    }
    /// Returns the direction (direction cosines) of this [`Ray`].
    #[must_use]
    pub const fn direction(&self) -> Vector3<f64> {
        self.dir
    }
    /// Sets the direction of this [`Ray`]. The given vector is normalized.
    ///
    /// # Errors
    ///
    /// This function will return an error if the direction vector has zero length or is not finite.
    pub fn set_direction(&mut self, dir: Vector3<f64>) -> HyResult<()> {
        let norm = dir.norm();
        if norm.is_zero() || !norm.is_finite() {
            return Err(HybridError::Beam(
                "length of direction must be >0 and finite".into(),
            ));
        }
        self.dir = dir / norm;
        Ok(())
    }
    /// Returns the wavenumber of this [`Ray`] in `1/cm`.
    #[must_use]
    pub const fn wavenumber(&self) -> f64 {
        self.wavenumber
    }
    /// Returns the wavelength of this [`Ray`].
    #[must_use]
    pub fn wavelength(&self) -> Length {
        centimeter!(2.0 * PI / self.wavenumber)
    }
    /// Returns the photon energy of this [`Ray`].
    #[must_use]
    pub fn photon_energy(&self) -> Energy {
        electronvolt!(HC_EV_CM * self.wavenumber / (2.0 * PI))
    }
    /// Returns the index of this [`Ray`].
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
    /// Returns the optical path of this [`Ray`].
    #[must_use]
    pub const fn optical_path(&self) -> f64 {
        self.optical_path
    }
    /// Sets the s- and p-polarized field amplitudes.
    pub fn set_fields(&mut self, e_s: Vector3<f64>, e_p: Vector3<f64>) {
        self.e_s = e_s;
        self.e_p = e_p;
    }
    /// Returns the intensity `|Es|^2 + |Ep|^2` of this [`Ray`].
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.e_s.norm_squared() + self.e_p.norm_squared()
    }
    /// Returns `true` if this [`Ray`] is good (not lost).
    #[must_use]
    pub const fn valid(&self) -> bool {
        self.valid
    }
    /// Flag this [`Ray`] as lost.
    pub fn set_lost(&mut self) {
        self.valid = false;
    }
    /// Angle of the ray direction in the sagittal (x-y) plane: `atan(vx/vy)`.
    #[must_use]
    pub fn angle_x(&self) -> f64 {
        (self.dir.x / self.dir.y).atan()
    }
    /// Angle of the ray direction in the tangential (z-y) plane: `atan(vz/vy)`.
    #[must_use]
    pub fn angle_z(&self) -> f64 {
        (self.dir.z / self.dir.y).atan()
    }
    /// Set the direction from the tangents of the angles in the sagittal and the tangential plane.
    ///
    /// The resulting direction cosines are normalized: `vy = 1/sqrt(1 + tan_x^2 + tan_z^2)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the tangents is not finite.
    pub fn set_direction_from_tangents(&mut self, tan_x: f64, tan_z: f64) -> HyResult<()> {
        if !tan_x.is_finite() || !tan_z.is_finite() {
            return Err(HybridError::Beam("direction tangents must be finite".into()));
        }
        let norm = tan_z.mul_add(tan_z, tan_x.mul_add(tan_x, 1.0)).sqrt();
        self.dir = Vector3::new(tan_x / norm, 1.0 / norm, tan_z / norm);
        Ok(())
    }
    /// Propagate the ray freely to a plane at the given distance along `y`.
    ///
    /// After propagation the position is expressed in the frame of the new plane, i.e. `y` is reset to
    /// zero. The optical path is increased by the geometric path length.
    ///
    /// # Errors
    /// This functions returns an error if
    ///   - the distance is not finite
    ///   - the ray does not propagate along `y` (`vy == 0`)
    pub fn retrace(&mut self, distance: f64) -> HyResult<()> {
        if !distance.is_finite() {
            return Err(HybridError::Beam(
                "propagation distance must be finite".into(),
            ));
        }
        if self.dir.y.abs() < f64::EPSILON {
            return Err(HybridError::Beam(
                "cannot retrace a ray not propagating along y".into(),
            ));
        }
        let length = (distance - self.pos.y) / self.dir.y;
        self.pos += length * self.dir;
        self.pos.y = 0.0;
        self.optical_path += length;
        Ok(())
    }
}
impl Display for Ray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ray #{} {{pos: ({:.6e}, {:.6e}, {:.6e}), dir: ({:.6e}, {:.6e}, {:.6e}), k: {:.6e} 1/cm, {}}}",
            self.index,
            self.pos.x,
            self.pos.y,
            self.pos.z,
            self.dir.x,
            self.dir.y,
            self.dir.z,
            self.wavenumber,
            if self.valid { "good" } else { "lost" }
        )
    }
}
