#![warn(missing_docs)]
//! User length units.
//!
//! Ray positions, optical element dimensions and figure error files are given in the user's
//! length unit. Wavenumbers of rays are always stored in `1/cm`.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uom::si::{
    f64::Length,
    length::{centimeter, meter, millimeter},
};

/// Length unit of all user coordinates.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter,
)]
pub enum LengthUnit {
    /// meter (unit code 0)
    Meter,
    /// centimeter (unit code 1). This is the default.
    #[default]
    Centimeter,
    /// millimeter (unit code 2)
    Millimeter,
}
impl LengthUnit {
    /// Create a [`LengthUnit`] from its numeric unit code (0: m, 1: cm, 2: mm).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Meter),
            1 => Some(Self::Centimeter),
            2 => Some(Self::Millimeter),
            _ => None,
        }
    }
    /// Multiplicative factor converting a length in centimeters into this unit.
    #[must_use]
    pub const fn factor_from_centimeter(&self) -> f64 {
        match self {
            Self::Meter => 1.0e-2,
            Self::Centimeter => 1.0,
            Self::Millimeter => 10.0,
        }
    }
    /// Express a [`Length`] as a plain value in this unit.
    #[must_use]
    pub fn value_of(&self, length: Length) -> f64 {
        match self {
            Self::Meter => length.get::<meter>(),
            Self::Centimeter => length.get::<centimeter>(),
            Self::Millimeter => length.get::<millimeter>(),
        }
    }
    /// Create a [`Length`] from a plain value given in this unit.
    #[must_use]
    pub fn length(&self, value: f64) -> Length {
        match self {
            Self::Meter => Length::new::<meter>(value),
            Self::Centimeter => Length::new::<centimeter>(value),
            Self::Millimeter => Length::new::<millimeter>(value),
        }
    }
}
