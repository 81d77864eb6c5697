#![warn(missing_docs)]
//! Shorthand macros for the `uom` quantities used at the crate boundaries.
//!
//! The hybrid calculation itself works on plain `f64` values in the length unit of the beam. Quantities with a
//! unit only show up when converting between photon energy, wavelength and the user length unit.

/// Build a quantity of `$quantity` in `$unit` from a single value or a list of values.
#[macro_export]
macro_rules! uom_quantity {
    ($quantity:ident, $unit:ident, $value:expr) => {
        $quantity::new::<$unit>($value)
    };
    ($quantity:ident, $unit:ident, $( $value:expr ),+) => {
        vec![$( $quantity::new::<$unit>($value) ),+]
    };
}

/// Length in centimeter (the internal length unit of the beam).
#[macro_export]
macro_rules! centimeter {
    ($( $value:expr ),+) => {{
        use uom::si::{f64::Length, length::centimeter};
        $crate::uom_quantity![Length, centimeter, $( $value ),+]
    }};
}
/// Length in millimeter.
#[macro_export]
macro_rules! millimeter {
    ($( $value:expr ),+) => {{
        use uom::si::{f64::Length, length::millimeter};
        $crate::uom_quantity![Length, millimeter, $( $value ),+]
    }};
}
/// Photon energy in electronvolt.
#[macro_export]
macro_rules! electronvolt {
    ($( $value:expr ),+) => {{
        use uom::si::{energy::electronvolt, f64::Energy};
        $crate::uom_quantity![Energy, electronvolt, $( $value ),+]
    }};
}
