#![warn(missing_docs)]
//! Trace history of a [`Beam`]
//!
//! Every trace through an optical element appends one [`HistoryEntry`] to the traced beam. The entry keeps
//! the state of the element before and after the trace together with a snapshot of the input rays, so that
//! the pre-element geometry can be recovered later on.
use serde::{Deserialize, Serialize};

use crate::{beam::Beam, optical_element::OpticalElementState};

/// Per-ray coordinates of the beam on an optical element.
///
/// For reflective elements `width` is the coordinate across (sagittal) and `length` the coordinate along
/// the element surface. The grazing angles are given in mrad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    width: Vec<f64>,
    length: Vec<f64>,
    grazing_angles: Vec<f64>,
}
impl Footprint {
    /// Creates a new [`Footprint`].
    #[must_use]
    pub const fn new(width: Vec<f64>, length: Vec<f64>, grazing_angles: Vec<f64>) -> Self {
        Self {
            width,
            length,
            grazing_angles,
        }
    }
    /// Returns the sagittal coordinates on the element.
    #[must_use]
    pub fn width(&self) -> &[f64] {
        &self.width
    }
    /// Returns the coordinates along the element.
    #[must_use]
    pub fn length(&self) -> &[f64] {
        &self.length
    }
    /// Returns the grazing angles (mrad) of the rays on the element.
    #[must_use]
    pub fn grazing_angles(&self) -> &[f64] {
        &self.grazing_angles
    }
}

/// A single (immutable) entry of the trace history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    oe_number: usize,
    input_beam: Box<Beam>,
    oe_before: OpticalElementState,
    oe_after: OpticalElementState,
    footprint: Option<Footprint>,
}
impl HistoryEntry {
    /// Creates a new [`HistoryEntry`].
    ///
    /// Only the rays of the input beam are stored, its own history is dropped.
    #[must_use]
    pub fn new(
        oe_number: usize,
        input_beam: &Beam,
        oe_before: OpticalElementState,
        oe_after: OpticalElementState,
        footprint: Option<Footprint>,
    ) -> Self {
        Self {
            oe_number,
            input_beam: Box::new(input_beam.duplicate(true, false)),
            oe_before,
            oe_after,
            footprint,
        }
    }
    /// Returns the number of the optical element of this [`HistoryEntry`].
    #[must_use]
    pub const fn oe_number(&self) -> usize {
        self.oe_number
    }
    /// Returns the beam that entered the optical element.
    #[must_use]
    pub fn input_beam(&self) -> &Beam {
        &self.input_beam
    }
    /// Returns the state of the optical element before tracing.
    #[must_use]
    pub const fn oe_before(&self) -> &OpticalElementState {
        &self.oe_before
    }
    /// Returns the state of the optical element after tracing.
    #[must_use]
    pub const fn oe_after(&self) -> &OpticalElementState {
        &self.oe_after
    }
    /// Returns the footprint of the beam on the optical element (if recorded).
    #[must_use]
    pub const fn footprint(&self) -> Option<&Footprint> {
        self.footprint.as_ref()
    }
}
