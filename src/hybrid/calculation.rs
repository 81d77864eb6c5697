//! Intermediate results of a hybrid calculation
//!
//! All values of a [`CalculationParameters`] are expressed in the length unit of the input parameters.
use std::{fs, path::Path};

use log::info;

use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    ray::Plane,
    scaled::ScaledArray,
    utils::polyfit::Polynomial,
};

/// Intermediate results of the calculation in one diffraction plane.
#[derive(Debug, Clone)]
pub struct PlaneCalculation {
    /// the diffraction plane
    pub plane: Plane,
    /// `true` if the beam is cut by the element in this plane
    pub cut: bool,
    /// normalized (peak = 1) intensity profile of the rays at the screen
    pub histogram: ScaledArray,
    /// spatial extent (min, max) of the beam at the screen
    pub extent: (f64, f64),
    /// propagation distance from the screen to the image plane
    pub distance: f64,
    /// focal length of the near field calculation (`None` = plane wave)
    pub near_field_focal_length: Option<f64>,
    /// focal length of the lens used for the far field calculation
    pub far_field_focal_length: f64,
    /// number of points of the propagated wavefront
    pub fft_size: usize,
    /// enlargement of the wavefront grid w.r.t. the beam extent
    pub scale_factor: f64,
    /// figure (thickness) error profile applied as phase shift
    pub figure_error_slice: Option<ScaledArray>,
    /// RMS slope of the figure error slice
    pub rms_slope: f64,
    /// far field intensity vs. angle (tangent)
    pub far_field: Option<ScaledArray>,
    /// near field intensity vs. position at the image plane
    pub near_field: Option<ScaledArray>,
    /// sampled angular offsets of the good rays
    pub far_field_offsets: Vec<f64>,
    /// sampled position offsets of the good rays
    pub near_field_offsets: Vec<f64>,
}
impl PlaneCalculation {
    /// Returns the width of the beam at the screen.
    #[must_use]
    pub fn extent_width(&self) -> f64 {
        self.extent.1 - self.extent.0
    }
    fn write_diagnostics(&self, directory: &Path) -> HyResult<()> {
        let plane = self.plane.to_string().to_lowercase();
        self.histogram
            .write_csv(&directory.join(format!("histogram_{plane}.csv")))?;
        if let Some(far_field) = &self.far_field {
            far_field.write_csv(&directory.join(format!("far_field_{plane}.csv")))?;
        }
        if let Some(near_field) = &self.near_field {
            near_field.write_csv(&directory.join(format!("near_field_{plane}.csv")))?;
        }
        if let Some(slice) = &self.figure_error_slice {
            slice.write_csv(&directory.join(format!("figure_error_{plane}.csv")))?;
        }
        Ok(())
    }
}

/// Aggregate of all values of one hybrid calculation.
#[derive(Debug, Clone)]
pub struct CalculationParameters {
    /// mean wavelength of the rays
    pub wavelength: f64,
    /// wavenumber `2*pi/wavelength`
    pub wavenumber: f64,
    /// beam cut by the element in the sagittal plane
    pub cut_x: bool,
    /// beam cut by the element in the tangential plane
    pub cut_z: bool,
    /// beam directly behind the optical element
    pub screen_beam: Beam,
    /// grazing angle (mrad) vs. screen position `z` (reflective figure error calculations)
    pub angle_fit: Option<Polynomial>,
    /// coordinate along the element vs. screen position `z` (reflective figure error calculations)
    pub length_fit: Option<Polynomial>,
    /// sagittal plane results
    pub plane_x: Option<PlaneCalculation>,
    /// tangential plane results
    pub plane_z: Option<PlaneCalculation>,
    /// beam at the image plane with the far field (angle) correction
    pub far_field_beam: Beam,
    /// beam at the image plane with the near field (position) correction
    pub near_field_beam: Option<Beam>,
}
impl CalculationParameters {
    /// Returns the results of the given plane (`None` if the plane was not calculated).
    #[must_use]
    pub const fn plane(&self, plane: Plane) -> Option<&PlaneCalculation> {
        match plane {
            Plane::X => self.plane_x.as_ref(),
            Plane::Z => self.plane_z.as_ref(),
        }
    }
    /// Returns the results of all calculated planes.
    #[must_use]
    pub fn planes(&self) -> Vec<&PlaneCalculation> {
        self.plane_x.iter().chain(self.plane_z.iter()).collect()
    }
    /// Write the screen beam, the output beams and all distributions as CSV files to the given directory.
    ///
    /// # Errors
    ///
    /// This function will return an error if the directory cannot be created or a file cannot be written.
    pub fn write_diagnostics(&self, directory: &Path) -> HyResult<()> {
        fs::create_dir_all(directory).map_err(|e| {
            HybridError::Io(format!("cannot create {}: {e}", directory.display()))
        })?;
        self.screen_beam.write_csv(&directory.join("screen.csv"))?;
        self.far_field_beam
            .write_csv(&directory.join("hybrid_ff.csv"))?;
        if let Some(beam) = &self.near_field_beam {
            beam.write_csv(&directory.join("hybrid_nf.csv"))?;
        }
        for plane in self.planes() {
            plane.write_diagnostics(directory)?;
        }
        info!("diagnostic files written to {}", directory.display());
        Ok(())
    }
}
