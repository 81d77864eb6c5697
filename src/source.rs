#![warn(missing_docs)]
//! Simple (seeded) ray sources
//!
//! The sources create beams at the plane `y = 0` propagating along `y`. They are used for testing and
//! by the command line tool to generate input beams.
use log::info;
use nalgebra::vector;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    ray::Ray,
};

fn check_widths(values: &[f64]) -> HyResult<()> {
    if values.iter().any(|v| !v.is_finite() || v.is_sign_negative()) {
        return Err(HybridError::Beam(
            "source widths and divergences must be >= 0 and finite".into(),
        ));
    }
    Ok(())
}

/// Rectangular source with uniformly distributed positions and divergences.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSource {
    number_of_rays: usize,
    half_width_x: f64,
    half_width_z: f64,
    half_divergence: f64,
    wavenumber: f64,
}
impl UniformSource {
    /// Creates a new [`UniformSource`].
    ///
    /// Positions are uniformly distributed in `[-half_width, half_width]`, the angles in both planes in
    /// `[-half_divergence, half_divergence]` (rad).
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of rays is zero or a width / divergence is negative
    /// or not finite.
    pub fn new(
        number_of_rays: usize,
        half_width_x: f64,
        half_width_z: f64,
        half_divergence: f64,
        wavenumber: f64,
    ) -> HyResult<Self> {
        if number_of_rays == 0 {
            return Err(HybridError::Beam("number of rays must be > 0".into()));
        }
        check_widths(&[half_width_x, half_width_z, half_divergence])?;
        Ok(Self {
            number_of_rays,
            half_width_x,
            half_width_z,
            half_divergence,
            wavenumber,
        })
    }
    /// Generate the beam using a generator seeded with the given value.
    ///
    /// # Errors
    ///
    /// This function will return an error if the rays cannot be created (e.g. invalid wavenumber).
    pub fn generate(&self, seed: u64) -> HyResult<Beam> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut beam = Beam::default();
        for index in 0..self.number_of_rays {
            let x = rng.random_range(-self.half_width_x..=self.half_width_x);
            let z = rng.random_range(-self.half_width_z..=self.half_width_z);
            let dx = rng.random_range(-self.half_divergence..=self.half_divergence);
            let dz = rng.random_range(-self.half_divergence..=self.half_divergence);
            beam.add_ray(Ray::new(
                index + 1,
                vector![x, 0.0, z],
                vector![dx.tan(), 1.0, dz.tan()],
                self.wavenumber,
            )?);
        }
        info!("uniform source: generated {} rays", self.number_of_rays);
        Ok(beam)
    }
}

/// Gaussian source.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianSource {
    number_of_rays: usize,
    sigma_x: f64,
    sigma_z: f64,
    sigma_dx: f64,
    sigma_dz: f64,
    wavenumber: f64,
}
impl GaussianSource {
    /// Creates a new [`GaussianSource`] with the given rms sizes and divergences.
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of rays is zero or one of the widths is negative
    /// or not finite.
    pub fn new(
        number_of_rays: usize,
        (sigma_x, sigma_z): (f64, f64),
        (sigma_dx, sigma_dz): (f64, f64),
        wavenumber: f64,
    ) -> HyResult<Self> {
        if number_of_rays == 0 {
            return Err(HybridError::Beam("number of rays must be > 0".into()));
        }
        check_widths(&[sigma_x, sigma_z, sigma_dx, sigma_dz])?;
        Ok(Self {
            number_of_rays,
            sigma_x,
            sigma_z,
            sigma_dx,
            sigma_dz,
            wavenumber,
        })
    }
    /// Generate the beam using a generator seeded with the given value.
    ///
    /// # Errors
    ///
    /// This function will return an error if the rays cannot be created (e.g. invalid wavenumber).
    pub fn generate(&self, seed: u64) -> HyResult<Beam> {
        let normal = |sigma: f64| {
            Normal::new(0.0, sigma).map_err(|e| HybridError::Beam(format!("invalid distribution: {e}")))
        };
        let (nx, nz) = (normal(self.sigma_x)?, normal(self.sigma_z)?);
        let (ndx, ndz) = (normal(self.sigma_dx)?, normal(self.sigma_dz)?);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut beam = Beam::default();
        for index in 0..self.number_of_rays {
            let position = vector![nx.sample(&mut rng), 0.0, nz.sample(&mut rng)];
            let direction = vector![ndx.sample(&mut rng).tan(), 1.0, ndz.sample(&mut rng).tan()];
            beam.add_ray(Ray::new(index + 1, position, direction, self.wavenumber)?);
        }
        info!("Gaussian source: generated {} rays", self.number_of_rays);
        Ok(beam)
    }
}
