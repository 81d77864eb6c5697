//! Inverse cumulative distribution sampling of propagated intensity profiles
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::{HyResult, HybridError},
    ray::Plane,
    scaled::ScaledArray,
};

/// Draws random values distributed like a sampled (non-negative) intensity profile.
///
/// ```rust
/// use hybrid_screen::{hybrid::sampler::{plane_rng, InverseCdfSampler}, ray::Plane, scaled::ScaledArray};
///
/// let profile = ScaledArray::from_fn(101, -1.0, 1.0, |x| 1.0 - x.abs()).unwrap();
/// let sampler = InverseCdfSampler::new(&profile).unwrap();
/// let values = sampler.sample_n(&mut plane_rng(25, Plane::Z), 100);
/// assert!(values.iter().all(|v| v.abs() <= 1.0));
/// ```
#[derive(Debug, Clone)]
pub struct InverseCdfSampler {
    abscissas: Vec<f64>,
    cdf: Vec<f64>,
}
impl InverseCdfSampler {
    /// Creates a new [`InverseCdfSampler`] for the given profile.
    ///
    /// # Errors
    ///
    /// This function will return a [`HybridError::Numerical`] if the profile contains negative or non-finite
    /// values or its sum is zero.
    pub fn new(profile: &ScaledArray) -> HyResult<Self> {
        if profile
            .values()
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(HybridError::Numerical(
                "distribution contains negative or non-finite values".into(),
            ));
        }
        let cumulative = profile.cumulative_sum();
        let total = cumulative.values().iter().last().copied().unwrap_or(0.0);
        if total <= 0.0 {
            return Err(HybridError::Numerical(
                "distribution has no positive values".into(),
            ));
        }
        Ok(Self {
            abscissas: profile.abscissas().iter().copied().collect(),
            cdf: cumulative.values().iter().map(|c| c / total).collect(),
        })
    }
    /// Returns the normalized cumulative distribution (monotone, last value `1`).
    #[must_use]
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }
    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        let i = self.cdf.partition_point(|c| *c <= u).min(self.cdf.len() - 1);
        if i == 0 {
            return self.abscissas[0];
        }
        let (c0, c1) = (self.cdf[i - 1], self.cdf[i]);
        let (x0, x1) = (self.abscissas[i - 1], self.abscissas[i]);
        if c1 > c0 {
            x0 + (x1 - x0) * (u - c0) / (c1 - c0)
        } else {
            x1
        }
    }
    /// Draw `n` values.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// Returns the random generator of a diffraction plane (seeded with `seed + plane index`).
#[must_use]
pub fn plane_rng(seed: u64, plane: Plane) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(plane.index()))
}
