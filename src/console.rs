//! Handling the command line interface
//!
//! This module handles the command line parsing and loads the input files given on the command line.
use std::{
    f64::consts::PI,
    fs,
    path::{Path, PathBuf},
};

use clap::{builder::Str, Parser};
use log::info;

use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    get_version,
    hybrid::HybridInputParameters,
    optical_element::OpticalElementState,
    ray::HC_EV_CM,
    source::GaussianSource,
};

/// Command line arguments of the hybrid screen application.
#[derive(Parser, Debug)]
#[command(author, version = Str::from(get_version()), about, long_about = None)]
pub struct Args {
    /// input beam (CSV ray table at the plane of the previous element). If not given, a Gaussian source is generated.
    #[arg(short, long)]
    pub beam: Option<PathBuf>,

    /// configuration of the optical element (YAML)
    #[arg(short, long)]
    pub element: PathBuf,

    /// parameters of the hybrid calculation (YAML). Defaults are used if not given.
    #[arg(short, long)]
    pub parameters: Option<PathBuf>,

    /// destination directory of the output beams
    #[arg(short, long, default_value = ".")]
    pub output_directory: PathBuf,

    /// number of rays of the generated source
    #[arg(long, default_value_t = 10_000)]
    pub rays: usize,

    /// photon energy (eV) of the generated source
    #[arg(long, default_value_t = 10_000.0)]
    pub energy: f64,

    /// rms size (x, z) of the generated source in the user length unit
    #[arg(long, num_args = 2, default_values_t = [0.01, 0.001])]
    pub source_size: Vec<f64>,

    /// rms divergence (x, z) of the generated source in rad
    #[arg(long, num_args = 2, default_values_t = [1.0e-5, 1.0e-5])]
    pub source_divergence: Vec<f64>,

    /// seed of the generated source
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}
impl Args {
    /// Load the input beam or generate it from the source parameters.
    ///
    /// # Errors
    ///
    /// This function will return an error if the beam file cannot be read or the source parameters are invalid.
    pub fn load_beam(&self) -> HyResult<Beam> {
        if let Some(path) = &self.beam {
            info!("reading beam from {}", path.display());
            return Beam::load_csv(path);
        }
        if !self.energy.is_normal() || self.energy.is_sign_negative() {
            return Err(HybridError::Configuration(
                "photon energy must be positive".into(),
            ));
        }
        let pair = |values: &[f64], name: &str| match values {
            [x, z] => Ok((*x, *z)),
            _ => Err(HybridError::Configuration(format!(
                "{name} needs two values (x, z)"
            ))),
        };
        let size = pair(&self.source_size, "source size")?;
        let divergence = pair(&self.source_divergence, "source divergence")?;
        let wavenumber = 2.0 * PI * self.energy / HC_EV_CM;
        GaussianSource::new(self.rays, size, divergence, wavenumber)?.generate(self.seed)
    }
    /// Load the optical element configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or parsed.
    pub fn load_element(&self) -> HyResult<OpticalElementState> {
        OpticalElementState::from_yaml_file(&self.element)
    }
    /// Load the hybrid parameters (or the defaults).
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or parsed.
    pub fn load_parameters(&self) -> HyResult<HybridInputParameters> {
        self.parameters.as_ref().map_or_else(
            || Ok(HybridInputParameters::default()),
            |path| HybridInputParameters::from_yaml_file(path),
        )
    }
    /// Create the output directory (if necessary) and return the path of a file inside.
    ///
    /// # Errors
    ///
    /// This function will return an error if the directory cannot be created.
    pub fn output_file(&self, file_name: &str) -> HyResult<PathBuf> {
        create_directory(&self.output_directory)?;
        Ok(self.output_directory.join(file_name))
    }
}

fn create_directory(path: &Path) -> HyResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| HybridError::Io(format!("cannot create directory {}: {e}", path.display())))
}
