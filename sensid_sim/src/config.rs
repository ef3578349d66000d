// sensid_sim/src/config.rs

//! Loading and validating scenario files.
//!
//! A scenario is one TOML file describing the model, which parameters are
//! known and which are to be identified, the estimator settings, and where
//! the measurements come from.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sensid_core::error::IdentificationResult;
use sensid_core::estimation::EstimatorConfig;
use sensid_core::models::mass_spring::MassSpringChain;
use sensid_core::models::LinearSystemModel;
use sensid_core::params::{FreeParameters, ParameterSet};

/// Prefix for environment overrides, e.g. `SENSID_ESTIMATOR__MAX_ITERATIONS=10`.
pub const ENV_PREFIX: &str = "SENSID_";

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Used to prefix output files. Defaults to the scenario file stem.
    #[serde(default)]
    pub name: String,
    pub model: ModelConfig,
    pub parameters: ParametersConfig,
    pub estimator: EstimatorConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// =========================================================================
// == Sections ==
// =========================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "PascalCase")] // "MassSpringChain" in TOML maps to `MassSpringChain`
pub enum ModelConfig {
    MassSpringChain { masses: usize },
}

impl ModelConfig {
    pub fn build(&self) -> IdentificationResult<Box<dyn LinearSystemModel>> {
        match self {
            ModelConfig::MassSpringChain { masses } => {
                Ok(Box::new(MassSpringChain::new(*masses)?))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    /// Known parameters, never updated.
    #[serde(default)]
    pub fixed: ParameterSet,
    /// Parameters to identify, in the order the TOML lists them.
    pub free: Vec<FreeParameterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FreeParameterConfig {
    pub name: String,
    pub initial: f64,
}

impl ParametersConfig {
    pub fn free_parameters(&self) -> IdentificationResult<FreeParameters> {
        FreeParameters::new(self.free.iter().map(|p| (p.name.clone(), p.initial)))
    }
}

/// Where measurements come from: a file, or a simulation of the model.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Whitespace-separated text file, one line per state component.
    pub measurements: Option<PathBuf>,
    pub synthetic: Option<SyntheticConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Values for the free parameters used to generate the data.
    pub true_parameters: ParameterSet,
    pub initial_state: Vec<f64>,
    pub samples: usize,
    /// Standard deviation of additive Gaussian noise. Zero gives exact model output.
    #[serde(default)]
    pub noise_stddev: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.noise_stddev.is_finite() && self.noise_stddev >= 0.0) {
            bail!(
                "[data.synthetic] noise_stddev must be finite and non-negative, got {}",
                self.noise_stddev
            );
        }
        if self.samples == 0 {
            bail!("[data.synthetic] samples must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// Write iteration logs, the summary and the comparison table to disk.
    #[serde(default = "default_write_files")]
    pub write_files: bool,
}

fn default_output_directory() -> PathBuf {
    "logs".into()
}

fn default_write_files() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            write_files: default_write_files(),
        }
    }
}

/// The resolved source of measurements.
#[derive(Debug, Clone, Copy)]
pub enum DataSource<'a> {
    File(&'a Path),
    Synthetic(&'a SyntheticConfig),
}

impl DataConfig {
    /// Exactly one source must be configured.
    pub fn source(&self) -> Result<DataSource<'_>> {
        match (&self.measurements, &self.synthetic) {
            (Some(path), None) => Ok(DataSource::File(path)),
            (None, Some(synthetic)) => Ok(DataSource::Synthetic(synthetic)),
            (Some(_), Some(_)) => {
                bail!("[data] must set either `measurements` or `synthetic`, not both")
            }
            (None, None) => bail!("[data] must set `measurements` or a [data.synthetic] block"),
        }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

/// Loads a scenario file, applying `SENSID_*` environment overrides.
///
/// A relative `measurements` path is resolved against the scenario file's
/// directory; a missing `name` falls back to the file stem.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let mut config: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("failed to load scenario file {}", path.display()))?;

    if config.name.is_empty() {
        config.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scenario".to_string());
    }
    if let (Some(file), Some(dir)) = (&config.data.measurements, path.parent()) {
        if file.is_relative() {
            config.data.measurements = Some(dir.join(file));
        }
    }

    config.validate()?;
    Ok(config)
}

/// Parses a scenario from a TOML string. No environment overrides.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig> {
    let mut config: ScenarioConfig = Figment::new()
        .merge(Toml::string(toml))
        .extract()
        .context("failed to parse scenario")?;
    if config.name.is_empty() {
        config.name = "scenario".to_string();
    }
    config.validate()?;
    Ok(config)
}

impl ScenarioConfig {
    /// Structural checks that need no data.
    pub fn validate(&self) -> Result<()> {
        self.estimator.validate()?;
        if let DataSource::Synthetic(synthetic) = self.data.source()? {
            synthetic.validate()?;
        }
        let free = self.parameters.free_parameters()?;
        let all = self.parameters.fixed.merged(&free.to_parameter_set())?;
        self.model.build()?.check_parameters(&all)?;
        Ok(())
    }
}
