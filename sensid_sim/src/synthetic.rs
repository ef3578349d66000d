// sensid_sim/src/synthetic.rs

//! Measurements generated by simulating the model at known parameter values.

use anyhow::{anyhow, Result};
use nalgebra::DVector;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use sensid_core::models::LinearSystemModel;
use sensid_core::params::ParameterSet;
use sensid_core::simulation::simulate;
use sensid_core::trajectory::Trajectory;

use crate::config::SyntheticConfig;

/// Simulates `model` with `fixed ∪ true_parameters` and adds seeded
/// Gaussian noise to every sample except the first.
///
/// The first sample is the estimator's initial state and is left exact.
pub fn generate(
    model: &dyn LinearSystemModel,
    fixed: &ParameterSet,
    config: &SyntheticConfig,
    dt: f64,
) -> Result<Trajectory> {
    config.validate()?;
    let params = fixed.merged(&config.true_parameters)?;
    let y0 = DVector::from_column_slice(&config.initial_state);
    let clean = simulate(model, &params, &y0, dt, config.samples)?;

    if config.noise_stddev == 0.0 {
        return Ok(clean);
    }

    let noise = Normal::new(0.0, config.noise_stddev)
        .map_err(|e| anyhow!("invalid noise_stddev {}: {}", config.noise_stddev, e))?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    debug!(
        "Adding N(0, {}²) noise with seed {}",
        config.noise_stddev, config.seed
    );

    let mut samples = clean.as_matrix().clone();
    for mut row in samples.row_iter_mut().skip(1) {
        for value in row.iter_mut() {
            *value += noise.sample(&mut rng);
        }
    }
    Ok(Trajectory::from_matrix(samples)?)
}
