// sensid_core/src/estimation/mod.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{IdentificationError, IdentificationResult};
use crate::params::FreeParameters;
use crate::sensitivity::DEFAULT_PERTURBATION;

/// Numerical settings for one identification run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Sampling interval of the measurements, also the RK4 step size.
    pub dt: f64,
    /// Cost tolerance `ε`. The loop stops once `cost < ε` or `‖Δβ‖ < √ε`.
    pub tolerance: f64,
    /// Iteration budget `N`.
    pub max_iterations: usize,
    /// Central-difference step `δ` for the sensitivity forcing.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
    /// Smallest accepted ratio of extreme singular values of the Gram matrix.
    #[serde(default = "default_min_reciprocal_condition")]
    pub min_reciprocal_condition: f64,
}

fn default_perturbation() -> f64 {
    DEFAULT_PERTURBATION
}

fn default_min_reciprocal_condition() -> f64 {
    f64::EPSILON
}

impl EstimatorConfig {
    pub fn new(dt: f64, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            dt,
            tolerance,
            max_iterations,
            perturbation: default_perturbation(),
            min_reciprocal_condition: default_min_reciprocal_condition(),
        }
    }

    pub fn with_perturbation(mut self, perturbation: f64) -> Self {
        self.perturbation = perturbation;
        self
    }

    pub fn validate(&self) -> IdentificationResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.dt) {
            return Err(IdentificationError::InvalidConfig(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if !positive(self.tolerance) {
            return Err(IdentificationError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(IdentificationError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !positive(self.perturbation) {
            return Err(IdentificationError::InvalidConfig(format!(
                "perturbation must be positive, got {}",
                self.perturbation
            )));
        }
        if !(self.min_reciprocal_condition >= 0.0) {
            return Err(IdentificationError::InvalidConfig(format!(
                "min_reciprocal_condition must be non-negative, got {}",
                self.min_reciprocal_condition
            )));
        }
        Ok(())
    }
}

/// Outcome of a finished identification run.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult {
    /// `β` after the last applied increment.
    pub parameters: FreeParameters,
    /// Outer iterations actually executed.
    pub iterations: usize,
    /// `false` when the iteration budget ran out first. Not an error.
    pub converged: bool,
    /// Cost of the last evaluated iteration.
    pub cost: f64,
    /// `‖Δβ‖` of the last applied increment.
    pub step_norm: f64,
    /// Wall time, diagnostic only.
    pub elapsed: Duration,
}

pub mod estimator;
pub mod reporting;
