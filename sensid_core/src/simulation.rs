// sensid_core/src/simulation.rs

use nalgebra::DMatrix;

use crate::error::{IdentificationError, IdentificationResult};
use crate::models::LinearSystemModel;
use crate::params::ParameterSet;
use crate::trajectory::Trajectory;
use crate::types::State;
use crate::utils::integrators::linear_step_state;

/// Integrates `dy/dt = A(params)·y` from `y0` over `samples` points spaced
/// `dt` apart. Sample 0 is `y0` itself.
///
/// `A` is built once, and each step uses the same RK4 routine the estimator
/// uses for its simulated trajectory, so replaying the estimator's
/// parameters reproduces its trajectory exactly.
pub fn simulate(
    model: &dyn LinearSystemModel,
    params: &ParameterSet,
    y0: &State,
    dt: f64,
    samples: usize,
) -> IdentificationResult<Trajectory> {
    let n = model.get_state_dim();
    if y0.len() != n {
        return Err(IdentificationError::dimension(
            "simulate: initial state",
            (n, 1),
            (y0.len(), 1),
        ));
    }
    if samples == 0 {
        return Err(IdentificationError::InvalidConfig(
            "simulation needs at least one sample".to_string(),
        ));
    }

    let a = model.build_system_matrix(params)?;
    let mut out = DMatrix::zeros(samples, n);
    let mut y = y0.clone();
    out.row_mut(0).copy_from(&y.transpose());
    for k in 1..samples {
        y = linear_step_state(&a, &y, dt)?;
        out.row_mut(k).copy_from(&y.transpose());
    }

    Trajectory::from_matrix(out)
}
