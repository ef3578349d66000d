// sensid_core/src/models/mod.rs

use std::fmt::Debug;

use crate::error::{IdentificationError, IdentificationResult};
use crate::params::ParameterSet;
use crate::types::{State, SystemMatrix};

/// A linear, time-invariant model `dy/dt = A(β)·y`.
///
/// The model owns the mapping from named physical parameters to the entries
/// of `A`. Implementations must be pure: the same parameter values always
/// produce the same matrix.
pub trait LinearSystemModel: Debug + Send + Sync {
    /// Human-readable names for each state component, in state order.
    fn get_state_labels(&self) -> Vec<String>;

    /// Returns the state dimension `n`. Provided as a convenience.
    fn get_state_dim(&self) -> usize {
        self.get_state_labels().len()
    }

    /// Every parameter symbol `build_system_matrix` reads.
    fn get_required_parameters(&self) -> Vec<String>;

    /// Builds the `n×n` system matrix. Fails with `MissingParameter` if a
    /// required symbol is absent; no partial matrix is ever returned.
    fn build_system_matrix(&self, params: &ParameterSet) -> IdentificationResult<SystemMatrix>;

    /// Computes the instantaneous state derivative `A(β)·y`.
    fn get_derivatives(&self, params: &ParameterSet, y: &State) -> IdentificationResult<State> {
        let a = self.build_system_matrix(params)?;
        if y.len() != a.ncols() {
            return Err(IdentificationError::dimension(
                "LinearSystemModel::get_derivatives",
                (a.ncols(), 1),
                (y.len(), 1),
            ));
        }
        Ok(a * y)
    }

    /// Returns the first required symbol missing from `params`, in the order
    /// reported by `get_required_parameters`.
    fn check_parameters(&self, params: &ParameterSet) -> IdentificationResult<()> {
        match self
            .get_required_parameters()
            .into_iter()
            .find(|name| !params.contains(name))
        {
            Some(name) => Err(IdentificationError::MissingParameter(name)),
            None => Ok(()),
        }
    }
}

pub mod mass_spring;
