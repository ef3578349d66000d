// sensid_core/src/types.rs

use nalgebra::{DMatrix, DVector};

// --- Core Type Aliases ---

/// One time-sample of the physical system, `n` components.
pub type State = DVector<f64>;

/// The `n×n` state-transition matrix `A` of `dy/dt = A y`.
pub type SystemMatrix = DMatrix<f64>;

/// `∂y/∂β`, an `n×p` matrix evolved alongside the state.
pub type SensitivityMatrix = DMatrix<f64>;
