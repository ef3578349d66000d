// sensid_core/src/trajectory.rs

use nalgebra::{DMatrix, DVector};

use crate::error::{IdentificationError, IdentificationResult};
use crate::types::State;

/// A sequence of state samples on a uniform time grid `t_k = k·dt`.
///
/// Stored as a `K × n` matrix: one row per time sample, one column per
/// state component. The sampling interval is owned by whoever produced the
/// trajectory, not by the trajectory itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: DMatrix<f64>,
}

impl Trajectory {
    /// Wraps a `K × n` matrix. Empty matrices are rejected.
    pub fn from_matrix(samples: DMatrix<f64>) -> IdentificationResult<Self> {
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(IdentificationError::dimension(
                "Trajectory::from_matrix",
                (1, 1),
                samples.shape(),
            ));
        }
        Ok(Self { samples })
    }

    /// Builds a trajectory from individual samples; every sample must have
    /// the length of the first one.
    pub fn from_samples(samples: &[State]) -> IdentificationResult<Self> {
        let first = samples.first().ok_or_else(|| {
            IdentificationError::dimension("Trajectory::from_samples", (1, 1), (0, 0))
        })?;
        let n = first.len();
        if let Some(bad) = samples.iter().find(|s| s.len() != n) {
            return Err(IdentificationError::dimension(
                "Trajectory::from_samples",
                (n, 1),
                (bad.len(), 1),
            ));
        }
        let matrix = DMatrix::from_fn(samples.len(), n, |k, i| samples[k][i]);
        Self::from_matrix(matrix)
    }

    /// Builds a trajectory from a row-major buffer of `rows × cols` values.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[f64]) -> IdentificationResult<Self> {
        if data.len() != rows * cols {
            return Err(IdentificationError::dimension(
                "Trajectory::from_row_slice",
                (rows, cols),
                (data.len(), 1),
            ));
        }
        Self::from_matrix(DMatrix::from_row_slice(rows, cols, data))
    }

    /// Number of time samples `K`.
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.nrows() == 0
    }

    /// Dimension `n` of each state sample.
    pub fn state_dim(&self) -> usize {
        self.samples.ncols()
    }

    /// The state at time index `k` as a column vector.
    ///
    /// Panics if `k` is out of range, like slice indexing.
    pub fn sample(&self, k: usize) -> State {
        self.samples.row(k).transpose()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.samples
    }

    /// The time stamps `k·dt` for every sample.
    pub fn time_grid(&self, dt: f64) -> DVector<f64> {
        DVector::from_fn(self.len(), |k, _| k as f64 * dt)
    }
}
