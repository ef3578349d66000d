// sensid_core/src/utils/integrators.rs

use nalgebra::{DMatrix, DVector};

use crate::error::{IdentificationError, IdentificationResult};
use crate::types::{State, SystemMatrix};

/// A fixed-step integrator for `dX/dt = f(X, t)`.
///
/// `X` is a matrix so the same stepper can carry a state vector (`n×1`) or a
/// sensitivity matrix (`n×p`).
pub trait Integrator<T> {
    fn step(
        &self,
        func: &dyn Fn(&DMatrix<T>, T) -> DMatrix<T>,
        x0: &DMatrix<T>,
        t0: T,
        tf: T,
    ) -> DMatrix<T>;
}

/// Classical 4th-order Runge-Kutta.
#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl<T> Integrator<T> for RK4
where
    T: Copy + num_traits::Float + std::ops::Mul<DMatrix<T>, Output = DMatrix<T>>,
    DMatrix<T>: Clone + std::ops::Add<Output = DMatrix<T>>,
{
    fn step(
        &self,
        func: &dyn Fn(&DMatrix<T>, T) -> DMatrix<T>,
        x0: &DMatrix<T>,
        t0: T,
        tf: T,
    ) -> DMatrix<T> {
        let dt = tf - t0;
        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two + two + two);

        let k1 = func(x0, t0);
        let k2 = func(&(x0.clone() + half * dt * k1.clone()), t0 + half * dt);
        let k3 = func(&(x0.clone() + half * dt * k2.clone()), t0 + half * dt);
        let k4 = func(&(x0.clone() + dt * k3.clone()), tf);

        x0.clone() + dt * sixth * (k1 + two * k2 + two * k3 + k4)
    }
}

/// One RK4 step of the linear system `dX/dt = A·X + F`.
///
/// `A` is held fixed over the step. `forcing`, when present, must have the
/// shape of `state` and is frozen at its pre-step value; `None` is the
/// homogeneous case.
pub fn linear_step(
    a: &SystemMatrix,
    state: &DMatrix<f64>,
    dt: f64,
    forcing: Option<&DMatrix<f64>>,
) -> IdentificationResult<DMatrix<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(IdentificationError::dimension(
            "linear_step: system matrix",
            (n, n),
            a.shape(),
        ));
    }
    if state.nrows() != n {
        return Err(IdentificationError::dimension(
            "linear_step: state",
            (n, state.ncols()),
            state.shape(),
        ));
    }

    match forcing {
        Some(f) => {
            if f.shape() != state.shape() {
                return Err(IdentificationError::dimension(
                    "linear_step: forcing",
                    state.shape(),
                    f.shape(),
                ));
            }
            let func = |x: &DMatrix<f64>, _t: f64| -> DMatrix<f64> { a * x + f };
            Ok(RK4.step(&func, state, 0.0, dt))
        }
        None => {
            let func = |x: &DMatrix<f64>, _t: f64| -> DMatrix<f64> { a * x };
            Ok(RK4.step(&func, state, 0.0, dt))
        }
    }
}

/// Homogeneous step for a single state vector, `dy/dt = A·y`.
pub fn linear_step_state(a: &SystemMatrix, y: &State, dt: f64) -> IdentificationResult<State> {
    let as_column = DMatrix::from_column_slice(y.len(), 1, y.as_slice());
    let next = linear_step(a, &as_column, dt, None)?;
    Ok(DVector::from_column_slice(next.as_slice()))
}
