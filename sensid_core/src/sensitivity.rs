// sensid_core/src/sensitivity.rs

//! Central-difference derivatives of a vector-valued map with respect to
//! named parameters.

use nalgebra::{DMatrix, DVector};

use crate::error::{IdentificationError, IdentificationResult};
use crate::params::ParameterSet;

/// Default finite-difference step `δ`.
///
/// Not scaled to parameter magnitude: parameters spanning many orders of
/// magnitude need a per-problem `δ`.
pub const DEFAULT_PERTURBATION: f64 = 1e-5;

/// A scoped change to one parameter. The original value is written back when
/// the guard is dropped, on every exit path.
struct Perturbation<'a> {
    params: &'a mut ParameterSet,
    name: &'a str,
    original: f64,
}

impl<'a> Perturbation<'a> {
    fn begin(params: &'a mut ParameterSet, name: &'a str) -> IdentificationResult<Self> {
        let original = params.require(name)?;
        Ok(Self {
            params,
            name,
            original,
        })
    }

    fn offset(&mut self, by: f64) -> &ParameterSet {
        self.params.insert(self.name, self.original + by);
        &*self.params
    }
}

impl Drop for Perturbation<'_> {
    fn drop(&mut self) {
        self.params.insert(self.name, self.original);
    }
}

/// Numerical Jacobian of `f` at `at` with respect to the parameters `names`.
///
/// Column `j` is `(f(β+δe_j) − f(β−δe_j)) / 2δ`. Only `names[j]` is moved for
/// column `j`, and it is restored before the next column, even if `f` fails.
/// On return every entry of `at` holds exactly its pre-call value.
///
/// Returns an `n×p` matrix where `n` is the length of `f`'s output.
pub fn central_difference_jacobian<F>(
    mut f: F,
    names: &[String],
    at: &mut ParameterSet,
    delta: f64,
) -> IdentificationResult<DMatrix<f64>>
where
    F: FnMut(&ParameterSet) -> IdentificationResult<DVector<f64>>,
{
    if !(delta.is_finite() && delta > 0.0) {
        return Err(IdentificationError::InvalidConfig(format!(
            "perturbation must be positive and finite, got {delta}"
        )));
    }
    if names.is_empty() {
        let n = f(&*at)?.len();
        return Ok(DMatrix::zeros(n, 0));
    }

    let mut columns: Vec<DVector<f64>> = Vec::with_capacity(names.len());
    for name in names {
        let (plus, minus) = {
            let mut guard = Perturbation::begin(at, name)?;
            let plus = f(guard.offset(delta))?;
            let minus = f(guard.offset(-delta))?;
            (plus, minus)
        };

        if plus.len() != minus.len() {
            return Err(IdentificationError::dimension(
                "central_difference_jacobian",
                (plus.len(), 1),
                (minus.len(), 1),
            ));
        }
        if let Some(first) = columns.first() {
            if plus.len() != first.len() {
                return Err(IdentificationError::dimension(
                    "central_difference_jacobian",
                    (first.len(), 1),
                    (plus.len(), 1),
                ));
            }
        }

        columns.push((plus - minus) / (2.0 * delta));
    }

    Ok(DMatrix::from_columns(&columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // f(a, b) = [a², a·b, sin(b)]
    fn test_map(p: &ParameterSet) -> IdentificationResult<DVector<f64>> {
        let a = p.require("a")?;
        let b = p.require("b")?;
        Ok(DVector::from_vec(vec![a * a, a * b, b.sin()]))
    }

    #[test]
    fn matches_analytic_derivative() {
        let (a, b) = (1.3, 0.4);
        let mut at: ParameterSet = [("a", a), ("b", b)].into_iter().collect();

        let jac =
            central_difference_jacobian(test_map, &names(&["a", "b"]), &mut at, 1e-5).unwrap();

        assert_eq!(jac.shape(), (3, 2));
        assert_abs_diff_eq!(jac[(0, 0)], 2.0 * a, epsilon = 1e-8);
        assert_abs_diff_eq!(jac[(1, 0)], b, epsilon = 1e-8);
        assert_abs_diff_eq!(jac[(2, 0)], 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(jac[(0, 1)], 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(jac[(1, 1)], a, epsilon = 1e-8);
        assert_abs_diff_eq!(jac[(2, 1)], b.cos(), epsilon = 1e-8);
    }

    #[test]
    fn error_shrinks_quadratically_with_delta() {
        // d/db sin(b) has third derivative -cos(b), so the error is ~δ²·cos(b)/6.
        let mut at: ParameterSet = [("a", 1.0), ("b", 0.4)].into_iter().collect();
        let exact = 0.4_f64.cos();
        let err = |delta: f64, at: &mut ParameterSet| {
            let jac = central_difference_jacobian(test_map, &names(&["b"]), at, delta).unwrap();
            (jac[(2, 0)] - exact).abs()
        };
        let coarse = err(1e-1, &mut at);
        let fine = err(1e-2, &mut at);
        assert!(coarse / fine > 50.0, "ratio {}", coarse / fine);
    }

    #[test]
    fn parameters_are_restored_exactly() {
        let original: ParameterSet = [("a", 0.1), ("b", 20.0), ("c", 7.0)]
            .into_iter()
            .collect();
        let mut at = original.clone();

        central_difference_jacobian(test_map, &names(&["b", "a"]), &mut at, 1e-5).unwrap();

        assert_eq!(at, original);
    }

    #[test]
    fn perturbations_do_not_leak_between_columns() {
        let mut at: ParameterSet = [("a", 2.0), ("b", 3.0)].into_iter().collect();
        let mut seen = Vec::new();
        central_difference_jacobian(
            |p| {
                seen.push((p.get("a").unwrap(), p.get("b").unwrap()));
                test_map(p)
            },
            &names(&["a", "b"]),
            &mut at,
            0.5,
        )
        .unwrap();

        assert_eq!(seen, vec![(2.5, 3.0), (1.5, 3.0), (2.0, 3.5), (2.0, 2.5)]);
    }

    #[test]
    fn parameters_are_restored_when_the_map_fails() {
        let original: ParameterSet = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        let mut at = original.clone();
        let mut calls = 0;

        let result = central_difference_jacobian(
            |p| {
                calls += 1;
                if calls == 2 {
                    return Err(IdentificationError::InvalidConfig("boom".into()));
                }
                test_map(p)
            },
            &names(&["a", "b"]),
            &mut at,
            1e-3,
        );

        assert!(result.is_err());
        assert_eq!(at, original);
    }

    #[test]
    fn unknown_name_and_bad_delta_are_errors() {
        let mut at: ParameterSet = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(
            central_difference_jacobian(test_map, &names(&["z"]), &mut at, 1e-5).unwrap_err(),
            IdentificationError::MissingParameter("z".into())
        );
        assert!(central_difference_jacobian(test_map, &names(&["a"]), &mut at, 0.0).is_err());
    }
}
