// sensid_core/src/estimation/estimator.rs

use nalgebra::{DMatrix, DVector};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{IdentificationError, IdentificationResult};
use crate::estimation::reporting::{EstimationSummary, IterationRecord, Reporter};
use crate::estimation::{EstimationResult, EstimatorConfig};
use crate::models::LinearSystemModel;
use crate::params::{FreeParameters, ParameterSet};
use crate::sensitivity::central_difference_jacobian;
use crate::trajectory::Trajectory;
use crate::types::SensitivityMatrix;
use crate::utils::integrators::{linear_step, linear_step_state};

/// The time-integrated normal equations of one outer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    /// `∫ Uᵀ U dt`, `p×p`.
    pub gram: DMatrix<f64>,
    /// `∫ Uᵀ (y_meas − y_sim) dt`, length `p`.
    pub rhs: DVector<f64>,
    /// `∫ ‖y_meas − y_sim‖² dt`.
    pub cost: f64,
}

impl NormalEquations {
    /// Solves `gram · Δβ = rhs`.
    ///
    /// The Gram matrix is rejected when it is exactly singular, or when the
    /// ratio of its smallest to largest singular value is below
    /// `min_reciprocal_condition`. No damping is applied.
    pub fn solve(
        &self,
        iteration: usize,
        min_reciprocal_condition: f64,
    ) -> IdentificationResult<DVector<f64>> {
        let singular_values = self.gram.singular_values();
        let largest = singular_values.max();
        let reciprocal_condition = if largest > 0.0 {
            singular_values.min() / largest
        } else {
            0.0
        };

        let singular = || IdentificationError::SingularGramMatrix {
            iteration,
            reciprocal_condition,
        };
        // Written this way round so a NaN condition number is rejected too.
        if !(reciprocal_condition >= min_reciprocal_condition) || reciprocal_condition == 0.0 {
            return Err(singular());
        }

        self.gram.clone().lu().solve(&self.rhs).ok_or_else(singular)
    }
}

/// The full result of one outer iteration at a given `β`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStep {
    pub iteration: usize,
    /// `β` the iteration was evaluated at.
    pub parameters: FreeParameters,
    pub equations: NormalEquations,
    /// The Gauss-Newton increment `Δβ`.
    pub increment: DVector<f64>,
}

impl IterationStep {
    pub fn cost(&self) -> f64 {
        self.equations.cost
    }
}

/// Sensitivity-function identification of the free parameters of a linear
/// model from a measured trajectory.
///
/// Each outer iteration integrates the simulated state and the sensitivity
/// matrix `U = ∂y/∂β` side by side over the measurement grid, accumulates the
/// Gauss-Newton normal equations, and applies the solved increment.
pub struct ParameterEstimator {
    model: Box<dyn LinearSystemModel>,
    fixed: ParameterSet,
    initial: FreeParameters,
    measured: Trajectory,
    config: EstimatorConfig,
}

impl ParameterEstimator {
    /// Validates the problem up front so that every failure a run can hit
    /// later is numerical, never structural.
    pub fn new(
        model: Box<dyn LinearSystemModel>,
        fixed: ParameterSet,
        initial: FreeParameters,
        measured: Trajectory,
        config: EstimatorConfig,
    ) -> IdentificationResult<Self> {
        config.validate()?;

        if initial.is_empty() {
            return Err(IdentificationError::InvalidConfig(
                "at least one free parameter is required".to_string(),
            ));
        }

        let all = fixed.merged(&initial.to_parameter_set())?;
        model.check_parameters(&all)?;

        let n = model.get_state_dim();
        if measured.state_dim() != n {
            return Err(IdentificationError::dimension(
                "ParameterEstimator::new: measurements",
                (measured.len(), n),
                (measured.len(), measured.state_dim()),
            ));
        }

        Ok(Self {
            model,
            fixed,
            initial,
            measured,
            config,
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn model(&self) -> &dyn LinearSystemModel {
        self.model.as_ref()
    }

    pub fn fixed(&self) -> &ParameterSet {
        &self.fixed
    }

    pub fn initial(&self) -> &FreeParameters {
        &self.initial
    }

    pub fn measured(&self) -> &Trajectory {
        &self.measured
    }

    /// Integrates state and sensitivities over the whole measurement grid at
    /// `beta` and returns the rectangle-rule normal equations.
    ///
    /// The simulated trajectory starts from the first measured sample. At each
    /// time index the forcing `S_k = ∂(A(β)·y_sim)/∂β` is taken with `y_sim`
    /// held at its current value and then frozen for the RK4 step of `U`.
    pub fn accumulate(&self, beta: &FreeParameters) -> IdentificationResult<NormalEquations> {
        let mut params = self.fixed.merged(&beta.to_parameter_set())?;
        let a = self.model.build_system_matrix(&params)?;
        let names = beta.names();
        let dt = self.config.dt;

        let n = self.model.get_state_dim();
        let p = names.len();

        let mut y_sim = self.measured.sample(0);
        let mut u = SensitivityMatrix::zeros(n, p);
        let mut gram = DMatrix::<f64>::zeros(p, p);
        let mut rhs = DVector::<f64>::zeros(p);
        let mut cost = 0.0;

        for k in 0..self.measured.len() {
            let forcing = central_difference_jacobian(
                |perturbed| self.model.get_derivatives(perturbed, &y_sim),
                &names,
                &mut params,
                self.config.perturbation,
            )?;

            let u_t = u.transpose();
            gram += &u_t * &u;
            let residual = self.measured.sample(k) - &y_sim;
            rhs += &u_t * &residual;
            cost += residual.dot(&residual);

            u = linear_step(&a, &u, dt, Some(&forcing))?;
            y_sim = linear_step_state(&a, &y_sim, dt)?;
        }

        gram *= dt;
        rhs *= dt;
        cost *= dt;

        Ok(NormalEquations { gram, rhs, cost })
    }

    /// One complete outer iteration at `beta`: accumulate and solve.
    ///
    /// Depends only on `beta` and the estimator's fixed inputs, so independent
    /// candidates can be evaluated concurrently.
    pub fn evaluate(
        &self,
        beta: &FreeParameters,
        iteration: usize,
    ) -> IdentificationResult<IterationStep> {
        let equations = self.accumulate(beta)?;
        let increment = equations.solve(iteration, self.config.min_reciprocal_condition)?;
        Ok(IterationStep {
            iteration,
            parameters: beta.clone(),
            equations,
            increment,
        })
    }

    /// Runs the outer loop from the initial guess until the cost drops below
    /// `ε`, the increment norm drops below `√ε`, or the budget runs out.
    ///
    /// Any component failure aborts the run; no partially updated parameters
    /// are ever returned.
    pub fn run(&self, reporter: &mut dyn Reporter) -> IdentificationResult<EstimationResult> {
        let start = Instant::now();
        let tolerance = self.config.tolerance;

        let mut beta = self.initial.clone();
        let mut cost = f64::INFINITY;
        let mut step_norm = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        for iteration in 0..self.config.max_iterations {
            let equations = self.accumulate(&beta)?;

            reporter.on_iteration(&IterationRecord {
                iteration,
                parameters: beta.clone(),
                cost: equations.cost,
            });

            let increment = equations.solve(iteration, self.config.min_reciprocal_condition)?;
            beta.apply_increment(&increment)?;

            iterations = iteration + 1;
            cost = equations.cost;
            step_norm = increment.norm();
            debug!(
                "iteration {}: cost={:.6e} |dbeta|={:.6e}",
                iteration, cost, step_norm
            );

            if cost < tolerance || step_norm < tolerance.sqrt() {
                converged = true;
                break;
            }
        }

        let elapsed = start.elapsed();
        if converged {
            info!(
                "identification converged after {} iteration(s), cost={:.6e}",
                iterations, cost
            );
        } else {
            warn!(
                "identification stopped at the iteration budget ({}), cost={:.6e}",
                iterations, cost
            );
        }

        reporter.on_finish(&EstimationSummary {
            parameters: beta.clone(),
            cost,
            iterations,
            converged,
            elapsed,
        });

        Ok(EstimationResult {
            parameters: beta,
            iterations,
            converged,
            cost,
            step_norm,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::reporting::MemoryReporter;
    use crate::models::mass_spring::MassSpringChain;
    use crate::simulation::simulate;
    use approx::assert_abs_diff_eq;

    /// dy/dt = -k·y with a single free rate `k`.
    #[derive(Debug)]
    struct Decay;

    impl LinearSystemModel for Decay {
        fn get_state_labels(&self) -> Vec<String> {
            vec!["y".to_string()]
        }

        fn get_required_parameters(&self) -> Vec<String> {
            vec!["k".to_string()]
        }

        fn build_system_matrix(
            &self,
            params: &ParameterSet,
        ) -> IdentificationResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, -params.require("k")?))
        }
    }

    fn fixed() -> ParameterSet {
        [("c2", 0.3), ("c3", 0.2), ("m1", 12.0), ("m3", 18.0)]
            .into_iter()
            .collect()
    }

    fn truth() -> FreeParameters {
        FreeParameters::new([("c1", 0.12), ("c4", 0.09), ("m2", 20.0)]).unwrap()
    }

    fn measured_from_truth(samples: usize) -> Trajectory {
        let all = fixed().merged(&truth().to_parameter_set()).unwrap();
        let y0 = DVector::from_vec(vec![0.1, 0.0, 0.0, 0.05, -0.1, 0.0]);
        simulate(&MassSpringChain::three_mass(), &all, &y0, 0.2, samples).unwrap()
    }

    #[test]
    fn true_parameters_converge_in_one_iteration() {
        let estimator = ParameterEstimator::new(
            Box::new(MassSpringChain::three_mass()),
            fixed(),
            truth(),
            measured_from_truth(100),
            EstimatorConfig::new(0.2, 1e-6, 50),
        )
        .unwrap();

        let mut reporter = MemoryReporter::default();
        let result = estimator.run(&mut reporter).unwrap();

        assert_eq!(result.iterations, 1);
        assert!(result.converged);
        assert_abs_diff_eq!(result.cost, 0.0, epsilon = 1e-20);
        for (name, value) in truth().iter() {
            assert_abs_diff_eq!(result.parameters.get(name).unwrap(), value, epsilon = 1e-12);
        }
        assert_eq!(reporter.iterations.len(), 1);
        assert!(reporter.summary.unwrap().converged);
    }

    #[test]
    fn evaluate_at_truth_gives_zero_increment() {
        let estimator = ParameterEstimator::new(
            Box::new(MassSpringChain::three_mass()),
            fixed(),
            truth(),
            measured_from_truth(100),
            EstimatorConfig::new(0.2, 1e-6, 50),
        )
        .unwrap();

        let step = estimator.evaluate(&truth(), 0).unwrap();
        assert_eq!(step.cost(), 0.0);
        assert!(step.increment.iter().all(|d| *d == 0.0));
        assert_eq!(step.equations.gram.shape(), (3, 3));
        // Uᵀ U integrals are symmetric by construction.
        assert_abs_diff_eq!(
            step.equations.gram.clone(),
            step.equations.gram.transpose(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn scalar_decay_rate_is_recovered() {
        let true_k = 0.8;
        let params: ParameterSet = [("k", true_k)].into_iter().collect();
        let measured = simulate(&Decay, &params, &DVector::from_element(1, 2.0), 0.05, 80).unwrap();

        let estimator = ParameterEstimator::new(
            Box::new(Decay),
            ParameterSet::new(),
            FreeParameters::new([("k", 0.6)]).unwrap(),
            measured,
            EstimatorConfig::new(0.05, 1e-12, 30),
        )
        .unwrap();

        let result = estimator.run(&mut MemoryReporter::default()).unwrap();
        assert!(result.converged);
        assert_abs_diff_eq!(result.parameters.get("k").unwrap(), true_k, epsilon = 1e-4);
    }

    #[test]
    fn zero_trajectory_is_unidentifiable() {
        let measured = Trajectory::from_matrix(DMatrix::zeros(20, 6)).unwrap();
        let estimator = ParameterEstimator::new(
            Box::new(MassSpringChain::three_mass()),
            fixed(),
            FreeParameters::new([("c1", 0.10), ("c4", 0.08), ("m2", 21.0)]).unwrap(),
            measured,
            EstimatorConfig::new(0.2, 1e-6, 50),
        )
        .unwrap();

        let mut reporter = MemoryReporter::default();
        let err = estimator.run(&mut reporter).unwrap_err();

        assert!(matches!(
            err,
            IdentificationError::SingularGramMatrix { iteration: 0, .. }
        ));
        // The diagnostic for the failing iteration is still emitted, but no summary.
        assert_eq!(reporter.iterations.len(), 1);
        assert!(reporter.summary.is_none());
    }

    #[test]
    fn budget_exhaustion_is_reported_not_raised() {
        let estimator = ParameterEstimator::new(
            Box::new(MassSpringChain::three_mass()),
            fixed(),
            FreeParameters::new([("c1", 0.10), ("c4", 0.08), ("m2", 21.0)]).unwrap(),
            measured_from_truth(100),
            EstimatorConfig::new(0.2, 1e-30, 1),
        )
        .unwrap();

        let result = estimator.run(&mut MemoryReporter::default()).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert!(result.cost > 0.0);
    }

    #[test]
    fn construction_validates_the_problem() {
        let model = || Box::new(MassSpringChain::three_mass()) as Box<dyn LinearSystemModel>;
        let cfg = EstimatorConfig::new(0.2, 1e-6, 50);

        // c1 is both fixed and free.
        let mut overlapping = fixed();
        overlapping.insert("c1", 0.1);
        assert_eq!(
            ParameterEstimator::new(model(), overlapping, truth(), measured_from_truth(5), cfg)
                .err(),
            Some(IdentificationError::DuplicateParameter("c1".into()))
        );

        // Nobody supplies m2.
        let partial = FreeParameters::new([("c1", 0.1), ("c4", 0.08)]).unwrap();
        assert_eq!(
            ParameterEstimator::new(model(), fixed(), partial, measured_from_truth(5), cfg).err(),
            Some(IdentificationError::MissingParameter("m2".into()))
        );

        // Measurements of the wrong width.
        let narrow = Trajectory::from_matrix(DMatrix::zeros(5, 4)).unwrap();
        assert!(matches!(
            ParameterEstimator::new(model(), fixed(), truth(), narrow, cfg),
            Err(IdentificationError::Dimension { .. })
        ));
    }

    #[test]
    fn solve_rejects_ill_conditioned_gram() {
        let equations = NormalEquations {
            gram: DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0 + 1e-14]),
            rhs: DVector::from_vec(vec![1.0, 1.0]),
            cost: 1.0,
        };
        assert!(matches!(
            equations.solve(3, 1e-12),
            Err(IdentificationError::SingularGramMatrix { iteration: 3, .. })
        ));

        let fine = NormalEquations {
            gram: DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]),
            rhs: DVector::from_vec(vec![2.0, 2.0]),
            cost: 1.0,
        };
        let delta = fine.solve(0, f64::EPSILON).unwrap();
        assert_abs_diff_eq!(delta[0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(delta[1], 0.5, epsilon = 1e-15);
    }
}
