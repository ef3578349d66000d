// sensid_core/src/models/mass_spring.rs

use nalgebra::DMatrix;

use crate::error::{IdentificationError, IdentificationResult};
use crate::models::LinearSystemModel;
use crate::params::ParameterSet;
use crate::types::SystemMatrix;

// --- Mass-Spring Chain ---
// N masses in a line between two fixed walls, joined by N+1 springs:
//
//   |--c1--[m1]--c2--[m2]-- ... --[mN]--c{N+1}--|
//
// The state is [y1, dy1/dt, y2, dy2/dt, ..., yN, dyN/dt].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassSpringChain {
    masses: usize,
}

impl MassSpringChain {
    pub fn new(masses: usize) -> IdentificationResult<Self> {
        if masses == 0 {
            return Err(IdentificationError::InvalidConfig(
                "a mass-spring chain needs at least one mass".to_string(),
            ));
        }
        Ok(Self { masses })
    }

    /// The three-mass, four-spring chain.
    pub fn three_mass() -> Self {
        Self { masses: 3 }
    }

    fn stiffness_name(i: usize) -> String {
        format!("c{}", i + 1)
    }

    fn mass_name(i: usize) -> String {
        format!("m{}", i + 1)
    }
}

impl LinearSystemModel for MassSpringChain {
    fn get_state_labels(&self) -> Vec<String> {
        (1..=self.masses)
            .flat_map(|i| [format!("y{i}"), format!("dy{i}/dt")])
            .collect()
    }

    fn get_state_dim(&self) -> usize {
        2 * self.masses
    }

    fn get_required_parameters(&self) -> Vec<String> {
        let springs = (0..=self.masses).map(Self::stiffness_name);
        let masses = (0..self.masses).map(Self::mass_name);
        springs.chain(masses).collect()
    }

    fn build_system_matrix(&self, params: &ParameterSet) -> IdentificationResult<SystemMatrix> {
        // Resolve every symbol before touching the matrix.
        self.check_parameters(params)?;
        let springs = (0..=self.masses)
            .map(|i| params.require(&Self::stiffness_name(i)))
            .collect::<IdentificationResult<Vec<f64>>>()?;
        let masses = (0..self.masses)
            .map(|i| params.require(&Self::mass_name(i)))
            .collect::<IdentificationResult<Vec<f64>>>()?;

        if let Some(i) = masses.iter().position(|m| *m == 0.0) {
            return Err(IdentificationError::InvalidConfig(format!(
                "mass '{}' must be non-zero",
                Self::mass_name(i)
            )));
        }

        let n = self.get_state_dim();
        let mut a = DMatrix::zeros(n, n);
        for i in 0..self.masses {
            let (pos, vel) = (2 * i, 2 * i + 1);
            let (left, right, m) = (springs[i], springs[i + 1], masses[i]);

            // d(y_i)/dt = v_i
            a[(pos, vel)] = 1.0;

            // m_i·a_i = -(c_left + c_right)·y_i + c_left·y_{i-1} + c_right·y_{i+1}
            a[(vel, pos)] = -(left + right) / m;
            if i > 0 {
                a[(vel, pos - 2)] = left / m;
            }
            if i + 1 < self.masses {
                a[(vel, pos + 2)] = right / m;
            }
        }

        Ok(a)
    }
}
