// sensid_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::reporting::Reporter;
pub use crate::models::LinearSystemModel;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::error::{IdentificationError, IdentificationResult};
pub use crate::params::{FreeParameters, ParameterSet};
pub use crate::trajectory::Trajectory;
pub use crate::types::{SensitivityMatrix, State, SystemMatrix};

// --- Estimation Algorithms ---
pub use crate::estimation::estimator::{IterationStep, ParameterEstimator};
pub use crate::estimation::{EstimationResult, EstimatorConfig};
pub use crate::sensitivity::central_difference_jacobian;
pub use crate::simulation::simulate;

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::mass_spring::MassSpringChain;
