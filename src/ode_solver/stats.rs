use serde::{Deserialize, Serialize};

/// Diagnostic counters accumulated over one solve. Snapshotted with
/// `insta` in tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SolverStatistics {
    pub number_of_steps: usize,
    pub number_of_accepted_steps: usize,
    pub number_of_rejected_steps: usize,
    pub number_of_newton_iterations: usize,
    pub number_of_newton_failures: usize,
    pub number_of_jacobian_evals: usize,
    pub number_of_mass_matrix_evals: usize,
    pub number_of_linear_solver_setups: usize,
    pub number_of_ill_conditioned_warnings: usize,
    pub initial_step_size: f64,
    pub final_step_size: f64,
}
