use thiserror::Error;

/// Unrecoverable, solve-local failures (§7). The solve aborts and a
/// categorized failure is returned to the caller; the state vector's
/// contents are left undefined-but-valid.
#[derive(Error, Debug, Clone)]
pub enum SolveError {
    #[error("step size underflowed below dt_min = {dt_min} at t = {t}")]
    StepSizeUnderflow { t: f64, dt_min: f64 },
    #[error("step rejection budget exceeded ({rejections} rejections at t = {t})")]
    RejectionBudgetExceeded { t: f64, rejections: usize },
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
    #[error("user Jacobian returned a structurally inconsistent pattern on call {call_index}")]
    InconsistentJacobianPattern { call_index: usize },
    #[error("linear solver reported an internal/out-of-memory failure: {reason}")]
    LinearSolverFatal { reason: String },
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Outcomes from the linear solver facade (§4.2). `Singular` is recoverable
/// (the Newton iterator turns it into `NewtonOutcome::SingularJacobian`);
/// `Fatal` aborts the whole solve. Ill-conditioning is not an error variant
/// here — it is tracked as a warning counter on the solver itself (§4.2).
#[derive(Error, Debug, Clone)]
pub enum LinearSolverError {
    #[error("factorization detected a zero pivot")]
    Singular,
    #[error("linear solver backend failure: {0}")]
    Fatal(String),
}

/// Programmer errors (§7), reported at call entry before any integration begins.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("required callback is missing: {which}")]
    NullCallback { which: &'static str },
    #[error("state vector length {got} does not match problem dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("bdf_order {order} is out of range 1..=6")]
    OrderOutOfRange { order: usize },
    #[error("tolerance must be positive, got {value}")]
    NegativeTolerance { value: f64 },
    #[error("malformed CSR matrix: {reason}")]
    MalformedCsr { reason: String },
}
