use std::rc::Rc;

use crate::config::SolverConfig;
use crate::errors::ConfigError;
use crate::op::OdeEquations;
use crate::scalar::Scalar;

/// The bundle an `OdeSolverMethod` is handed: the equations and the
/// validated configuration they'll be integrated under. Construction
/// always goes through `validate()` (§7 "programmer errors ... reported at
/// call entry before any integration begins").
pub struct OdeSolverProblem<Eqn: OdeEquations> {
    pub eqn: Rc<Eqn>,
    pub config: SolverConfig<Eqn::T>,
}

impl<Eqn: OdeEquations> Clone for OdeSolverProblem<Eqn> {
    fn clone(&self) -> Self {
        Self {
            eqn: self.eqn.clone(),
            config: self.config.clone(),
        }
    }
}

impl<Eqn: OdeEquations> OdeSolverProblem<Eqn> {
    pub fn new(eqn: Eqn, config: SolverConfig<Eqn::T>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { eqn: Rc::new(eqn), config })
    }

    pub fn nstates(&self) -> usize {
        self.eqn.nstates()
    }
}
