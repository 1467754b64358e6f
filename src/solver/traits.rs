//! Solver configuration, results and the solver interface
//!
//! # Stability
//!
//! - `Solver` trait: the interface every integrator implements
//! - `SolverConfiguration`: validated once before a run
//! - `SimulationResult`: trajectory plus free-form metadata

use crate::error::{ModelError, ModelResult};
use crate::physics::StateVar;
use crate::solver::Scenario;
use nalgebra::DVector;
use std::collections::HashMap;

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Numerical parameters of a one-step-theta run.
///
/// # Example
///
/// ```rust
/// use cardio_rs::solver::SolverConfiguration;
///
/// let config = SolverConfiguration::new(1e-3, 800)
///     .theta(1.0)
///     .tolerance(1e-10);
/// assert!(config.validate().is_ok());
/// assert!((config.total_time() - 0.8).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfiguration {
    /// Implicitness θ ∈ (0, 1]; 0.5 is Crank-Nicolson, 1 backward Euler.
    pub theta: f64,

    /// Time step size Δt.
    pub time_step: f64,

    /// Number of time steps.
    pub steps: usize,

    /// Absolute tolerance on the Euclidean norm of the residual.
    pub tolerance: f64,

    /// Newton iterations allowed per step.
    pub max_iterations: usize,

    /// Cycle length T for periodicity checks; `None` disables them.
    pub period: Option<f64>,

    /// Cycle error at or below which the run counts as periodic.
    pub eps_periodic: f64,
}

impl SolverConfiguration {
    /// Crank-Nicolson configuration with tolerance 1e-8 and 20 iterations.
    pub fn new(time_step: f64, steps: usize) -> Self {
        Self {
            theta: 0.5,
            time_step,
            steps,
            tolerance: 1e-8,
            max_iterations: 20,
            period: None,
            eps_periodic: 1e-16,
        }
    }

    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder pattern: check periodicity every `period` seconds
    pub fn period(mut self, period: f64) -> Self {
        self.period = Some(period);
        self
    }

    pub fn eps_periodic(mut self, eps_periodic: f64) -> Self {
        self.eps_periodic = eps_periodic;
        self
    }

    pub fn total_time(&self) -> f64 {
        self.time_step * self.steps as f64
    }

    /// Validate configuration
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.time_step > 0.0) || !self.time_step.is_finite() {
            return Err(ModelError::InvalidTimeStep(self.time_step));
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(ModelError::InvalidTheta(self.theta));
        }
        if self.steps == 0 {
            return Err(ModelError::invalid_parameter("steps", "must be greater than 0"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ModelError::invalid_parameter("tolerance", "must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(ModelError::invalid_parameter("max_iterations", "must be greater than 0"));
        }
        if let Some(period) = self.period
            && !(period > 0.0 && period.is_finite())
        {
            return Err(ModelError::invalid_parameter("period", "must be positive"));
        }
        if !(self.eps_periodic >= 0.0) {
            return Err(ModelError::invalid_parameter("eps_periodic", "must not be negative"));
        }
        Ok(())
    }
}

// =================================================================================================
// Simulation result
// =================================================================================================

/// Trajectory of a run.
///
/// `state_trajectory[k]` and `volume_trajectory[k]` belong to
/// `time_points[k]`; index 0 is the initial state.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    pub time_points: Vec<f64>,
    pub state_trajectory: Vec<DVector<f64>>,
    pub volume_trajectory: Vec<DVector<f64>>,
    pub final_state: DVector<f64>,
    pub metadata: HashMap<String, String>,
}

impl SimulationResult {
    pub fn new(
        time_points: Vec<f64>,
        state_trajectory: Vec<DVector<f64>>,
        final_state: DVector<f64>,
    ) -> Self {
        Self {
            time_points,
            state_trajectory,
            volume_trajectory: Vec::new(),
            final_state,
            metadata: HashMap::new(),
        }
    }

    pub fn with_volumes(mut self, volume_trajectory: Vec<DVector<f64>>) -> Self {
        self.volume_trajectory = volume_trajectory;
        self
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Number of stored time points.
    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    /// Number of state variables.
    pub fn dimension(&self) -> usize {
        self.final_state.len()
    }

    /// Time series of state `index`.
    pub fn series(&self, index: usize) -> Vec<f64> {
        self.state_trajectory.iter().map(|x| x[index]).collect()
    }

    /// Time series of a named state, e.g. `p_v_l`.
    pub fn series_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let index = StateVar::from_name(name)?.index();
        (index < self.dimension()).then(|| self.series(index))
    }

    /// Time series of volume slot `index`; empty without volumes.
    pub fn volume_series(&self, index: usize) -> Vec<f64> {
        self.volume_trajectory.iter().map(|v| v[index]).collect()
    }
}

// =================================================================================================
// Solver trait
// =================================================================================================

/// A time integrator for [`Scenario`]s.
pub trait Solver {
    /// Integrate the scenario.
    ///
    /// # Errors
    ///
    /// Invalid configuration, model errors, Newton failure, or non-finite
    /// states.
    fn solve(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> ModelResult<SimulationResult>;

    fn name(&self) -> &str;
}
