//! Simulation scenario definition
//!
//! A scenario combines a residual model with everything it needs from the
//! outside: time curves, an initial state and the external volume vector.
use crate::error::{ModelError, ModelResult};
use crate::physics::{ResidualModel, TimeFunctionOracle};
use nalgebra::DVector;

/// Simulation scenario
///
/// The same scenario can be integrated with different configurations.
/// This is the "WHAT to solve" (not "HOW to solve").
pub struct Scenario {
    pub model: Box<dyn ResidualModel>,
    pub oracle: Box<dyn TimeFunctionOracle>,
    pub initial_state: DVector<f64>,

    /// Passed as `v_ext` on every evaluation; zeros unless set.
    pub external_volumes: DVector<f64>,

    pub start_time: f64,
}

impl Scenario {
    pub fn new(
        model: Box<dyn ResidualModel>,
        oracle: Box<dyn TimeFunctionOracle>,
        initial_state: DVector<f64>,
    ) -> Self {
        let external_volumes = DVector::zeros(model.dimension());
        Self {
            model,
            oracle,
            initial_state,
            external_volumes,
            start_time: 0.0,
        }
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_external_volumes(mut self, external_volumes: DVector<f64>) -> Self {
        self.external_volumes = external_volumes;
        self
    }

    /// Check vector lengths against the model dimension.
    pub fn validate(&self) -> ModelResult<()> {
        let n = self.model.dimension();
        if self.initial_state.len() != n {
            return Err(ModelError::DimensionMismatch {
                what: "initial state",
                expected: n,
                actual: self.initial_state.len(),
            });
        }
        ModelError::check_len("external volumes", n, self.external_volumes.len())
    }

    pub fn get_model_name(&self) -> &str {
        self.model.name()
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_model_name())
            .field("dimension", &self.dimension())
            .field("start time", &self.start_time)
            .field("initial state", &self.initial_state)
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
