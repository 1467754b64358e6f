//! Error types for the circulation model.
//!
//! Every fatal condition the evaluator, the coupling pass, the assembly
//! helpers or the stand-alone integrator can hit maps onto one variant of
//! [`ModelError`]. A singular blood content Jacobian is not a variant: it
//! shows up as non-finite numbers and is reported by
//! [`crate::solver::validate_state`] when a caller asks for it.

use thiserror::Error;

/// Errors that can occur while building, evaluating or integrating the model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The structural discretization has not been finalised.
    #[error("fill_complete() was not called")]
    FillCompleteNotCalled,

    /// The structural discretization has no degrees of freedom yet.
    #[error("assign_degrees_of_freedom() was not called")]
    DofsNotAssigned,

    /// A discrete model option holds a value outside its enumeration.
    #[error("undefined {option}: {value}")]
    UndefinedModel {
        /// Option key, e.g. `ATRIUM_MODEL`.
        option: &'static str,
        /// Offending value.
        value: String,
    },

    /// A chamber resolved to a non-positive elastance.
    #[error("non-positive elastance {value} in {chamber}")]
    NonPositiveElastance {
        /// Chamber name.
        chamber: &'static str,
        /// Resolved elastance.
        value: f64,
    },

    /// A compartment feeding a gas-transport row has no volume.
    #[error("non-positive volume {value} in compartment {compartment}")]
    NonPositiveVolume {
        /// Compartment tag.
        compartment: String,
        /// Volume value.
        value: f64,
    },

    /// A parameter is outside its admissible range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter key.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Time step size must be strictly positive.
    #[error("time step size must be positive, got {0}")]
    InvalidTimeStep(f64),

    /// Theta must lie in (0, 1].
    #[error("theta must lie in (0, 1], got {0}")]
    InvalidTheta(f64),

    /// A vector handed to the model has the wrong length.
    #[error("{what} has length {actual}, expected at least {expected}")]
    DimensionMismatch {
        /// Which vector.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Provided length.
        actual: usize,
    },

    /// No curve is registered under this id.
    #[error("unknown time function {0}")]
    UnknownTimeFunction(usize),

    /// A global row is not owned locally or is out of range.
    #[error("SumIntoGlobalValues failed! (row {row})")]
    AssemblyFailed {
        /// Global row id.
        row: usize,
    },

    /// A structural element reported inconsistent coupling data.
    #[error("error while evaluating elements of condition {condition}: {reason}")]
    ElementEvaluation {
        /// Coupling condition id.
        condition: usize,
        /// Description of the inconsistency.
        reason: String,
    },

    /// The stand-alone Newton driver did not reach the tolerance.
    #[error("Newton iteration did not converge at step {step}: residual {residual:e} after {iterations} iterations")]
    NotConverged {
        /// Time step index.
        step: usize,
        /// Iterations performed.
        iterations: usize,
        /// Final residual norm.
        residual: f64,
    },

    /// A non-finite value appeared in a state.
    #[error("{kind} detected in {name} at step {step}")]
    NonFinite {
        /// `NaN` or `Infinity`.
        kind: &'static str,
        /// State variable name.
        name: String,
        /// Time step index.
        step: usize,
    },

    /// Configuration that the chosen solver cannot handle.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}

impl ModelError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an element evaluation error.
    #[must_use]
    pub fn element_evaluation(condition: usize, reason: impl Into<String>) -> Self {
        Self::ElementEvaluation {
            condition,
            reason: reason.into(),
        }
    }

    /// Checks that a vector is long enough.
    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> ModelResult<()> {
        if actual < expected {
            return Err(Self::DimensionMismatch {
                what,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
