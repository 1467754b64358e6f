//! Residual model traits and types
//!
//! This module defines the API shared by the circulation model and the
//! time integrators:
//! - `TimeFunctionOracle`: resolves curve ids to scalar values at time t
//! - `StepContext`: time level, step size and theta of one evaluation
//! - `Evaluation`: the residual pieces and their Jacobian
//! - `ResidualModel`: trait implemented by every evaluable 0D model

use crate::error::{ModelError, ModelResult};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

/// Identifier of a time curve, as handed in by the input layer.
pub type CurveId = usize;

// =================================================================================================
// Time function oracle
// =================================================================================================

/// Resolves a curve id to its value at time `t`.
///
/// Implementations must be pure: the same `(id, t)` always gives the same
/// value. The model never resolves curves at negative times; see
/// [`StepContext::curves_enabled`].
pub trait TimeFunctionOracle: Send + Sync {
    /// Value of curve `id` at time `t`.
    fn resolve(&self, id: CurveId, t: f64) -> ModelResult<f64>;
}

// =================================================================================================
// Step context
// =================================================================================================

/// Time level and scheme parameters of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Time at the new level. Negative disables time-dependent lookups.
    pub time: f64,

    /// Time step size Δt.
    pub dt: f64,

    /// One-step-theta weight θ.
    pub theta: f64,
}

impl StepContext {
    pub fn new(time: f64, dt: f64, theta: f64) -> Self {
        Self { time, dt, theta }
    }

    /// Check Δt > 0 and θ ∈ (0, 1].
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ModelError::InvalidTimeStep(self.dt));
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(ModelError::InvalidTheta(self.theta));
        }
        Ok(())
    }

    /// Whether curves are resolved at this time level.
    pub fn curves_enabled(&self) -> bool {
        self.time >= 0.0
    }

    /// Resolve an optional curve, yielding 0 when there is none or lookups
    /// are disabled.
    pub fn curve_value(
        &self,
        oracle: &dyn TimeFunctionOracle,
        curve: Option<CurveId>,
    ) -> ModelResult<f64> {
        match curve {
            Some(id) if self.curves_enabled() => oracle.resolve(id, self.time),
            _ => Ok(0.0),
        }
    }
}

// =================================================================================================
// Evaluation result
// =================================================================================================

/// Residual pieces of one evaluation.
///
/// The discrete residual of the one-step-theta scheme is
///
/// $$ r = \frac{df_{n+1} - df_n}{\Delta t} + \theta f_{n+1} + (1-\theta) f_n $$
///
/// The model only knows the new time level, so it returns `df_np`, `f_np`
/// and `stiffness` $= \partial(df/\Delta t + \theta f)/\partial x$. The
/// integrator owns the old-level data.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Storage part at the new level.
    pub df_np: DVector<f64>,

    /// Flux part at the new level.
    pub f_np: DVector<f64>,

    /// Jacobian W.
    pub stiffness: DMatrix<f64>,

    /// Compartment volumes and saturations.
    pub volumes: DVector<f64>,

    /// Scalar diagnostics.
    pub metadata: HashMap<String, f64>,
}

impl Evaluation {
    /// Zero-initialised evaluation of dimension `n`, starting from the
    /// caller's volume vector.
    pub fn zeros(n: usize, volumes: DVector<f64>) -> Self {
        Self {
            df_np: DVector::zeros(n),
            f_np: DVector::zeros(n),
            stiffness: DMatrix::zeros(n, n),
            volumes,
            metadata: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.df_np.len()
    }

    /// Residual of the theta scheme against old-level data.
    pub fn theta_residual(
        &self,
        df_n: &DVector<f64>,
        f_n: &DVector<f64>,
        ctx: &StepContext,
    ) -> DVector<f64> {
        (&self.df_np - df_n) / ctx.dt + &self.f_np * ctx.theta + f_n * (1.0 - ctx.theta)
    }

    pub fn get_metadata(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).copied()
    }

    pub fn set_metadata(&mut self, key: &str, value: f64) {
        self.metadata.insert(key.to_string(), value);
    }
}

// =================================================================================================
// Residual model trait
// =================================================================================================

/// Trait for 0D models evaluated inside a monolithic Newton loop.
///
/// # Responsibility
/// Computes the residual pieces and the Jacobian at a given state and time
/// level. Does NOT advance time (that's the integrator's job).
pub trait ResidualModel: Send + Sync {
    /// Number of unknowns N.
    fn dimension(&self) -> usize;

    /// Evaluate at state `x` with externally supplied volumes `volumes`.
    ///
    /// `volumes` carries chamber volumes for chambers driven by a 3D
    /// structure; entries the model computes itself are overwritten in
    /// the returned [`Evaluation::volumes`].
    fn evaluate(
        &self,
        ctx: &StepContext,
        oracle: &dyn TimeFunctionOracle,
        x: &DVector<f64>,
        volumes: &DVector<f64>,
    ) -> ModelResult<Evaluation>;

    /// Whether the model needs a 3D structure to supply volumes.
    fn requires_structure(&self) -> bool {
        false
    }

    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }
}
