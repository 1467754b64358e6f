//! Numerical drivers around the residual models
//!
//! The models in [`crate::models`] only evaluate `df_np`, `f_np` and W at
//! one time level. This module holds everything that drives them:
//!
//! - **`traits`**: [`SolverConfiguration`], [`SimulationResult`] and the
//!   [`Solver`] trait
//! - **`scenario`**: [`Scenario`], a model bundled with its time curves,
//!   initial state and external volumes
//! - **`theta`**: [`ThetaSolver`], a Newton one-step-theta integrator for
//!   stand-alone 0D runs
//! - **`assembly`**: adding local blocks into caller-owned global storage
//!   at an offset
//! - **`fd_check`**: finite-difference Jacobians to verify the analytic W
//!
//! # Workflow
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────┐
//! │ ResidualModel    │   │ Time curves    │
//! └────────┬─────────┘   └───────┬────────┘
//!          └──────────┬──────────┘
//!            ┌────────▼─────────┐
//!            │ Scenario         │ ← WHAT to solve
//!            │ (+ initial x)    │
//!            └────────┬─────────┘
//!            ┌────────▼─────────────┐
//!            │ SolverConfiguration  │ ← HOW to solve
//!            │ (θ, Δt, steps, tol)  │
//!            └────────┬─────────────┘
//!            ┌────────▼─────────┐
//!            │ ThetaSolver      │
//!            └────────┬─────────┘
//!            ┌────────▼─────────────┐
//!            │ SimulationResult     │
//!            │ (states + volumes)   │
//!            └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cardio_rs::solver::{Scenario, Solver, SolverConfiguration, ThetaSolver};
//!
//! let scenario = Scenario::new(Box::new(model), Box::new(curves), x0);
//! let config = SolverConfiguration::new(1e-3, 800).theta(0.5);
//! let result = ThetaSolver.solve(&scenario, &config)?;
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod assembly;
pub mod fd_check;
mod scenario;
mod theta;
mod traits;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// Finite-difference Jacobians evaluate the full model once per column (twice
// for central differences). Above the threshold the columns are spread over
// the Rayon pool when the `parallel` feature is enabled.
//
// Stored in an AtomicUsize so benchmarks and tests can change it at run
// time. Relaxed ordering is enough: the value is a performance hint, not a
// synchronisation point.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of columns above which finite-difference Jacobians are
/// computed in parallel.
const DEFAULT_PARALLEL_THRESHOLD: usize = 48;

static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// # Example
///
/// ```rust
/// use cardio_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`.
///
/// # Example
///
/// ```rust
/// use cardio_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(16);
/// assert_eq!(parallel_threshold(), 16);
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

#[cfg(test)]
static THRESHOLD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// RAII guard that sets the threshold and restores the previous value on
/// drop. Guards are serialised, so tests running in parallel never see each
/// other's threshold. Test builds only.
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
impl ThresholdGuard {
    pub(crate) fn save(new_value: usize) -> Self {
        let lock = THRESHOLD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self { previous, _lock: lock }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use assembly::{
    GlobalMatrix, GlobalVector, SparseAssembly, assemble_coupling, assemble_evaluation,
};
pub use fd_check::{FdScheme, JacobianComparison, compare_jacobians, finite_difference_jacobian};
pub use scenario::Scenario;
pub use theta::ThetaSolver;
pub use traits::{SimulationResult, Solver, SolverConfiguration};

// =================================================================================================
// Helper Functions
// =================================================================================================

use crate::error::{ModelError, ModelResult};
use crate::physics::StateVar;
use nalgebra::DVector;

/// Check a state vector for NaN or Inf entries.
///
/// The error names the first offending state variable, e.g.
/// `NaN detected in ppO2_ar_sys at step 12`.
pub fn validate_state(state: &DVector<f64>, step: usize) -> ModelResult<()> {
    for (index, value) in state.iter().enumerate() {
        if value.is_finite() {
            continue;
        }
        let name = StateVar::from_index(index)
            .map(StateVar::name)
            .unwrap_or_else(|| format!("x[{}]", index));
        return Err(ModelError::NonFinite {
            kind: if value.is_nan() { "NaN" } else { "Infinity" },
            name,
            step,
        });
    }
    Ok(())
}

/// Periodicity error between the states at two consecutive cycle ends:
/// max over j of |x_j(T_k+1) − x_j(T_k)| / max(1, |x_j(T_k)|).
pub fn cycle_error(previous: &DVector<f64>, current: &DVector<f64>) -> f64 {
    previous
        .iter()
        .zip(current.iter())
        .map(|(p, c)| (c - p).abs() / p.abs().max(1.0))
        .fold(0.0, f64::max)
}

/// Whether `time` is a positive multiple of `period` up to round-off.
pub fn is_period_boundary(time: f64, period: f64) -> bool {
    let cycles = time / period;
    cycles >= 0.5 && (cycles - cycles.round()).abs() <= 1e-9 * cycles.max(1.0)
}

// =================================================================================================
// Tests
// =================================================================================================
