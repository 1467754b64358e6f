//! Time curves for activation, pleural pressure and prescribed elastance
//!
//! Every time-dependent input of the circulation model is a scalar curve
//! `y(t)` addressed by an integer id:
//!
//! - **Chamber activation** y(t) ∈ [0, 1] blending E_min and E_max
//! - **Prescribed elastance** E(t) read directly from the curve
//! - **Pleural pressure** U_t(t) driving the alveolar compartment
//!
//! [`CurveRegistry`] stores curves under their ids and answers the model's
//! lookups through [`TimeFunctionOracle`].
//!
//! # Example
//!
//! ```rust
//! use cardio_rs::models::{CurveRegistry, TimeCurve};
//! use cardio_rs::physics::TimeFunctionOracle;
//!
//! let registry = CurveRegistry::new()
//!     .with(1, TimeCurve::activation(0.0, 0.3, 1.0).unwrap())
//!     .with(2, TimeCurve::constant(-0.5));
//!
//! assert!((registry.resolve(1, 0.15).unwrap() - 1.0).abs() < 1e-12);
//! assert_eq!(registry.resolve(2, 42.0).unwrap(), -0.5);
//! ```

use crate::error::{ModelError, ModelResult};
use crate::physics::{CurveId, TimeFunctionOracle};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Scalar time profile.
pub enum TimeCurve {
    /// Constant value.
    Constant(f64),

    /// Linear interpolation between sample points, held constant outside
    /// the samples. With a period, `t` is wrapped into `[t_0, t_0 + period)`.
    PiecewiseLinear {
        times: Vec<f64>,
        values: Vec<f64>,
        period: Option<f64>,
    },

    /// Periodic raised-cosine activation pulse
    ///
    /// ```text
    /// y(τ) = ½·(1 − cos(2π (τ − t_c)/(t_r − t_c)))   for t_c ≤ τ ≤ t_r
    /// y(τ) = 0                                        otherwise
    /// ```
    ///
    /// with τ = t mod period.
    Activation {
        t_contract: f64,
        t_relax: f64,
        period: f64,
    },

    /// User-defined profile.
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),

    /// Identically zero.
    Zero,
}

impl Clone for TimeCurve {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(*value),
            Self::PiecewiseLinear { times, values, period } => Self::PiecewiseLinear {
                times: times.clone(),
                values: values.clone(),
                period: *period,
            },
            Self::Activation { t_contract, t_relax, period } => Self::Activation {
                t_contract: *t_contract,
                t_relax: *t_relax,
                period: *period,
            },
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
            Self::Zero => Self::Zero,
        }
    }
}

impl fmt::Debug for TimeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "Constant({})", value),
            Self::PiecewiseLinear { times, period, .. } => f
                .debug_struct("PiecewiseLinear")
                .field("samples", &times.len())
                .field("period", period)
                .finish(),
            Self::Activation { t_contract, t_relax, period } => f
                .debug_struct("Activation")
                .field("t_contract", t_contract)
                .field("t_relax", t_relax)
                .field("period", period)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
            Self::Zero => write!(f, "Zero"),
        }
    }
}

impl TimeCurve {
    pub fn constant(value: f64) -> Self {
        Self::Constant(value)
    }

    /// Piecewise-linear curve through `(times[i], values[i])`.
    ///
    /// # Errors
    ///
    /// Empty or mismatched samples, times not strictly increasing, or a
    /// non-positive period.
    pub fn piecewise_linear(
        times: Vec<f64>,
        values: Vec<f64>,
        period: Option<f64>,
    ) -> ModelResult<Self> {
        if times.is_empty() || times.len() != values.len() {
            return Err(ModelError::invalid_parameter(
                "curve samples",
                format!("{} times versus {} values", times.len(), values.len()),
            ));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::invalid_parameter(
                "curve samples",
                "times must be strictly increasing",
            ));
        }
        if let Some(p) = period
            && !(p > 0.0) {
                return Err(ModelError::invalid_parameter("curve period", "must be positive"));
            }
        Ok(Self::PiecewiseLinear { times, values, period })
    }

    /// Periodic activation pulse between `t_contract` and `t_relax`.
    pub fn activation(t_contract: f64, t_relax: f64, period: f64) -> ModelResult<Self> {
        if !(period > 0.0) {
            return Err(ModelError::invalid_parameter("activation period", "must be positive"));
        }
        if !(t_relax > t_contract) || t_contract < 0.0 || t_relax > period {
            return Err(ModelError::invalid_parameter(
                "activation window",
                format!(
                    "need 0 <= t_contract < t_relax <= period, got [{}, {}] in {}",
                    t_contract, t_relax, period
                ),
            ));
        }
        Ok(Self::Activation { t_contract, t_relax, period })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Value at time `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::PiecewiseLinear { times, values, period } => {
                let t = match period {
                    Some(p) => times[0] + (t - times[0]).rem_euclid(*p),
                    None => t,
                };
                interpolate(times, values, t)
            }
            Self::Activation { t_contract, t_relax, period } => {
                let tau = t.rem_euclid(*period);
                if tau < *t_contract || tau > *t_relax {
                    0.0
                } else {
                    0.5 * (1.0 - (2.0 * PI * (tau - t_contract) / (t_relax - t_contract)).cos())
                }
            }
            Self::Custom(f) => f(t),
            Self::Zero => 0.0,
        }
    }
}

fn interpolate(times: &[f64], values: &[f64], t: f64) -> f64 {
    let last = times.len() - 1;
    if t <= times[0] {
        return values[0];
    }
    if t >= times[last] {
        return values[last];
    }
    // First sample strictly after t; exists because t < times[last].
    let upper = times.partition_point(|&ti| ti <= t);
    let lower = upper - 1;
    let w = (t - times[lower]) / (times[upper] - times[lower]);
    (1.0 - w) * values[lower] + w * values[upper]
}

// =================================================================================================
// Curve registry
// =================================================================================================

/// Curves addressed by id.
#[derive(Debug, Clone, Default)]
pub struct CurveRegistry {
    curves: HashMap<CurveId, TimeCurve>,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: register a curve.
    pub fn with(mut self, id: CurveId, curve: TimeCurve) -> Self {
        self.insert(id, curve);
        self
    }

    /// Register or replace a curve.
    pub fn insert(&mut self, id: CurveId, curve: TimeCurve) {
        self.curves.insert(id, curve);
    }

    pub fn get(&self, id: CurveId) -> Option<&TimeCurve> {
        self.curves.get(&id)
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

impl TimeFunctionOracle for CurveRegistry {
    fn resolve(&self, id: CurveId, t: f64) -> ModelResult<f64> {
        self.curves
            .get(&id)
            .map(|curve| curve.evaluate(t))
            .ok_or(ModelError::UnknownTimeFunction(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_activation_shape() {
        let curve = TimeCurve::activation(0.1, 0.5, 1.0).unwrap();

        assert_eq!(curve.evaluate(0.05), 0.0);
        assert_relative_eq!(curve.evaluate(0.3), 1.0, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(0.1), 0.0, epsilon = 1e-12);
        assert_eq!(curve.evaluate(0.8), 0.0);

        // One period later
        assert_relative_eq!(curve.evaluate(1.3), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_activation_rejects_bad_window() {
        assert!(TimeCurve::activation(0.5, 0.1, 1.0).is_err());
        assert!(TimeCurve::activation(0.0, 1.5, 1.0).is_err());
        assert!(TimeCurve::activation(0.0, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_piecewise_linear_interpolation() {
        let curve = TimeCurve::piecewise_linear(
            vec![0.0, 1.0, 3.0],
            vec![0.0, 2.0, -2.0],
            None,
        ).unwrap();

        assert_relative_eq!(curve.evaluate(-1.0), 0.0);
        assert_relative_eq!(curve.evaluate(0.5), 1.0);
        assert_relative_eq!(curve.evaluate(1.0), 2.0);
        assert_relative_eq!(curve.evaluate(2.0), 0.0);
        assert_relative_eq!(curve.evaluate(10.0), -2.0);
    }

    #[test]
    fn test_piecewise_linear_periodic() {
        let curve = TimeCurve::piecewise_linear(
            vec![0.0, 0.5, 1.0],
            vec![0.0, 1.0, 0.0],
            Some(1.0),
        ).unwrap();

        assert_relative_eq!(curve.evaluate(0.25), 0.5);
        assert_relative_eq!(curve.evaluate(2.25), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_piecewise_linear_validation() {
        assert!(TimeCurve::piecewise_linear(vec![], vec![], None).is_err());
        assert!(TimeCurve::piecewise_linear(vec![0.0, 1.0], vec![0.0], None).is_err());
        assert!(TimeCurve::piecewise_linear(vec![1.0, 1.0], vec![0.0, 0.0], None).is_err());
        assert!(TimeCurve::piecewise_linear(vec![0.0, 1.0], vec![0.0, 0.0], Some(-1.0)).is_err());
    }

    #[test]
    fn test_custom_and_clone() {
        let curve = TimeCurve::custom(|t| 2.0 * t);
        let copy = curve.clone();
        assert_relative_eq!(copy.evaluate(1.5), 3.0);
    }

    #[test]
    fn test_registry_unknown_id() {
        let registry = CurveRegistry::new().with(3, TimeCurve::Zero);
        assert_eq!(registry.resolve(3, 1.0).unwrap(), 0.0);
        assert!(matches!(registry.resolve(4, 1.0), Err(ModelError::UnknownTimeFunction(4))));
        assert_eq!(registry.len(), 1);
    }
}
