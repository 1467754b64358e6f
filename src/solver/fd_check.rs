//! Finite-difference Jacobian check
//!
//! Approximates $W = \partial(df/\Delta t + \theta f)/\partial x$ column by
//! column by perturbing one state at a time:
//!
//! | scheme | column j | step |
//! |---|---|---|
//! | `Forward` | $(g(x + h e_j) - g(x))/h$ | $\sqrt{\epsilon}\,\max(\lvert x_j\rvert, 1)$ |
//! | `Central` | $(g(x + h e_j) - g(x - h e_j))/2h$ | $\sqrt[3]{\epsilon}\,\max(\lvert x_j\rvert, 1)$ |
//!
//! With the `parallel` feature the columns are spread over the Rayon pool
//! once the dimension reaches [`parallel_threshold`](crate::solver::parallel_threshold).
//!
//! Valve laws and the inspiration/expiration switch are piecewise: a
//! perturbation that crosses a switching point produces a meaningless
//! column, so check states away from those points.

use crate::error::ModelResult;
use crate::physics::{ResidualModel, StepContext, TimeFunctionOracle};
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Difference scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FdScheme {
    Forward,
    #[default]
    Central,
}

impl FdScheme {
    fn step(self, x: f64) -> f64 {
        let scale = x.abs().max(1.0);
        match self {
            FdScheme::Forward => f64::EPSILON.sqrt() * scale,
            FdScheme::Central => f64::EPSILON.cbrt() * scale,
        }
    }
}

/// df_np/Δt + θ·f_np at `x`.
fn scaled_residual(
    model: &dyn ResidualModel,
    ctx: &StepContext,
    oracle: &dyn TimeFunctionOracle,
    x: &DVector<f64>,
    volumes: &DVector<f64>,
) -> ModelResult<DVector<f64>> {
    let eval = model.evaluate(ctx, oracle, x, volumes)?;
    Ok(eval.df_np / ctx.dt + eval.f_np * ctx.theta)
}

/// Finite-difference approximation of the model's W at `x`.
pub fn finite_difference_jacobian(
    model: &dyn ResidualModel,
    ctx: &StepContext,
    oracle: &dyn TimeFunctionOracle,
    x: &DVector<f64>,
    volumes: &DVector<f64>,
    scheme: FdScheme,
) -> ModelResult<DMatrix<f64>> {
    let n = x.len();
    let base = match scheme {
        FdScheme::Forward => Some(scaled_residual(model, ctx, oracle, x, volumes)?),
        FdScheme::Central => None,
    };

    let column = |j: usize| -> ModelResult<DVector<f64>> {
        let h = scheme.step(x[j]);
        let mut plus = x.clone();
        plus[j] += h;
        let g_plus = scaled_residual(model, ctx, oracle, &plus, volumes)?;

        match &base {
            Some(g) => Ok((g_plus - g) / h),
            None => {
                let mut minus = x.clone();
                minus[j] -= h;
                let g_minus = scaled_residual(model, ctx, oracle, &minus, volumes)?;
                Ok((g_plus - g_minus) / (2.0 * h))
            }
        }
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<DVector<f64>> = if n >= crate::solver::parallel_threshold() {
        (0..n).into_par_iter().map(column).collect::<ModelResult<_>>()?
    } else {
        (0..n).map(column).collect::<ModelResult<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let columns: Vec<DVector<f64>> = (0..n).map(column).collect::<ModelResult<_>>()?;

    Ok(DMatrix::from_columns(&columns))
}

/// Largest deviation between an analytic and a numeric Jacobian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianComparison {
    pub max_abs_error: f64,

    /// Largest |a − n| / max(|a|, |n|, floor).
    pub max_rel_error: f64,

    /// Entry (row, column) of the largest relative error.
    pub worst: Option<(usize, usize)>,
}

impl JacobianComparison {
    pub fn passes(&self, rel_tol: f64) -> bool {
        self.max_rel_error <= rel_tol
    }
}

/// Compare entry by entry. `floor` keeps entries that are zero in both
/// matrices from dominating the relative error.
pub fn compare_jacobians(
    analytic: &DMatrix<f64>,
    numeric: &DMatrix<f64>,
    floor: f64,
) -> JacobianComparison {
    let mut comparison = JacobianComparison {
        max_abs_error: 0.0,
        max_rel_error: 0.0,
        worst: None,
    };

    for j in 0..analytic.ncols().min(numeric.ncols()) {
        for i in 0..analytic.nrows().min(numeric.nrows()) {
            let (a, n) = (analytic[(i, j)], numeric[(i, j)]);
            let abs = (a - n).abs();
            let rel = abs / a.abs().max(n.abs()).max(floor);
            comparison.max_abs_error = comparison.max_abs_error.max(abs);
            if rel > comparison.max_rel_error {
                comparison.max_rel_error = rel;
                comparison.worst = Some((i, j));
            }
        }
    }
    comparison
}
