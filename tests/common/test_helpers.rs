//! Helper functions for integration tests

use cardio_rs::models::{COMPARTMENT_SLOTS, CurveRegistry, SysPulPeriphCirculation};
use cardio_rs::physics::{Evaluation, StepContext};
use cardio_rs::solver::{FdScheme, compare_jacobians, finite_difference_jacobian};
use nalgebra::DVector;

/// Evaluate `model` at `x`, panicking with the model error on failure.
pub fn evaluate(
    model: &SysPulPeriphCirculation,
    curves: &CurveRegistry,
    ctx: &StepContext,
    x: &DVector<f64>,
    v_ext: &DVector<f64>,
) -> Evaluation {
    model
        .evaluate_detailed(ctx, curves, x, v_ext)
        .unwrap_or_else(|e| panic!("evaluation failed: {}", e))
        .evaluation
}

/// Assert that the analytic W matches central differences entry by entry.
pub fn assert_jacobian_matches(
    model: &SysPulPeriphCirculation,
    curves: &CurveRegistry,
    ctx: &StepContext,
    x: &DVector<f64>,
    v_ext: &DVector<f64>,
    rel_tol: f64,
    message: &str,
) {
    let analytic = evaluate(model, curves, ctx, x, v_ext).stiffness;
    let numeric = finite_difference_jacobian(model, ctx, curves, x, v_ext, FdScheme::Central)
        .unwrap_or_else(|e| panic!("{}: finite differences failed: {}", message, e));

    let comparison = compare_jacobians(&analytic, &numeric, 1e-3);
    if let Some((i, j)) = comparison.worst {
        assert!(
            comparison.passes(rel_tol),
            "{}: W[{}, {}] analytic {:e} vs numeric {:e} (relative error {:e})",
            message,
            i,
            j,
            analytic[(i, j)],
            numeric[(i, j)],
            comparison.max_rel_error
        );
    }
}

/// Total blood volume over every compartment slot.
pub fn compartment_volume_sum(volumes: &DVector<f64>) -> f64 {
    COMPARTMENT_SLOTS.iter().map(|&slot| volumes[slot]).sum()
}
