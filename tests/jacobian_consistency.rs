//! Analytic W against central finite differences
//!
//! Δt = 1 keeps the df/Δt and θ·f contributions on the same scale, so the
//! comparison is sensitive to errors in either part. All states sit away
//! from valve ties and from the inspiration/expiration switch.

mod common;

use cardio_rs::models::SysPulPeriphCirculation;
use cardio_rs::physics::StepContext;
use common::*;
use nalgebra::DVector;

const REL_TOL: f64 = 1e-5;

fn context() -> StepContext {
    StepContext::new(0.15, 1.0, 0.5)
}

#[test]
fn test_cardiovascular_elastance_chambers() {
    let model = SysPulPeriphCirculation::from_list(&cardiovascular_list()).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &cardiovascular_state(),
        &DVector::zeros(34),
        REL_TOL,
        "0D chambers",
    );
}

#[test]
fn test_cardiovascular_prescribed_chambers() {
    let list = cardiovascular_list()
        .with_option("ATRIUM_MODEL", "prescribed")
        .with_option("VENTRICLE_MODEL", "prescribed");
    let model = SysPulPeriphCirculation::from_list(&list).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &cardiovascular_state(),
        &DVector::zeros(34),
        REL_TOL,
        "prescribed chambers",
    );
}

#[test]
fn test_cardiovascular_structure_ventricles() {
    let list = cardiovascular_list().with_option("VENTRICLE_MODEL", "3D");
    let model = SysPulPeriphCirculation::from_list(&list).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &cardiovascular_state(),
        &external_volumes(34),
        REL_TOL,
        "3D ventricles",
    );
}

#[test]
fn test_cardiovascular_with_inertances_and_impedances() {
    let list = cardiovascular_list()
        .with("Z_ar_sys", 0.05)
        .with("Z_ar_pul", 0.03)
        .with("L_ven_sys", 5e-3)
        .with("L_ven_pul", 2e-3);
    let model = SysPulPeriphCirculation::from_list(&list).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &StepContext::new(0.15, 1.0, 1.0),
        &cardiovascular_state(),
        &DVector::zeros(34),
        REL_TOL,
        "inertances and impedances",
    );
}

#[test]
fn test_respiratory_elastance_chambers() {
    let model = SysPulPeriphCirculation::from_list(&respiratory_list()).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &respiratory_state(),
        &DVector::zeros(82),
        REL_TOL,
        "respiration, 0D chambers",
    );
}

#[test]
fn test_respiratory_prescribed_atria() {
    let list = respiratory_list().with_option("ATRIUM_MODEL", "prescribed");
    let model = SysPulPeriphCirculation::from_list(&list).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &respiratory_state(),
        &DVector::zeros(82),
        REL_TOL,
        "respiration, prescribed atria",
    );
}

#[test]
fn test_respiratory_structure_ventricles() {
    let list = respiratory_list().with_option("VENTRICLE_MODEL", "3D");
    let model = SysPulPeriphCirculation::from_list(&list).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &respiratory_state(),
        &external_volumes(82),
        REL_TOL,
        "respiration, 3D ventricles",
    );
}

#[test]
fn test_respiratory_expiration() {
    let model = SysPulPeriphCirculation::from_list(&respiratory_list()).unwrap();
    let mut x = respiratory_state();
    x[cardio_rs::physics::StateVar::PAlv.index()] = 101.5;
    x[cardio_rs::physics::StateVar::QAlv.index()] = -5.0;
    assert_jacobian_matches(
        &model,
        &curves(),
        &context(),
        &x,
        &DVector::zeros(82),
        REL_TOL,
        "respiration, expiration",
    );
}

#[test]
fn test_respiratory_backward_euler() {
    let model = SysPulPeriphCirculation::from_list(&respiratory_list()).unwrap();
    assert_jacobian_matches(
        &model,
        &curves(),
        &StepContext::new(0.4, 1.0, 1.0),
        &respiratory_state(),
        &DVector::zeros(82),
        REL_TOL,
        "respiration, θ = 1",
    );
}
