//! Common utilities for integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod test_helpers;

// Re-export commonly used items
pub use fixtures::{
    CurveSet, cardiovascular_list, cardiovascular_state, curves, external_volumes, linear_valves,
    respiratory_list, respiratory_state,
};
pub use test_helpers::{assert_jacobian_matches, compartment_volume_sum, evaluate};
