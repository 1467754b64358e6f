//! Residual models and state layout
//!
//! This module provides the abstractions every 0D model in the crate is
//! written against.
//!
//! # Core Concepts
//!
//! - **State layout** ([`state`]): tagged names for every unknown and the
//!   fixed index they occupy in the flat state vector
//! - **Residual model** ([`ResidualModel`]): evaluates the storage part
//!   `df`, the flux part `f` and the Jacobian `W` at one time level
//! - **Time function oracle** ([`TimeFunctionOracle`]): the only channel
//!   through which time-dependent inputs (activation, pleural pressure,
//!   prescribed elastance) enter a model
//!
//! # Architecture
//!
//! Models are **separate from time integration**:
//! - The model provides `df_np`, `f_np` and `W` at the new level
//! - The caller keeps `df_n`, `f_n` and forms the theta residual
//!
//! This separation lets the same evaluator run inside a monolithic 3D-0D
//! Newton loop or inside the crate's stand-alone integrator.
//!
//! # Example
//!
//! ```rust
//! use cardio_rs::physics::{StateVar, GasSite};
//!
//! assert_eq!(StateVar::PVL.index(), 3);
//! assert_eq!(StateVar::PpO2(GasSite::SystemicArteries).name(), "ppO2_ar_sys");
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod state;
pub mod traits;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use state::{
    CARDIOVASCULAR_DOFS, GasSite, PeripheralBed, RESPIRATORY_DOFS, StateVar, TOTAL_DOFS,
};
pub use traits::{CurveId, Evaluation, ResidualModel, StepContext, TimeFunctionOracle};
