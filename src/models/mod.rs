//! Cardiorespiratory 0D models
//!
//! The closed-loop model is built from small pieces, leaves first:
//!
//! - [`parameters`]: typed parameter records and the named-scalar
//!   [`ParameterList`] they are read from
//! - [`time_curve`]: activation, prescribed elastance and pleural pressure
//!   profiles behind a [`CurveRegistry`]
//! - [`chamber`] and [`valves`]: per-evaluation elastances and valve
//!   resistances
//! - [`dissociation`]: blood and tissue gas content with derivatives
//! - [`cardiovascular`] and [`respiratory`]: the row assemblers
//! - [`coupling`]: blocks exchanged with a 3D structural model
//! - [`circulation`]: [`SysPulPeriphCirculation`], which runs one
//!   evaluation in the required order
//!
//! # Example
//!
//! ```rust,ignore
//! use cardio_rs::models::{CurveRegistry, ParameterList, SysPulPeriphCirculation, TimeCurve};
//! use cardio_rs::physics::StepContext;
//!
//! let model = SysPulPeriphCirculation::from_list(&list)?;
//! let curves = CurveRegistry::new().with(1, TimeCurve::activation(0.0, 0.3, 0.8)?);
//! let x = model.initial_state(&list, &curves)?;
//! let out = model.evaluate_detailed(&StepContext::new(0.0, 1e-3, 0.5), &curves, &x, &v_ext)?;
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod cardiovascular;
pub mod chamber;
pub mod circulation;
pub mod coupling;
pub mod dissociation;
pub mod parameters;
pub mod respiratory;
pub mod time_curve;
pub mod valves;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use cardiovascular::{COMPARTMENT_SLOTS, CardiovascularAssembler, CompartmentVolume};
pub use chamber::{Chamber, ChamberState, resolve_chamber};
pub use circulation::{CirculationEvaluation, SysPulPeriphCirculation};
pub use coupling::{
    ConditionKind, CouplingBlocks, CouplingCondition, CouplingProvider, ElementCoupling,
};
pub use dissociation::{BloodContent, DissociationKernel, gas_solve};
pub use parameters::{
    CardiovascularParams, ChamberModel, ChamberParams, ModelOptions, ParameterList,
    PeripheralParams, RespiratoryModel, RespiratoryParams, TissueParams, ValveParams, Windkessel,
};
pub use time_curve::{CurveRegistry, TimeCurve};
pub use valves::{Valve, ValveSelection, ValveState, select_valves};
