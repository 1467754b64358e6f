//! cardio-rs: 0D closed-loop cardiorespiratory model
//!
//! A lumped-parameter model of the systemic and pulmonary circulation,
//! optionally extended by lung mechanics and O2/CO2 transport, written so
//! that it can be coupled monolithically to a 3D structural model of the
//! heart's cavities.
//!
//! # Architecture
//!
//! cardio-rs is built on two core principles:
//!
//! 1. **Separation of Physics and Numerics**
//!    - Residual models evaluate `df`, `f` and the analytic Jacobian W at
//!      one time level (what to solve)
//!    - The caller, or the bundled [`solver::ThetaSolver`], forms the
//!      one-step-theta residual and iterates (how to solve)
//!
//! 2. **Fixed, named state layout**
//!    - 34 cardiovascular unknowns, plus 48 respiratory and gas unknowns
//!      when respiration is enabled
//!    - Every unknown has a [`physics::StateVar`] with a stable index and
//!      a printed name
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cardio_rs::prelude::*;
//!
//! // 1. Model and time curves
//! let model = SysPulPeriphCirculation::from_list(&list)?;
//! let curves = CurveRegistry::new()
//!     .with(1, TimeCurve::activation(0.0, 0.3, 0.8)?)
//!     .with(2, TimeCurve::activation(0.1, 0.4, 0.8)?);
//! let x0 = model.initial_state(&list, &curves)?;
//!
//! // 2. Scenario and configuration
//! let scenario = Scenario::new(Box::new(model), Box::new(curves), x0);
//! let config = SolverConfiguration::new(1e-3, 800).theta(0.5);
//!
//! // 3. Run and export
//! let result = ThetaSolver.solve(&scenario, &config)?;
//! CsvExporter::default().export(&result, Some(1000), "beat.csv")?;
//! ```
//!
//! # Modules
//!
//! - [`error`]: [`ModelError`](error::ModelError) and the crate result type
//! - [`physics`]: state layout and the residual model interface
//! - [`models`]: parameters, chambers, valves, gas kernel, assemblers and
//!   the 3D coupling interface
//! - [`solver`]: stand-alone integrator, global assembly, Jacobian checks
//! - [`output`]: trajectory export

pub mod error;
pub mod physics;

pub mod models;
pub mod output;
pub mod solver;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use cardio_rs::prelude::*;
    //! ```
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::models::{
        Chamber, ChamberModel, CurveRegistry, ModelOptions, ParameterList, RespiratoryModel,
        SysPulPeriphCirculation, TimeCurve,
    };
    pub use crate::output::{CsvConfig, CsvExporter, Exporter};
    pub use crate::physics::{Evaluation, GasSite, ResidualModel, StateVar, StepContext};
    pub use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration, ThetaSolver};
}
