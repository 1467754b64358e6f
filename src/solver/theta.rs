//! One-step-theta Newton integrator
//!
//! # Scheme
//!
//! For a model written as $\frac{d}{dt}\,df(x) + f(x) = 0$ each step solves
//!
//! $$ r(x_{n+1}) = \frac{df(x_{n+1}) - df(x_n)}{\Delta t} + \theta f(x_{n+1}) + (1-\theta) f(x_n) = 0 $$
//!
//! by Newton's method with the model's own Jacobian
//! $W = \partial(df/\Delta t + \theta f)/\partial x$ and a dense LU solve.
//! Old-level `df_n`, `f_n` are carried from the converged previous step.
//!
//! Valve states are re-selected on every evaluation, so a valve can switch
//! between Newton iterations. The integrator does not damp this; it logs
//! the switch at debug level and lets the iteration continue.
//!
//! With a period T configured, the state at every multiple of T is compared
//! with the one a cycle earlier (see [`solver::cycle_error`]). The last cycle
//! error and whether it fell to `eps_periodic` go into the result metadata.
//!
//! Models that need a structural partner ([`ResidualModel::requires_structure`])
//! are rejected: their chamber volumes are unknowns of the 3D problem.

use crate::error::{ModelError, ModelResult};
use crate::models::valves::{VALVE_STATES_KEY, Valve, switched_valves};
use crate::physics::{Evaluation, ResidualModel, StepContext};
use crate::solver::{self, Scenario, SimulationResult, Solver, SolverConfiguration};
use nalgebra::DVector;

/// Newton one-step-theta solver for stand-alone 0D runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThetaSolver;

impl ThetaSolver {
    pub fn new() -> Self {
        Self
    }

    /// Newton loop for one step; returns the converged state, its
    /// evaluation and the iteration count.
    fn step(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
        ctx: &StepContext,
        step: usize,
        x_n: &DVector<f64>,
        eval_n: &Evaluation,
    ) -> ModelResult<(DVector<f64>, Evaluation, usize)> {
        let model = scenario.model.as_ref();
        let mut x = x_n.clone();
        let mut valve_states = eval_n.get_metadata(VALVE_STATES_KEY);
        let mut residual_norm = f64::INFINITY;

        for iteration in 0..=config.max_iterations {
            let eval =
                model.evaluate(ctx, scenario.oracle.as_ref(), &x, &scenario.external_volumes)?;

            let now = eval.get_metadata(VALVE_STATES_KEY);
            let switched = valve_switches(valve_states, now);
            if iteration > 0 && !switched.is_empty() {
                log::debug!(
                    "step {}: valves {:?} switched in Newton iteration {}",
                    step, switched, iteration
                );
            }
            valve_states = now;

            let residual = eval.theta_residual(&eval_n.df_np, &eval_n.f_np, ctx);
            residual_norm = residual.norm();
            if residual_norm <= config.tolerance {
                return Ok((x, eval, iteration));
            }
            if iteration == config.max_iterations {
                break;
            }

            let increment = eval.stiffness.lu().solve(&(-residual)).ok_or_else(|| {
                ModelError::NonFinite {
                    kind: "singular Jacobian",
                    name: model.name().to_string(),
                    step,
                }
            })?;
            x += increment;
            solver::validate_state(&x, step)?;
        }

        log::warn!(
            "step {}: Newton did not converge in {} iterations (residual {:e})",
            step, config.max_iterations, residual_norm
        );
        Err(ModelError::NotConverged {
            step,
            iterations: config.max_iterations,
            residual: residual_norm,
        })
    }
}

/// Valves that changed between two valve-state masks stored in evaluation
/// metadata. Models without valves store no mask and never switch.
fn valve_switches(before: Option<f64>, after: Option<f64>) -> Vec<Valve> {
    match (before, after) {
        (Some(before), Some(after)) => switched_valves(before as u8, after as u8),
        _ => Vec::new(),
    }
}

impl Solver for ThetaSolver {
    fn solve(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> ModelResult<SimulationResult> {
        // ====== Step 1: Validation ======

        config.validate()?;
        scenario.validate()?;

        if scenario.model.requires_structure() {
            return Err(ModelError::Unsupported(format!(
                "{} has chambers coupled to a 3D structure; the stand-alone integrator cannot supply their volumes",
                scenario.get_model_name()
            )));
        }

        // ====== Step 2: Setup ======

        let dt = config.time_step;
        let theta = config.theta;
        let t0 = scenario.start_time;
        let model = scenario.model.as_ref();

        let mut x = scenario.initial_state.clone();
        solver::validate_state(&x, 0)?;
        let mut eval = model.evaluate(
            &StepContext::new(t0, dt, theta),
            scenario.oracle.as_ref(),
            &x,
            &scenario.external_volumes,
        )?;

        let mut time_points = Vec::with_capacity(config.steps + 1);
        let mut state_trajectory = Vec::with_capacity(config.steps + 1);
        let mut volume_trajectory = Vec::with_capacity(config.steps + 1);
        time_points.push(t0);
        state_trajectory.push(x.clone());
        volume_trajectory.push(eval.volumes.clone());

        let mut total_iterations = 0;

        // State at the last cycle end, the latest cycle error and the cycle count
        let mut cycle_start = x.clone();
        let mut cycle_error = 1.0;
        let mut cycles = 0usize;

        // ====== Step 3: Time Integration ======

        for step in 1..=config.steps {
            // From the index, not accumulated, to keep the last time exact
            let t = t0 + step as f64 * dt;
            let ctx = StepContext::new(t, dt, theta);

            let (x_np, eval_np, iterations) = self.step(scenario, config, &ctx, step, &x, &eval)?;
            total_iterations += iterations;
            x = x_np;
            eval = eval_np;

            time_points.push(t);
            state_trajectory.push(x.clone());
            volume_trajectory.push(eval.volumes.clone());

            if let Some(period) = config.period
                && solver::is_period_boundary(t, period)
            {
                cycle_error = solver::cycle_error(&cycle_start, &x);
                cycle_start.copy_from(&x);
                cycles += 1;
                log::info!("t = {}: cycle error {:e}", t, cycle_error);
                if cycle_error <= config.eps_periodic {
                    log::info!("periodic state reached after {} cycles", cycles);
                }
            }
        }

        // ====== Step 4: Build Result ======

        let mut result =
            SimulationResult::new(time_points, state_trajectory, x).with_volumes(volume_trajectory);
        result.add_metadata("solver", self.name());
        result.add_metadata("model", model.name());
        result.add_metadata("theta", &theta.to_string());
        result.add_metadata("dt", &dt.to_string());
        result.add_metadata("time steps", &config.steps.to_string());
        result.add_metadata("total time", &config.total_time().to_string());
        result.add_metadata("newton iterations", &total_iterations.to_string());
        if let Some(period) = config.period {
            result.add_metadata("period", &period.to_string());
            result.add_metadata("cycles", &cycles.to_string());
            result.add_metadata("cycle error", &cycle_error.to_string());
            result.add_metadata("periodic", &(cycle_error <= config.eps_periodic).to_string());
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "One-step theta (Newton)"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
