//! Valve selection
//!
//! Each heart valve is a diode-like resistor switching between an open
//! resistance `R_min` and a closed resistance `R_max`. The switch is chosen
//! once per evaluation from the current pressures and held fixed while the
//! Jacobian is formed, so no ∂R/∂p term appears.
//!
//! At exact pressure equality the atrioventricular valves (mitral,
//! tricuspid) are closed, the semilunar valves (aortic, pulmonary) open.

use crate::models::parameters::{CardiovascularParams, ValveParams};
use crate::physics::StateVar;

/// Evaluation metadata key holding [`ValveSelection::open_mask`].
pub const VALVE_STATES_KEY: &str = "valve_states";

/// The four heart valves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Valve {
    Mitral,
    Aortic,
    Tricuspid,
    Pulmonary,
}

impl Valve {
    pub const ALL: [Valve; 4] = [Valve::Mitral, Valve::Aortic, Valve::Tricuspid, Valve::Pulmonary];

    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Upstream and downstream pressure of the valve.
    pub const fn pressures(self) -> (StateVar, StateVar) {
        match self {
            Valve::Mitral => (StateVar::PAtL, StateVar::PVL),
            Valve::Aortic => (StateVar::PVL, StateVar::PArSys),
            Valve::Tricuspid => (StateVar::PAtR, StateVar::PVR),
            Valve::Pulmonary => (StateVar::PVR, StateVar::PArPul),
        }
    }

    fn params(self, params: &CardiovascularParams) -> &ValveParams {
        match self {
            Valve::Mitral => &params.mitral,
            Valve::Aortic => &params.aortic,
            Valve::Tricuspid => &params.tricuspid,
            Valve::Pulmonary => &params.pulmonary,
        }
    }

    /// Forward-biased valves open; atrioventricular valves close on ties.
    fn is_open(self, upstream: f64, downstream: f64) -> bool {
        match self {
            Valve::Mitral | Valve::Tricuspid => downstream < upstream,
            Valve::Aortic | Valve::Pulmonary => upstream >= downstream,
        }
    }
}

/// Open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Open,
    Closed,
}

/// Selected state and resistance of every valve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveSelection {
    states: [ValveState; 4],
    resistances: [f64; 4],
}

impl ValveSelection {
    pub fn state(&self, valve: Valve) -> ValveState {
        self.states[valve.ordinal()]
    }

    pub fn resistance(&self, valve: Valve) -> f64 {
        self.resistances[valve.ordinal()]
    }

    /// Open valves as a bitmask, bit `ordinal` set when open.
    pub fn open_mask(&self) -> u8 {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == ValveState::Open)
            .fold(0, |mask, (k, _)| mask | (1 << k))
    }

    /// Number of valves whose state differs from `other`.
    pub fn switches_from(&self, other: &ValveSelection) -> usize {
        switched_valves(other.open_mask(), self.open_mask()).len()
    }
}

/// Valves whose state differs between two [`ValveSelection::open_mask`]s.
pub fn switched_valves(before: u8, after: u8) -> Vec<Valve> {
    let changed = before ^ after;
    Valve::ALL
        .into_iter()
        .filter(|valve| changed & (1 << valve.ordinal()) != 0)
        .collect()
}

/// Choose every valve's resistance from the pressures in `x`.
pub fn select_valves(params: &CardiovascularParams, x: &[f64]) -> ValveSelection {
    let mut states = [ValveState::Closed; 4];
    let mut resistances = [0.0; 4];

    for valve in Valve::ALL {
        let (upstream, downstream) = valve.pressures();
        let valve_params = valve.params(params);
        let (state, resistance) = if valve.is_open(x[upstream.index()], x[downstream.index()]) {
            (ValveState::Open, valve_params.r_min)
        } else {
            (ValveState::Closed, valve_params.r_max)
        };
        states[valve.ordinal()] = state;
        resistances[valve.ordinal()] = resistance;
    }

    log::debug!(
        "valve selection: mitral {:?}, aortic {:?}, tricuspid {:?}, pulmonary {:?}",
        states[0], states[1], states[2], states[3]
    );

    ValveSelection { states, resistances }
}
