//! Cardiovascular assembler (rows 0..34)
//!
//! Closed-loop circulation of four elastance chambers, systemic and
//! pulmonary arterial windkessels, five parallel systemic tissue beds, the
//! systemic venous pool and the pulmonary capillary and venous segments.
//!
//! Every row has the form $\frac{d}{dt}\,df(x) + f(x) = 0$:
//!
//! | row | df | f |
//! |---|---|---|
//! | 0 | $p_{at,L}/E_{at,L}$ or $V_{at,L}$ | $q_{vin,L} - q_{ven,pul}$ |
//! | 1 | 0 | $(p_{at,L} - p_{v,L})/R_{atv,L} - q_{vin,L}$ |
//! | 2 | $p_{v,L}/E_{v,L}$ or $V_{v,L}$ | $q_{vout,L} - q_{vin,L}$ |
//! | 3 | 0 | $(p_{v,L} - p_{ar,sys})/R_{arv,L} - q_{vout,L}$ |
//! | 4 | $C_{ar,sys}(p_{ar,sys} - Z_{ar,sys}\,q_{vout,L})$ | $q_{ar,sys} - q_{vout,L}$ |
//! | 5 | $(L_{ar,sys}/R_{ar,sys})\,q_{ar,sys}$ | $(p_{arperi} - p_{ar,sys} + Z_{ar,sys}\,q_{vout,L})/R_{ar,sys} + q_{ar,sys}$ |
//! | 6 | $\sum C_{ar,k}\,p_{arperi}$ | $\sum q_{ar,k} - q_{ar,sys}$ |
//! | 7..11 | 0 | $(p_{ven,k} - p_{arperi})/R_{ar,k} + q_{ar,k}$ |
//! | 12,14,..,20 | $C_{ven,k}\,p_{ven,k}$ | $q_{ven,k} - q_{ar,k}$ |
//! | 13,15,..,21 | 0 | $(p_{ven,sys} - p_{ven,k})/R_{ven,k} + q_{ven,k}$ |
//! | 22 | $C_{ven,sys}\,p_{ven,sys}$ | $q_{ven,sys} - \sum q_{ven,k}$ |
//! | 23 | $(L_{ven,sys}/R_{ven,sys})\,q_{ven,sys}$ | $(p_{at,R} - p_{ven,sys})/R_{ven,sys} + q_{ven,sys}$ |
//!
//! Rows 24..29 mirror rows 0..5 for the right heart and pulmonary
//! arteries; rows 30..33 close the loop through the pulmonary capillaries
//! (no inertance) and pulmonary veins.

use crate::models::chamber::{Chamber, ChamberState};
use crate::models::parameters::{CardiovascularParams, Windkessel};
use crate::models::valves::{Valve, ValveSelection};
use crate::physics::{Evaluation, GasSite, PeripheralBed, StateVar, StepContext};
use nalgebra::{DMatrix, DVector};

const P_ARPERI_SYS: usize = StateVar::PArperiSys.index();
const P_VEN_SYS: usize = StateVar::PVenSys.index();
const Q_VEN_SYS: usize = StateVar::QVenSys.index();
const P_AT_R: usize = StateVar::PAtR.index();
const P_CAP_PUL: usize = StateVar::PCapPul.index();
const Q_CAP_PUL: usize = StateVar::QCapPul.index();
const P_VEN_PUL: usize = StateVar::PVenPul.index();
const Q_VEN_PUL: usize = StateVar::QVenPul.index();
const P_AT_L: usize = StateVar::PAtL.index();
const Q_AR_PUL: usize = StateVar::QArPul.index();

// =================================================================================================
// Heart sides
// =================================================================================================

/// One heart side and its arterial root occupy six consecutive rows:
/// p_at, q_vin, q_vout, p_v, p_ar, q_ar.
#[derive(Debug, Clone, Copy)]
struct HeartSide {
    base: usize,
    atrium: usize,
    ventricle: usize,
    /// Venous return into the atrium.
    inflow: usize,
    /// Pressure downstream of the arterial root.
    downstream: usize,
    inflow_valve: Valve,
    outflow_valve: Valve,
}

impl HeartSide {
    const fn p_at(&self) -> usize {
        self.base
    }

    const fn q_vin(&self) -> usize {
        self.base + 1
    }

    const fn q_vout(&self) -> usize {
        self.base + 2
    }

    const fn p_v(&self) -> usize {
        self.base + 3
    }

    const fn p_ar(&self) -> usize {
        self.base + 4
    }

    const fn q_ar(&self) -> usize {
        self.base + 5
    }

    fn root<'p>(&self, params: &'p CardiovascularParams) -> &'p Windkessel {
        if self.base == 0 {
            &params.ar_sys
        } else {
            &params.ar_pul
        }
    }
}

const LEFT: HeartSide = HeartSide {
    base: 0,
    atrium: 0,
    ventricle: 1,
    inflow: Q_VEN_PUL,
    downstream: P_ARPERI_SYS,
    inflow_valve: Valve::Mitral,
    outflow_valve: Valve::Aortic,
};

const RIGHT: HeartSide = HeartSide {
    base: 24,
    atrium: 2,
    ventricle: 3,
    inflow: Q_VEN_SYS,
    downstream: P_CAP_PUL,
    inflow_valve: Valve::Tricuspid,
    outflow_valve: Valve::Pulmonary,
};

// =================================================================================================
// Compartment volumes
// =================================================================================================

/// Volume-vector slots written by [`CardiovascularAssembler::volumes`].
pub const COMPARTMENT_SLOTS: [usize; 15] = [0, 2, 4, 6, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32];

/// Volume of a compartment with its sensitivities dV/dx_j.
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentVolume {
    pub value: f64,
    pub sensitivities: Vec<(usize, f64)>,
}

// =================================================================================================
// Assembler
// =================================================================================================

/// Fills the 34 cardiovascular rows.
///
/// Chamber states are ordered as [`Chamber::ALL`].
#[derive(Debug, Clone, Copy)]
pub struct CardiovascularAssembler<'a> {
    params: &'a CardiovascularParams,
}

impl<'a> CardiovascularAssembler<'a> {
    pub fn new(params: &'a CardiovascularParams) -> Self {
        Self { params }
    }

    // ── df and f ─────────────────────────────────────────────────────────────

    /// Fill `df_np` and `f_np` rows 0..34.
    pub fn residual(
        &self,
        x: &DVector<f64>,
        external_volumes: &DVector<f64>,
        chambers: &[ChamberState; 4],
        valves: &ValveSelection,
        eval: &mut Evaluation,
    ) {
        let p = self.params;
        let (df, f) = (&mut eval.df_np, &mut eval.f_np);

        for side in [LEFT, RIGHT] {
            let atrium = &chambers[side.atrium];
            let ventricle = &chambers[side.ventricle];
            let root = side.root(p);
            let r_in = valves.resistance(side.inflow_valve);
            let r_out = valves.resistance(side.outflow_valve);

            let v_at = external_volumes[atrium.chamber.volume_index()];
            df[side.p_at()] = atrium.storage(x[side.p_at()], v_at);
            f[side.p_at()] = x[side.q_vin()] - x[side.inflow];

            f[side.q_vin()] = (x[side.p_at()] - x[side.p_v()]) / r_in - x[side.q_vin()];

            let v_v = external_volumes[ventricle.chamber.volume_index()];
            df[side.q_vout()] = ventricle.storage(x[side.p_v()], v_v);
            f[side.q_vout()] = x[side.q_vout()] - x[side.q_vin()];

            f[side.p_v()] = (x[side.p_v()] - x[side.p_ar()]) / r_out - x[side.q_vout()];

            df[side.p_ar()] = root.c * (x[side.p_ar()] - root.z * x[side.q_vout()]);
            f[side.p_ar()] = x[side.q_ar()] - x[side.q_vout()];

            df[side.q_ar()] = (root.l / root.r) * x[side.q_ar()];
            let dp = x[side.downstream] - x[side.p_ar()] + root.z * x[side.q_vout()];
            f[side.q_ar()] = dp / root.r + x[side.q_ar()];
        }

        // Systemic periphery
        let p_arperi = x[P_ARPERI_SYS];
        df[P_ARPERI_SYS] = p.peripheral_arterial_compliance() * p_arperi;
        f[P_ARPERI_SYS] = PeripheralBed::ALL
            .iter()
            .map(|bed| x[bed.arterial_flow_index()])
            .sum::<f64>()
            - x[StateVar::QArSys.index()];

        for bed in PeripheralBed::ALL {
            let bp = p.bed(bed);
            let (q_ar, p_ven, q_ven) = (
                bed.arterial_flow_index(),
                bed.venous_pressure_index(),
                bed.venous_flow_index(),
            );

            f[q_ar] = (x[p_ven] - p_arperi) / bp.arterial.r + x[q_ar];

            df[p_ven] = bp.venous.c * x[p_ven];
            f[p_ven] = x[q_ven] - x[q_ar];

            f[q_ven] = (x[P_VEN_SYS] - x[p_ven]) / bp.venous.r + x[q_ven];
        }

        let vs = &p.ven_sys;
        df[P_VEN_SYS] = vs.c * x[P_VEN_SYS];
        f[P_VEN_SYS] = x[Q_VEN_SYS]
            - PeripheralBed::ALL.iter().map(|bed| x[bed.venous_flow_index()]).sum::<f64>();

        df[Q_VEN_SYS] = (vs.l / vs.r) * x[Q_VEN_SYS];
        f[Q_VEN_SYS] = (x[P_AT_R] - x[P_VEN_SYS]) / vs.r + x[Q_VEN_SYS];

        // Pulmonary capillaries and veins
        let cap = &p.cap_pul;
        df[P_CAP_PUL] = cap.c * x[P_CAP_PUL];
        f[P_CAP_PUL] = x[Q_CAP_PUL] - x[Q_AR_PUL];

        f[Q_CAP_PUL] = (x[P_VEN_PUL] - x[P_CAP_PUL]) / cap.r + x[Q_CAP_PUL];

        let vp = &p.ven_pul;
        df[P_VEN_PUL] = vp.c * x[P_VEN_PUL];
        f[P_VEN_PUL] = x[Q_VEN_PUL] - x[Q_CAP_PUL];

        df[Q_VEN_PUL] = (vp.l / vp.r) * x[Q_VEN_PUL];
        f[Q_VEN_PUL] = (x[P_AT_L] - x[P_VEN_PUL]) / vp.r + x[Q_VEN_PUL];
    }

    // ── Volumes ──────────────────────────────────────────────────────────────

    /// Write compartment volumes into their slots of `volumes`.
    ///
    /// Chamber slots take p/E + V_u in 0D modes and the external volume in
    /// 3D mode. The arterial-peripheral slot holds the total over all beds.
    pub fn volumes(
        &self,
        x: &DVector<f64>,
        external_volumes: &DVector<f64>,
        chambers: &[ChamberState; 4],
        volumes: &mut DVector<f64>,
    ) {
        let p = self.params;

        for chamber in chambers {
            let slot = chamber.chamber.volume_index();
            let pressure = x[chamber.chamber.pressure().index()];
            volumes[slot] = chamber.volume(pressure, external_volumes[slot]);
        }

        for side in [LEFT, RIGHT] {
            let root = side.root(p);
            volumes[side.p_ar()] = root.c * (x[side.p_ar()] - root.z * x[side.q_vout()]) + root.v_u;
        }

        volumes[P_ARPERI_SYS] = p.peripheral_arterial_compliance() * x[P_ARPERI_SYS]
            + p.peripheral_arterial_unstressed_volume();

        for bed in PeripheralBed::ALL {
            let venous = &p.bed(bed).venous;
            let slot = bed.venous_pressure_index();
            volumes[slot] = venous.c * x[slot] + venous.v_u;
        }

        volumes[P_VEN_SYS] = p.ven_sys.c * x[P_VEN_SYS] + p.ven_sys.v_u;
        volumes[P_CAP_PUL] = p.cap_pul.c * x[P_CAP_PUL] + p.cap_pul.v_u;
        volumes[P_VEN_PUL] = p.ven_pul.c * x[P_VEN_PUL] + p.ven_pul.v_u;
    }

    /// Blood volume of a gas sampling site and its state sensitivities.
    ///
    /// Reads chamber and windkessel volumes from `volumes`, which must
    /// already hold the output of [`CardiovascularAssembler::volumes`].
    /// Arteriolar beds use their own share C_ar,k·p_arperi + V_ar,k,u.
    pub fn compartment_volume(
        &self,
        site: GasSite,
        x: &DVector<f64>,
        chambers: &[ChamberState; 4],
        volumes: &DVector<f64>,
    ) -> CompartmentVolume {
        let p = self.params;

        let chamber = |chamber: Chamber| {
            let state = &chambers[chamber_slot(chamber)];
            let slot = chamber.volume_index();
            let sensitivities = if state.is_external() {
                Vec::new()
            } else {
                vec![(chamber.pressure().index(), state.compliance())]
            };
            CompartmentVolume { value: volumes[slot], sensitivities }
        };

        let root = |side: HeartSide| {
            let wk = side.root(p);
            CompartmentVolume {
                value: volumes[side.p_ar()],
                sensitivities: vec![(side.p_ar(), wk.c), (side.q_vout(), -wk.c * wk.z)],
            }
        };

        let capacitor = |slot: usize, c: f64| CompartmentVolume {
            value: volumes[slot],
            sensitivities: vec![(slot, c)],
        };

        match site {
            GasSite::RightAtrium => chamber(Chamber::RightAtrium),
            GasSite::RightVentricle => chamber(Chamber::RightVentricle),
            GasSite::PulmonaryArteries => root(RIGHT),
            GasSite::PulmonaryCapillaries => capacitor(P_CAP_PUL, p.cap_pul.c),
            GasSite::PulmonaryVeins => capacitor(P_VEN_PUL, p.ven_pul.c),
            GasSite::LeftAtrium => chamber(Chamber::LeftAtrium),
            GasSite::LeftVentricle => chamber(Chamber::LeftVentricle),
            GasSite::SystemicArteries => root(LEFT),
            GasSite::Arteriolar(bed) => {
                let arterial = &p.bed(bed).arterial;
                CompartmentVolume {
                    value: arterial.c * x[P_ARPERI_SYS] + arterial.v_u,
                    sensitivities: vec![(P_ARPERI_SYS, arterial.c)],
                }
            }
            GasSite::Venous(bed) => capacitor(bed.venous_pressure_index(), p.bed(bed).venous.c),
            GasSite::SystemicVeins => capacitor(P_VEN_SYS, p.ven_sys.c),
        }
    }

    // ── Jacobian ─────────────────────────────────────────────────────────────

    /// Fill W rows 0..34; only columns 0..34 are touched.
    pub fn jacobian(
        &self,
        chambers: &[ChamberState; 4],
        valves: &ValveSelection,
        ctx: &StepContext,
        w: &mut DMatrix<f64>,
    ) {
        let p = self.params;
        let (dt, theta) = (ctx.dt, ctx.theta);

        for side in [LEFT, RIGHT] {
            let root = side.root(p);
            let r_in = valves.resistance(side.inflow_valve);
            let r_out = valves.resistance(side.outflow_valve);

            let row = side.p_at();
            w[(row, side.p_at())] = chambers[side.atrium].dv_dp;
            w[(row, side.q_vin())] = theta;
            w[(row, side.inflow)] = -theta;

            let row = side.q_vin();
            w[(row, side.p_at())] = theta / r_in;
            w[(row, side.p_v())] = -theta / r_in;
            w[(row, side.q_vin())] = -theta;

            let row = side.q_vout();
            w[(row, side.p_v())] = chambers[side.ventricle].dv_dp;
            w[(row, side.q_vout())] = theta;
            w[(row, side.q_vin())] = -theta;

            let row = side.p_v();
            w[(row, side.p_v())] = theta / r_out;
            w[(row, side.p_ar())] = -theta / r_out;
            w[(row, side.q_vout())] = -theta;

            let row = side.p_ar();
            w[(row, side.p_ar())] = root.c / dt;
            w[(row, side.q_vout())] = -root.c * root.z / dt - theta;
            w[(row, side.q_ar())] = theta;

            let row = side.q_ar();
            w[(row, side.q_ar())] = root.l / (root.r * dt) + theta;
            w[(row, side.downstream)] = theta / root.r;
            w[(row, side.p_ar())] = -theta / root.r;
            w[(row, side.q_vout())] = theta * root.z / root.r;
        }

        w[(P_ARPERI_SYS, P_ARPERI_SYS)] = p.peripheral_arterial_compliance() / dt;
        w[(P_ARPERI_SYS, StateVar::QArSys.index())] = -theta;

        for bed in PeripheralBed::ALL {
            let bp = p.bed(bed);
            let (q_ar, p_ven, q_ven) = (
                bed.arterial_flow_index(),
                bed.venous_pressure_index(),
                bed.venous_flow_index(),
            );

            w[(P_ARPERI_SYS, q_ar)] = theta;

            w[(q_ar, p_ven)] = theta / bp.arterial.r;
            w[(q_ar, P_ARPERI_SYS)] = -theta / bp.arterial.r;
            w[(q_ar, q_ar)] = theta;

            w[(p_ven, p_ven)] = bp.venous.c / dt;
            w[(p_ven, q_ven)] = theta;
            w[(p_ven, q_ar)] = -theta;

            w[(q_ven, P_VEN_SYS)] = theta / bp.venous.r;
            w[(q_ven, p_ven)] = -theta / bp.venous.r;
            w[(q_ven, q_ven)] = theta;

            w[(P_VEN_SYS, q_ven)] = -theta;
        }

        let vs = &p.ven_sys;
        w[(P_VEN_SYS, P_VEN_SYS)] = vs.c / dt;
        w[(P_VEN_SYS, Q_VEN_SYS)] = theta;

        w[(Q_VEN_SYS, Q_VEN_SYS)] = vs.l / (vs.r * dt) + theta;
        w[(Q_VEN_SYS, P_AT_R)] = theta / vs.r;
        w[(Q_VEN_SYS, P_VEN_SYS)] = -theta / vs.r;

        let cap = &p.cap_pul;
        w[(P_CAP_PUL, P_CAP_PUL)] = cap.c / dt;
        w[(P_CAP_PUL, Q_CAP_PUL)] = theta;
        w[(P_CAP_PUL, Q_AR_PUL)] = -theta;

        w[(Q_CAP_PUL, Q_CAP_PUL)] = theta;
        w[(Q_CAP_PUL, P_VEN_PUL)] = theta / cap.r;
        w[(Q_CAP_PUL, P_CAP_PUL)] = -theta / cap.r;

        let vp = &p.ven_pul;
        w[(P_VEN_PUL, P_VEN_PUL)] = vp.c / dt;
        w[(P_VEN_PUL, Q_VEN_PUL)] = theta;
        w[(P_VEN_PUL, Q_CAP_PUL)] = -theta;

        w[(Q_VEN_PUL, Q_VEN_PUL)] = vp.l / (vp.r * dt) + theta;
        w[(Q_VEN_PUL, P_AT_L)] = theta / vp.r;
        w[(Q_VEN_PUL, P_VEN_PUL)] = -theta / vp.r;
    }
}

/// Position of a chamber in [`Chamber::ALL`].
pub fn chamber_slot(chamber: Chamber) -> usize {
    match chamber {
        Chamber::LeftAtrium => LEFT.atrium,
        Chamber::LeftVentricle => LEFT.ventricle,
        Chamber::RightAtrium => RIGHT.atrium,
        Chamber::RightVentricle => RIGHT.ventricle,
    }
}
