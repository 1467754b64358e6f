//! Respiratory assembler (rows 34..82)
//!
//! Three coupled subsystems sit on top of the circulation:
//!
//! 1. **Alveolar mechanics** (rows 34..37): volume, flux and pressure of a
//!    single alveolar compartment ventilated through the airway resistance
//!    $R_{alv}$ and driven by the pleural pressure $U_t(t)$.
//! 2. **Alveolar gas fractions** (rows 37, 38): CO2 and O2 balance of the
//!    alveolar gas, inspiring a dead-space/ambient mixture and exchanging
//!    with capillary blood across the membrane.
//! 3. **Blood gas transport** (rows 44..82): (ppCO2, ppO2) at nineteen
//!    sites along the loop, convected with the blood flow, consumed and
//!    produced in the five tissue beds and exchanged in the pulmonary
//!    capillaries.
//!
//! Rows 39..43 carry the inlet flow of each tissue bed's arterial
//! compartment, which the transport rows need as the bed's through-flow.
//!
//! # Membrane flux
//!
//! $$ j_g = \kappa_g \left(pp_{cap,g} - f_{alv,g}\,(p_{alv} - p_{vap})\right) $$
//!
//! positive from blood into the alveoli.
//!
//! # Transport rows
//!
//! With $C = C_b(pp)$ the blood content, the content balance of a site is
//!
//! $$ V\,\frac{dC}{dt} = \underbrace{\sum_k q_k\,(C_b(pp_{up,k}) - C) + S}_{X} $$
//!
//! which, through $dC/dt = J\,dpp/dt$, gives $df = pp$ and
//! $f = -J^{-1} X / V$. In tissue beds $J$ also carries the tissue storage
//! $(V_{tiss}/V)\,\partial C_t/\partial pp$. Because $J$, $X$ and $V$ all
//! depend on the state, the Jacobian rows use
//!
//! $$ \frac{\partial f}{\partial y} = \frac{1}{V} J^{-1}\left(\frac{\partial J}{\partial y} J^{-1} X
//!    - \frac{\partial X}{\partial y}\right) + \frac{J^{-1} X}{V^2}\frac{\partial V}{\partial y} $$
//!
//! The systemic veins collect all five venous beds. Their convective term
//! $\sum_k q_{ven,k}(C_k - C)$ equals $Q\,(C_{mix} - C)$ with $C_{mix}$ the
//! flow-weighted mixture of the bed contents, so no separate mixing step
//! is needed.

use crate::error::{ModelError, ModelResult};
use crate::models::cardiovascular::CompartmentVolume;
use crate::models::dissociation::{CO2, O2, gas_solve, invert_2x2};
use crate::models::parameters::{CardiovascularParams, RespiratoryParams};
use crate::physics::{
    Evaluation, GasSite, PeripheralBed, StateVar, StepContext, TimeFunctionOracle,
};
use nalgebra::{DVector, Matrix2, Vector2};
use std::collections::BTreeMap;

const V_ALV: usize = StateVar::VAlv.index();
const Q_ALV: usize = StateVar::QAlv.index();
const P_ALV: usize = StateVar::PAlv.index();
const F_CO2_ALV: usize = StateVar::FCo2Alv.index();
const P_ARPERI_SYS: usize = StateVar::PArperiSys.index();

/// Volume-vector slots holding O2 saturation samples.
pub const SATURATION_SLOTS: [GasSite; 2] = [GasSite::PulmonaryArteries, GasSite::SystemicArteries];

// =================================================================================================
// Transport topology
// =================================================================================================

/// Extra content source of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSource {
    None,
    /// Metabolism and tissue storage of a systemic bed.
    Tissue(PeripheralBed),
    /// Exchange with alveolar gas.
    Membrane,
}

impl GasSource {
    pub fn of(site: GasSite) -> Self {
        match site {
            GasSite::Arteriolar(bed) => GasSource::Tissue(bed),
            GasSite::PulmonaryCapillaries => GasSource::Membrane,
            _ => GasSource::None,
        }
    }
}

/// Flows entering a site, each with the site it comes from.
pub fn upstream_of(site: GasSite) -> Vec<(StateVar, GasSite)> {
    match site {
        GasSite::RightAtrium => vec![(StateVar::QVenSys, GasSite::SystemicVeins)],
        GasSite::RightVentricle => vec![(StateVar::QVinR, GasSite::RightAtrium)],
        GasSite::PulmonaryArteries => vec![(StateVar::QVoutR, GasSite::RightVentricle)],
        GasSite::PulmonaryCapillaries => vec![(StateVar::QArPul, GasSite::PulmonaryArteries)],
        GasSite::PulmonaryVeins => vec![(StateVar::QCapPul, GasSite::PulmonaryCapillaries)],
        GasSite::LeftAtrium => vec![(StateVar::QVenPul, GasSite::PulmonaryVeins)],
        GasSite::LeftVentricle => vec![(StateVar::QVinL, GasSite::LeftAtrium)],
        GasSite::SystemicArteries => vec![(StateVar::QVoutL, GasSite::LeftVentricle)],
        GasSite::Arteriolar(bed) => vec![(StateVar::QArIn(bed), GasSite::SystemicArteries)],
        GasSite::Venous(bed) => vec![(StateVar::QAr(bed), GasSite::Arteriolar(bed))],
        GasSite::SystemicVeins => PeripheralBed::ALL
            .iter()
            .map(|bed| (StateVar::QVen(*bed), GasSite::Venous(*bed)))
            .collect(),
    }
}

fn pp_at(x: &DVector<f64>, site: GasSite) -> Vector2<f64> {
    Vector2::new(x[site.co2_index()], x[site.o2_index()])
}

// =================================================================================================
// Partial-derivative accumulator
// =================================================================================================

/// Sensitivities of (J, X, V) of one transport row pair w.r.t. one column.
#[derive(Debug, Clone, Copy)]
struct GasPartial {
    d_jacobian: Matrix2<f64>,
    d_rate: Vector2<f64>,
    d_volume: f64,
}

#[derive(Debug, Default)]
struct GasPartials(BTreeMap<usize, GasPartial>);

impl GasPartials {
    fn at(&mut self, col: usize) -> &mut GasPartial {
        self.0.entry(col).or_insert(GasPartial {
            d_jacobian: Matrix2::zeros(),
            d_rate: Vector2::zeros(),
            d_volume: 0.0,
        })
    }
}

// =================================================================================================
// Assembler
// =================================================================================================

/// Fills rows 34..82.
#[derive(Debug, Clone, Copy)]
pub struct RespiratoryAssembler<'a> {
    params: &'a RespiratoryParams,
    cardio: &'a CardiovascularParams,
}

impl<'a> RespiratoryAssembler<'a> {
    pub fn new(params: &'a RespiratoryParams, cardio: &'a CardiovascularParams) -> Self {
        Self { params, cardio }
    }

    /// Membrane flux (j_CO2, j_O2) for the given alveolar and capillary state.
    pub fn membrane_flux(&self, x: &DVector<f64>) -> Vector2<f64> {
        let rp = self.params;
        let fractions = Vector2::new(x[F_CO2_ALV], x[F_CO2_ALV + 1]);
        let driving = x[P_ALV] - rp.p_vap_water_37;
        let kappa = Vector2::new(rp.kappa_co2, rp.kappa_o2);
        kappa.component_mul(&(pp_at(x, GasSite::PulmonaryCapillaries) - fractions * driving))
    }

    /// Mouth flow (U_m − p_alv)/R_alv, positive on inspiration.
    pub fn mouth_flow(&self, x: &DVector<f64>) -> f64 {
        (self.params.u_m - x[P_ALV]) / self.params.r_alv
    }

    /// Fill `df_np`, `f_np` and W for rows 34..82 and the saturation slots
    /// of the volume vector.
    ///
    /// `sites` holds the blood volume of every gas site in
    /// [`GasSite::ordinal`] order.
    pub fn assemble(
        &self,
        x: &DVector<f64>,
        sites: &[CompartmentVolume],
        oracle: &dyn TimeFunctionOracle,
        ctx: &StepContext,
        eval: &mut Evaluation,
    ) -> ModelResult<()> {
        ModelError::check_len("gas site volumes", GasSite::COUNT, sites.len())?;

        self.alveolar_mechanics(x, oracle, ctx, eval)?;
        self.alveolar_fractions(x, ctx, eval);
        self.peripheral_inlets(x, ctx, eval);
        for site in GasSite::all() {
            self.transport(site, x, &sites[site.ordinal()], ctx, eval)?;
        }

        let kernel = &self.params.kernel;
        for site in SATURATION_SLOTS {
            eval.volumes[site.o2_index()] = kernel.saturation_o2(x[site.o2_index()]);
        }
        Ok(())
    }

    // ── Rows 34..37 ──────────────────────────────────────────────────────────

    fn alveolar_mechanics(
        &self,
        x: &DVector<f64>,
        oracle: &dyn TimeFunctionOracle,
        ctx: &StepContext,
        eval: &mut Evaluation,
    ) -> ModelResult<()> {
        let rp = self.params;
        let (dt, theta) = (ctx.dt, ctx.theta);
        let u_t = ctx.curve_value(oracle, rp.u_t_curve)?;
        let flux = self.membrane_flux(x);
        let driving = x[P_ALV] - rp.p_vap_water_37;
        let kappa = Vector2::new(rp.kappa_co2, rp.kappa_o2);
        let w = &mut eval.stiffness;

        // Volume
        eval.df_np[V_ALV] = x[V_ALV];
        eval.f_np[V_ALV] = -x[Q_ALV];
        w[(V_ALV, V_ALV)] = 1.0 / dt;
        w[(V_ALV, Q_ALV)] = -theta;

        // Momentum
        eval.df_np[Q_ALV] = (rp.l_alv / rp.r_alv) * x[Q_ALV];
        eval.f_np[Q_ALV] = x[Q_ALV]
            + (rp.e_alv * (x[V_ALV] - rp.v_lung_u) + u_t - x[P_ALV]) / rp.r_alv;
        w[(Q_ALV, Q_ALV)] = rp.l_alv / (rp.r_alv * dt) + theta;
        w[(Q_ALV, V_ALV)] = theta * rp.e_alv / rp.r_alv;
        w[(Q_ALV, P_ALV)] = -theta / rp.r_alv;

        // Pressure: alveolar flux = mouth flow + membrane gas volume flux
        eval.df_np[P_ALV] = 0.0;
        eval.f_np[P_ALV] = x[Q_ALV] - self.mouth_flow(x) - rp.v_m_gas * flux.sum();
        w[(P_ALV, Q_ALV)] = theta;
        w[(P_ALV, P_ALV)] = theta
            * (1.0 / rp.r_alv
                + rp.v_m_gas * (kappa[CO2] * x[F_CO2_ALV] + kappa[O2] * x[F_CO2_ALV + 1]));
        for g in [CO2, O2] {
            w[(P_ALV, F_CO2_ALV + g)] = theta * rp.v_m_gas * kappa[g] * driving;
            let col = GasSite::PulmonaryCapillaries.co2_index() + g;
            w[(P_ALV, col)] = -theta * rp.v_m_gas * kappa[g];
        }
        Ok(())
    }

    // ── Rows 37, 38 ──────────────────────────────────────────────────────────

    fn alveolar_fractions(&self, x: &DVector<f64>, ctx: &StepContext, eval: &mut Evaluation) {
        let rp = self.params;
        let (dt, theta) = (ctx.dt, ctx.theta);
        let flux = self.membrane_flux(x);
        let driving = x[P_ALV] - rp.p_vap_water_37;
        let kappa = Vector2::new(rp.kappa_co2, rp.kappa_o2);
        let external = Vector2::new(rp.f_co2_ext, rp.f_o2_ext);
        let q_mouth = self.mouth_flow(x);
        let dead_space = rp.dead_space_fraction();
        let v_alv = x[V_ALV];

        for g in [CO2, O2] {
            let row = F_CO2_ALV + g;
            let fraction = x[row];
            let inspired = rp.inspired_fraction(fraction, external[g]);

            // Inspiration draws the dead-space/ambient mixture, expiration
            // expels alveolar gas.
            let (f, d_p_alv, d_fraction) = if q_mouth > 0.0 {
                (
                    -q_mouth * inspired,
                    inspired / rp.r_alv,
                    -q_mouth * dead_space,
                )
            } else {
                (
                    -q_mouth * fraction,
                    fraction / rp.r_alv,
                    -q_mouth,
                )
            };

            eval.df_np[row] = v_alv * fraction;
            eval.f_np[row] = f - rp.v_m_gas * flux[g];

            let w = &mut eval.stiffness;
            w[(row, V_ALV)] = fraction / dt;
            w[(row, row)] = v_alv / dt + theta * (d_fraction + rp.v_m_gas * kappa[g] * driving);
            w[(row, P_ALV)] = theta * (d_p_alv + rp.v_m_gas * kappa[g] * fraction);
            let col = GasSite::PulmonaryCapillaries.co2_index() + g;
            w[(row, col)] = -theta * rp.v_m_gas * kappa[g];
        }
    }

    // ── Rows 39..43 ──────────────────────────────────────────────────────────

    fn peripheral_inlets(&self, x: &DVector<f64>, ctx: &StepContext, eval: &mut Evaluation) {
        for bed in PeripheralBed::ALL {
            let row = bed.inlet_flow_index();
            let c = self.cardio.bed(bed).arterial.c;

            eval.df_np[row] = c * x[P_ARPERI_SYS];
            eval.f_np[row] = x[bed.arterial_flow_index()] - x[row];

            let w = &mut eval.stiffness;
            w[(row, P_ARPERI_SYS)] = c / ctx.dt;
            w[(row, bed.arterial_flow_index())] = ctx.theta;
            w[(row, row)] = -ctx.theta;
        }
    }

    // ── Rows 44..82 ──────────────────────────────────────────────────────────

    fn transport(
        &self,
        site: GasSite,
        x: &DVector<f64>,
        volume: &CompartmentVolume,
        ctx: &StepContext,
        eval: &mut Evaluation,
    ) -> ModelResult<()> {
        let rp = self.params;
        let kernel = &rp.kernel;
        let row = site.co2_index();

        let v = volume.value;
        if !(v > 0.0) {
            return Err(ModelError::NonPositiveVolume {
                compartment: site.tag(),
                value: v,
            });
        }

        let pp = pp_at(x, site);
        let own = kernel.blood_content(&pp);
        let mut jacobian = own.jacobian;
        let mut rate = Vector2::zeros();
        let mut partials = GasPartials::default();

        partials.at(row).d_jacobian += own.hessian[CO2];
        partials.at(row + 1).d_jacobian += own.hessian[O2];

        // Convection
        for (flow, upstream) in upstream_of(site) {
            let q = x[flow.index()];
            let up = kernel.blood_content(&pp_at(x, upstream));
            let delta = up.value - own.value;

            rate += delta * q;
            partials.at(flow.index()).d_rate += delta;
            partials.at(upstream.co2_index()).d_rate += up.jacobian.column(CO2) * q;
            partials.at(upstream.o2_index()).d_rate += up.jacobian.column(O2) * q;
            partials.at(row).d_rate -= own.jacobian.column(CO2) * q;
            partials.at(row + 1).d_rate -= own.jacobian.column(O2) * q;
        }

        // Sources
        match GasSource::of(site) {
            GasSource::Tissue(bed) => {
                let tissue = rp.tissue(bed);
                let storage = kernel.tissue_jacobian();
                jacobian += storage * (tissue.v_tiss / v);
                for &(col, dv) in &volume.sensitivities {
                    partials.at(col).d_jacobian += storage * (-tissue.v_tiss * dv / (v * v));
                }

                let c_t_o2 = kernel.tissue_o2(pp[O2]);
                let beta = rp.beta_o2;
                rate += Vector2::new(tissue.m_co2, -tissue.m_o2 * c_t_o2 / (beta + c_t_o2));
                partials.at(row + 1).d_rate[O2] -=
                    tissue.m_o2 * beta * kernel.alpha_o2 / (beta + c_t_o2).powi(2);
            }
            GasSource::Membrane => {
                let flux = self.membrane_flux(x);
                let driving = x[P_ALV] - rp.p_vap_water_37;
                let kappa = Vector2::new(rp.kappa_co2, rp.kappa_o2);
                let fractions = Vector2::new(x[F_CO2_ALV], x[F_CO2_ALV + 1]);

                rate -= flux;
                partials.at(row).d_rate[CO2] -= kappa[CO2];
                partials.at(row + 1).d_rate[O2] -= kappa[O2];
                partials.at(P_ALV).d_rate += kappa.component_mul(&fractions);
                partials.at(F_CO2_ALV).d_rate[CO2] += kappa[CO2] * driving;
                partials.at(F_CO2_ALV + 1).d_rate[O2] += kappa[O2] * driving;
            }
            GasSource::None => {}
        }

        for &(col, dv) in &volume.sensitivities {
            partials.at(col).d_volume += dv;
        }

        let solved = gas_solve(&jacobian, &rate);
        let inverse = invert_2x2(&jacobian);
        let f = -solved / v;

        eval.df_np[row] = pp[CO2];
        eval.df_np[row + 1] = pp[O2];
        eval.f_np[row] = f[CO2];
        eval.f_np[row + 1] = f[O2];

        let w = &mut eval.stiffness;
        w[(row, row)] += 1.0 / ctx.dt;
        w[(row + 1, row + 1)] += 1.0 / ctx.dt;
        for (col, partial) in partials.0 {
            let d_f = inverse * (partial.d_jacobian * solved - partial.d_rate) / v
                + solved * (partial.d_volume / (v * v));
            w[(row, col)] += ctx.theta * d_f[CO2];
            w[(row + 1, col)] += ctx.theta * d_f[O2];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_site_has_inflow() {
        for site in GasSite::all() {
            assert!(!upstream_of(site).is_empty(), "{:?} has no inflow", site);
        }
        assert_eq!(upstream_of(GasSite::SystemicVeins).len(), 5);
    }

    #[test]
    fn test_upstream_chain_closes_the_loop() {
        // Following the first inflow from the systemic arteries returns there
        let mut site = GasSite::SystemicArteries;
        let mut visited = 0;
        loop {
            site = upstream_of(site)[0].1;
            visited += 1;
            if site == GasSite::SystemicArteries {
                break;
            }
            assert!(visited < GasSite::COUNT, "upstream chain does not close");
        }
        assert_eq!(visited, 11);
    }

    #[test]
    fn test_sources() {
        assert_eq!(GasSource::of(GasSite::PulmonaryCapillaries), GasSource::Membrane);
        assert_eq!(
            GasSource::of(GasSite::Arteriolar(PeripheralBed::Cerebral)),
            GasSource::Tissue(PeripheralBed::Cerebral)
        );
        assert_eq!(GasSource::of(GasSite::Venous(PeripheralBed::Cerebral)), GasSource::None);
        assert_eq!(GasSource::of(GasSite::SystemicVeins), GasSource::None);
    }
}
