//! Closed-loop systemic/pulmonary/peripheral circulation
//!
//! [`SysPulPeriphCirculation`] ties the pieces of one evaluation together
//! in a fixed order:
//!
//! 1. valve resistances from the current pressures;
//! 2. chamber elastances from the time curves;
//! 3. cardiovascular `df_np`, `f_np`;
//! 4. compartment volumes;
//! 5. respiratory rows, which read the volumes of step 4;
//! 6. the local Jacobian W.
//!
//! The evaluator holds no mutable state: the result depends only on the
//! parameters, the step context, the curve values, `x` and `v_ext`.

use crate::error::{ModelError, ModelResult};
use crate::models::cardiovascular::CardiovascularAssembler;
use crate::models::chamber::{Chamber, ChamberState, resolve_chamber};
use crate::models::coupling::{CouplingBlocks, CouplingProvider, GasCoupling, evaluate_coupling};
use crate::models::parameters::{
    CardiovascularParams, ChamberModel, ModelOptions, ParameterList, RespiratoryParams,
};
use crate::models::respiratory::RespiratoryAssembler;
use crate::models::valves::{VALVE_STATES_KEY, ValveSelection, select_valves};
use crate::physics::{
    CARDIOVASCULAR_DOFS, Evaluation, GasSite, ResidualModel, StateVar, StepContext,
    TOTAL_DOFS, TimeFunctionOracle,
};
use nalgebra::DVector;

/// Evaluation plus the intermediate choices made on the way.
#[derive(Debug, Clone)]
pub struct CirculationEvaluation {
    pub evaluation: Evaluation,
    pub valves: ValveSelection,
    pub chambers: [ChamberState; 4],
}

/// The 34-row circulation, optionally extended by the 48 respiratory rows.
///
/// # Example
///
/// ```rust,ignore
/// let model = SysPulPeriphCirculation::from_list(&list)?;
/// let ctx = StepContext::new(t, dt, theta);
/// let out = model.evaluate_detailed(&ctx, &curves, &x, &v_ext)?;
/// let r = out.evaluation.theta_residual(&df_n, &f_n, &ctx);
/// ```
#[derive(Debug, Clone)]
pub struct SysPulPeriphCirculation {
    cardio: CardiovascularParams,
    respiratory: Option<RespiratoryParams>,
    options: ModelOptions,
}

impl SysPulPeriphCirculation {
    /// Build and validate the model.
    ///
    /// Respiratory parameters must be given exactly when the options
    /// select a respiratory model.
    pub fn new(
        cardio: CardiovascularParams,
        respiratory: Option<RespiratoryParams>,
        options: ModelOptions,
    ) -> ModelResult<Self> {
        cardio.validate(&options)?;

        match (&respiratory, options.respiratory_model.is_active()) {
            (Some(params), true) => params.validate()?,
            (None, false) => {}
            (Some(_), false) => {
                return Err(ModelError::invalid_parameter(
                    "RESPIRATORY_MODEL",
                    "respiratory parameters given but respiration is off",
                ));
            }
            (None, true) => {
                return Err(ModelError::invalid_parameter(
                    "RESPIRATORY_MODEL",
                    "respiration is on but no respiratory parameters were given",
                ));
            }
        }

        let model = Self { cardio, respiratory, options };
        log::info!(
            "0D circulation: {} dofs, atria {}, ventricles {}, respiration {}",
            model.dimension(),
            options.atrium_model.keyword(),
            options.ventricle_model.keyword(),
            if model.respiratory.is_some() { "on" } else { "off" },
        );
        Ok(model)
    }

    /// Build from a flat parameter list.
    pub fn from_list(list: &ParameterList) -> ModelResult<Self> {
        let options = ModelOptions::from_list(list)?;
        let cardio = CardiovascularParams::from_list(list)?;
        let respiratory = if options.respiratory_model.is_active() {
            Some(RespiratoryParams::from_list(list)?)
        } else {
            None
        };
        Self::new(cardio, respiratory, options)
    }

    pub fn dimension(&self) -> usize {
        if self.respiratory.is_some() { TOTAL_DOFS } else { CARDIOVASCULAR_DOFS }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn cardiovascular_params(&self) -> &CardiovascularParams {
        &self.cardio
    }

    pub fn respiratory_params(&self) -> Option<&RespiratoryParams> {
        self.respiratory.as_ref()
    }

    /// Whether any chamber takes its volume from a structural model.
    pub fn has_structure_chambers(&self) -> bool {
        self.options.atrium_model == ChamberModel::Structure3D
            || self.options.ventricle_model == ChamberModel::Structure3D
    }

    /// Names of all state variables, in index order.
    pub fn state_names(&self) -> Vec<String> {
        StateVar::all(self.dimension()).map(StateVar::name).collect()
    }

    // =============================================================================================
    // Evaluation
    // =============================================================================================

    /// Evaluate `df_np`, `f_np`, W and the volume vector at `x`.
    ///
    /// `v_ext` supplies chamber volumes for `Structure3D` chambers and fixes
    /// the length of the returned volume vector; it must hold at least
    /// [`dimension`](Self::dimension) entries.
    pub fn evaluate_detailed(
        &self,
        ctx: &StepContext,
        oracle: &dyn TimeFunctionOracle,
        x: &DVector<f64>,
        v_ext: &DVector<f64>,
    ) -> ModelResult<CirculationEvaluation> {
        let n = self.dimension();
        ctx.validate()?;
        if x.len() != n {
            return Err(ModelError::DimensionMismatch {
                what: "state vector",
                expected: n,
                actual: x.len(),
            });
        }
        ModelError::check_len("volume vector", n, v_ext.len())?;

        // 1. Valves
        let valves = select_valves(&self.cardio, x.as_slice());

        // 2. Chambers
        let resolve = |chamber| resolve_chamber(chamber, &self.cardio, &self.options, oracle, ctx);
        let chambers = [
            resolve(Chamber::LeftAtrium)?,
            resolve(Chamber::LeftVentricle)?,
            resolve(Chamber::RightAtrium)?,
            resolve(Chamber::RightVentricle)?,
        ];

        // 3. Cardiovascular residual
        let cardio = CardiovascularAssembler::new(&self.cardio);
        let mut evaluation = Evaluation::zeros(n, DVector::zeros(v_ext.len()));
        cardio.residual(x, v_ext, &chambers, &valves, &mut evaluation);

        // 4. Volumes
        cardio.volumes(x, v_ext, &chambers, &mut evaluation.volumes);

        // 5. Respiration
        if let Some(params) = &self.respiratory {
            evaluation.volumes[StateVar::VAlv.index()] = x[StateVar::VAlv.index()];
            let sites: Vec<_> = GasSite::all()
                .map(|site| cardio.compartment_volume(site, x, &chambers, &evaluation.volumes))
                .collect();
            RespiratoryAssembler::new(params, &self.cardio)
                .assemble(x, &sites, oracle, ctx, &mut evaluation)?;
        }

        // 6. Cardiovascular Jacobian
        cardio.jacobian(&chambers, &valves, ctx, &mut evaluation.stiffness);

        evaluation.set_metadata("time", ctx.time);
        evaluation.set_metadata(VALVE_STATES_KEY, f64::from(valves.open_mask()));

        Ok(CirculationEvaluation { evaluation, valves, chambers })
    }

    /// Coupling blocks for the structural conditions of `provider`.
    ///
    /// `evaluation` must come from the same step; with respiration on its
    /// `f_np` and volumes feed the gas-row sensitivities.
    pub fn evaluate_coupling(
        &self,
        provider: &dyn CouplingProvider,
        ctx: &StepContext,
        evaluation: &Evaluation,
    ) -> ModelResult<CouplingBlocks> {
        ModelError::check_len("evaluation", self.dimension(), evaluation.dimension())?;
        let gas = self.respiratory.as_ref().map(|_| GasCoupling {
            f_np: &evaluation.f_np,
            volumes: &evaluation.volumes,
        });
        evaluate_coupling(provider, self.dimension(), ctx, gas)
    }

    // =============================================================================================
    // Initial state
    // =============================================================================================

    /// Read the initial state from `<name>_0` keys; absent keys are zero.
    ///
    /// A negative or absent `V_alv_0` defaults to the relaxed lung volume
    /// (U_m − U_t(0))/E_alv + V_lung,u and an absent `p_alv_0` to U_m.
    pub fn initial_state(
        &self,
        list: &ParameterList,
        oracle: &dyn TimeFunctionOracle,
    ) -> ModelResult<DVector<f64>> {
        let mut x = DVector::zeros(self.dimension());
        for state in StateVar::all(self.dimension()) {
            x[state.index()] = list.get_or(&format!("{}_0", state.name()), 0.0);
        }

        if let Some(params) = &self.respiratory {
            let v_alv = list.get_or("V_alv_0", -1.0);
            x[StateVar::VAlv.index()] = if v_alv < 0.0 {
                let u_t = StepContext::new(0.0, 1.0, 1.0).curve_value(oracle, params.u_t_curve)?;
                (params.u_m - u_t) / params.e_alv + params.v_lung_u
            } else {
                v_alv
            };
            x[StateVar::PAlv.index()] = list.get_or("p_alv_0", params.u_m);
        }
        Ok(x)
    }
}

impl ResidualModel for SysPulPeriphCirculation {
    fn dimension(&self) -> usize {
        SysPulPeriphCirculation::dimension(self)
    }

    fn evaluate(
        &self,
        ctx: &StepContext,
        oracle: &dyn TimeFunctionOracle,
        x: &DVector<f64>,
        volumes: &DVector<f64>,
    ) -> ModelResult<Evaluation> {
        Ok(self.evaluate_detailed(ctx, oracle, x, volumes)?.evaluation)
    }

    fn requires_structure(&self) -> bool {
        self.has_structure_chambers()
    }

    fn name(&self) -> &str {
        "sys_pul_periph"
    }

    fn description(&self) -> Option<&str> {
        Some(if self.respiratory.is_some() {
            "closed-loop circulation with respiration and gas transport"
        } else {
            "closed-loop circulation"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameters::{
        ChamberParams, PeripheralParams, RespiratoryModel, ValveParams, Windkessel,
    };
    use crate::models::time_curve::{CurveRegistry, TimeCurve};
    use crate::models::valves::{Valve, switched_valves};
    use approx::assert_relative_eq;

    fn unit_params() -> CardiovascularParams {
        let chamber = ChamberParams {
            e_max: 1.0,
            e_min: 1.0,
            activation_curve: None,
            prescribed_curve: None,
            v_u: 0.0,
        };
        let valve = ValveParams::new(1.0, 1.0);
        let wk = Windkessel::new(1.0, 1.0);
        CardiovascularParams {
            atrium_left: chamber,
            ventricle_left: chamber,
            atrium_right: chamber,
            ventricle_right: chamber,
            mitral: valve,
            aortic: valve,
            tricuspid: valve,
            pulmonary: valve,
            ar_sys: wk,
            ven_sys: wk,
            ar_pul: wk,
            cap_pul: wk,
            ven_pul: wk,
            beds: [PeripheralParams::new(wk, wk); 5],
        }
    }

    fn unit_model() -> SysPulPeriphCirculation {
        SysPulPeriphCirculation::new(unit_params(), None, ModelOptions::default()).unwrap()
    }

    #[test]
    fn test_dimension_and_names() {
        let model = unit_model();
        assert_eq!(model.dimension(), 34);
        assert_eq!(model.state_names().len(), 34);
        assert_eq!(model.state_names()[3], "p_v_l");
        assert!(!model.requires_structure());
    }

    #[test]
    fn test_respiration_requires_parameters() {
        let options = ModelOptions {
            respiratory_model: RespiratoryModel::Standard,
            ..Default::default()
        };
        assert!(SysPulPeriphCirculation::new(unit_params(), None, options).is_err());
    }

    #[test]
    fn test_zero_flow_equilibrium() {
        let model = unit_model();
        let mut x = DVector::zeros(34);
        for state in StateVar::all(34) {
            if state.name().starts_with('p') {
                x[state.index()] = 1.0;
            }
        }
        let ctx = StepContext::new(0.0, 1.0, 1.0);
        let out = model
            .evaluate_detailed(&ctx, &CurveRegistry::new(), &x, &DVector::zeros(34))
            .unwrap();

        assert_relative_eq!(out.evaluation.f_np.amax(), 0.0);
        let v = &out.evaluation.volumes;
        for slot in [0, 2, 4, 22, 24, 26, 28, 30, 32] {
            assert_relative_eq!(out.evaluation.df_np[slot], v[slot]);
        }
    }

    #[test]
    fn test_valve_states_in_metadata() {
        let model = unit_model();
        let ctx = StepContext::new(0.0, 1.0, 1.0);
        let mut x = DVector::zeros(34);
        x[StateVar::PAtL.index()] = 5.0;
        x[StateVar::PArSys.index()] = 80.0;

        let mut masks = Vec::new();
        for p_v_l in [4.0, 90.0] {
            x[StateVar::PVL.index()] = p_v_l;
            let out = model
                .evaluate_detailed(&ctx, &CurveRegistry::new(), &x, &DVector::zeros(34))
                .unwrap();
            let mask = out.evaluation.get_metadata(VALVE_STATES_KEY).unwrap();
            assert_eq!(mask, f64::from(out.valves.open_mask()));
            masks.push(mask as u8);
        }

        // Filling to ejection swaps mitral and aortic at once
        assert_eq!(masks[0].count_ones(), masks[1].count_ones());
        assert_eq!(switched_valves(masks[0], masks[1]), vec![Valve::Mitral, Valve::Aortic]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = unit_model();
        let ctx = StepContext::new(0.0, 1.0, 1.0);
        let (x, v) = (DVector::zeros(82), DVector::zeros(82));
        let err = model.evaluate_detailed(&ctx, &CurveRegistry::new(), &x, &v).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { expected: 34, actual: 82, .. }));

        let (x, v) = (DVector::zeros(34), DVector::zeros(10));
        let err = model.evaluate_detailed(&ctx, &CurveRegistry::new(), &x, &v).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { what: "volume vector", .. }));
    }

    #[test]
    fn test_initial_state_reads_named_keys() {
        let model = unit_model();
        let list = ParameterList::new().with("p_v_l_0", 8.0).with("q_ven_sys_0", 2.5);
        let curves = CurveRegistry::new().with(1, TimeCurve::constant(0.0));
        let x = model.initial_state(&list, &curves).unwrap();
        assert_eq!(x[3], 8.0);
        assert_eq!(x[23], 2.5);
        assert_eq!(x[0], 0.0);
    }
}
