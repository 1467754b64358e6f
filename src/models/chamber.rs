//! Chamber elastance model
//!
//! Each of the four heart chambers is driven in one of three modes
//! ([`ChamberModel`]):
//!
//! | mode | elastance | volume | ∂(df/Δt)/∂p |
//! |------|-----------|--------|-------------|
//! | `Elastance0D` | $E = (E_{max} - E_{min})\,y(t) + E_{min}$ | $p/E + V_u$ | $1/(E\,\Delta t)$ |
//! | `Prescribed` | $E = E_{curve}(t)$ | $p/E + V_u$ | $1/(E\,\Delta t)$ |
//! | `Structure3D` | $0$ | external | $0$ |

use crate::error::{ModelError, ModelResult};
use crate::models::parameters::{CardiovascularParams, ChamberModel, ChamberParams, ModelOptions};
use crate::physics::{StateVar, StepContext, TimeFunctionOracle};

/// The four heart chambers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chamber {
    LeftAtrium,
    LeftVentricle,
    RightAtrium,
    RightVentricle,
}

impl Chamber {
    pub const ALL: [Chamber; 4] = [
        Chamber::LeftAtrium,
        Chamber::LeftVentricle,
        Chamber::RightAtrium,
        Chamber::RightVentricle,
    ];

    /// Condition tag used by the structural side.
    pub const fn name(self) -> &'static str {
        match self {
            Chamber::LeftAtrium => "atrium_left",
            Chamber::LeftVentricle => "ventricle_left",
            Chamber::RightAtrium => "atrium_right",
            Chamber::RightVentricle => "ventricle_right",
        }
    }

    /// Mass-balance row, which is also the chamber's slot in the volume vector.
    pub const fn volume_index(self) -> usize {
        match self {
            Chamber::LeftAtrium => 0,
            Chamber::LeftVentricle => 2,
            Chamber::RightAtrium => 24,
            Chamber::RightVentricle => 26,
        }
    }

    /// Chamber pressure unknown.
    pub const fn pressure(self) -> StateVar {
        match self {
            Chamber::LeftAtrium => StateVar::PAtL,
            Chamber::LeftVentricle => StateVar::PVL,
            Chamber::RightAtrium => StateVar::PAtR,
            Chamber::RightVentricle => StateVar::PVR,
        }
    }

    pub const fn is_atrium(self) -> bool {
        matches!(self, Chamber::LeftAtrium | Chamber::RightAtrium)
    }

    pub fn params(self, params: &CardiovascularParams) -> &ChamberParams {
        match self {
            Chamber::LeftAtrium => &params.atrium_left,
            Chamber::LeftVentricle => &params.ventricle_left,
            Chamber::RightAtrium => &params.atrium_right,
            Chamber::RightVentricle => &params.ventricle_right,
        }
    }

    pub fn model(self, options: &ModelOptions) -> ChamberModel {
        if self.is_atrium() {
            options.atrium_model
        } else {
            options.ventricle_model
        }
    }
}

/// Resolved elastance of one chamber at one time level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChamberState {
    pub chamber: Chamber,
    pub model: ChamberModel,

    /// Elastance E; zero in `Structure3D` mode.
    pub elastance: f64,

    /// Jacobian entry of the mass-balance row w.r.t. chamber pressure,
    /// 1/(E·Δt); zero in `Structure3D` mode.
    pub dv_dp: f64,

    pub v_u: f64,
}

impl ChamberState {
    pub fn is_external(&self) -> bool {
        self.model == ChamberModel::Structure3D
    }

    /// Storage term of the mass-balance row: p/E, or the external volume.
    pub fn storage(&self, pressure: f64, external_volume: f64) -> f64 {
        if self.is_external() {
            external_volume
        } else {
            pressure / self.elastance
        }
    }

    /// Chamber volume: p/E + V_u, or the external volume.
    pub fn volume(&self, pressure: f64, external_volume: f64) -> f64 {
        if self.is_external() {
            external_volume
        } else {
            pressure / self.elastance + self.v_u
        }
    }

    /// dV/dp (not divided by Δt).
    pub fn compliance(&self) -> f64 {
        if self.is_external() {
            0.0
        } else {
            1.0 / self.elastance
        }
    }
}

/// Resolve the elastance of `chamber` at the context's time level.
///
/// # Errors
///
/// Unknown curve ids, and an elastance that is not strictly positive in
/// `Elastance0D` or `Prescribed` mode.
pub fn resolve_chamber(
    chamber: Chamber,
    params: &CardiovascularParams,
    options: &ModelOptions,
    oracle: &dyn TimeFunctionOracle,
    ctx: &StepContext,
) -> ModelResult<ChamberState> {
    let chamber_params = chamber.params(params);
    let model = chamber.model(options);

    let elastance = match model {
        ChamberModel::Elastance0D => {
            let y = ctx.curve_value(oracle, chamber_params.activation_curve)?;
            (chamber_params.e_max - chamber_params.e_min) * y + chamber_params.e_min
        }
        ChamberModel::Prescribed => ctx.curve_value(oracle, chamber_params.prescribed_curve)?,
        ChamberModel::Structure3D => {
            return Ok(ChamberState {
                chamber,
                model,
                elastance: 0.0,
                dv_dp: 0.0,
                v_u: chamber_params.v_u,
            });
        }
    };

    if !(elastance > 0.0) {
        return Err(ModelError::NonPositiveElastance {
            chamber: chamber.name(),
            value: elastance,
        });
    }

    Ok(ChamberState {
        chamber,
        model,
        elastance,
        dv_dp: 1.0 / (elastance * ctx.dt),
        v_u: chamber_params.v_u,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time_curve::{CurveRegistry, TimeCurve};
    use approx::assert_relative_eq;

    fn params() -> CardiovascularParams {
        let mut params = CardiovascularParams::default();
        params.atrium_left = ChamberParams {
            e_max: 2.0,
            e_min: 1.0,
            activation_curve: Some(1),
            prescribed_curve: Some(2),
            v_u: 0.5,
        };
        params
    }

    fn registry(y: f64, e: f64) -> CurveRegistry {
        CurveRegistry::new()
            .with(1, TimeCurve::constant(y))
            .with(2, TimeCurve::constant(e))
    }

    fn left_atrium(
        options: &ModelOptions,
        oracle: &CurveRegistry,
        ctx: &StepContext,
    ) -> ModelResult<ChamberState> {
        resolve_chamber(Chamber::LeftAtrium, &params(), options, oracle, ctx)
    }

    #[test]
    fn test_elastance_blends_bounds() {
        let options = ModelOptions::default();
        let ctx = StepContext::new(0.1, 0.01, 0.5);

        let relaxed = left_atrium(&options, &registry(0.0, 0.0), &ctx).unwrap();
        assert_relative_eq!(relaxed.elastance, 1.0);
        assert_relative_eq!(relaxed.dv_dp, 100.0);
        assert_relative_eq!(relaxed.volume(5.0, 0.0), 5.5);

        let contracted = left_atrium(&options, &registry(1.0, 0.0), &ctx).unwrap();
        assert_relative_eq!(contracted.elastance, 2.0);
        assert_relative_eq!(contracted.storage(5.0, 0.0), 2.5);
    }

    #[test]
    fn test_negative_time_uses_minimum_elastance() {
        let ctx = StepContext::new(-1.0, 0.01, 0.5);
        let state = left_atrium(&ModelOptions::default(), &registry(1.0, 0.0), &ctx).unwrap();
        assert_relative_eq!(state.elastance, 1.0);
    }

    #[test]
    fn test_prescribed_elastance() {
        let options = ModelOptions {
            atrium_model: ChamberModel::Prescribed,
            ..Default::default()
        };
        let ctx = StepContext::new(0.0, 0.5, 1.0);
        let state = left_atrium(&options, &registry(0.0, 4.0), &ctx).unwrap();
        assert_relative_eq!(state.elastance, 4.0);
        assert_relative_eq!(state.dv_dp, 0.5);

        let err = left_atrium(&options, &registry(0.0, 0.0), &ctx).unwrap_err();
        assert!(matches!(err, ModelError::NonPositiveElastance { chamber: "atrium_left", .. }));
    }

    #[test]
    fn test_structure_mode_reads_external_volume() {
        let options = ModelOptions {
            atrium_model: ChamberModel::Structure3D,
            ..Default::default()
        };
        let ctx = StepContext::new(0.0, 0.01, 0.5);
        let state = left_atrium(&options, &registry(0.0, 0.0), &ctx).unwrap();
        assert_eq!(state.elastance, 0.0);
        assert_eq!(state.dv_dp, 0.0);
        assert_eq!(state.storage(5.0, 42.0), 42.0);
        assert_eq!(state.volume(5.0, 42.0), 42.0);
    }

    #[test]
    fn test_modes_agree_on_consistent_volume() {
        // p = E·(v − V_u) makes the 0D storage equal the 3D volume minus V_u
        let ctx = StepContext::new(0.0, 0.01, 0.5);
        let zero_d = resolve_chamber(
            Chamber::LeftAtrium, &params(), &ModelOptions::default(), &registry(0.3, 0.0), &ctx,
        ).unwrap();
        let v = 7.25;
        let p = zero_d.elastance * (v - zero_d.v_u);
        assert_relative_eq!(zero_d.volume(p, 0.0), v, epsilon = 1e-14);
    }

    #[test]
    fn test_chamber_indices() {
        assert_eq!(Chamber::LeftVentricle.volume_index(), 2);
        assert_eq!(Chamber::LeftVentricle.pressure().index(), 3);
        assert_eq!(Chamber::RightAtrium.volume_index(), 24);
        assert_eq!(Chamber::RightVentricle.pressure().index(), 27);
    }
}
