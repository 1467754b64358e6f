//! Parameter store
//!
//! Constant coefficients of the circulation and respiration models, built
//! once at initialisation and read-only afterwards.
//!
//! Parameters can be constructed field by field or looked up from a
//! [`ParameterList`], the flat named-scalar container an input layer fills.
//! Keys follow the established naming (`R_arvalve_max_l`, `C_ar_sys`,
//! `V_v_l_u`, `kappa_CO2`, …). Every constructor validates what it builds,
//! so a model never sees a zero resistance or a negative compliance.

use crate::error::{ModelError, ModelResult};
use crate::models::dissociation::{DEFAULT_HILL_EXPONENT, DEFAULT_P50, DissociationKernel};
use crate::physics::{CurveId, PeripheralBed};
use std::collections::HashMap;

/// Michaelis constant of tissue O2 consumption used when none is given.
pub const DEFAULT_BETA_O2: f64 = 0.01;

// =================================================================================================
// Parameter list
// =================================================================================================

/// Named scalars and string options.
#[derive(Debug, Clone, Default)]
pub struct ParameterList {
    scalars: HashMap<String, f64>,
    options: HashMap<String, String>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add a scalar.
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.set(key, value);
        self
    }

    /// Builder pattern: add a string option.
    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.set_option(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.scalars.insert(key.to_string(), value);
    }

    pub fn set_option(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    /// Scalar that must be present.
    pub fn require(&self, key: &str) -> ModelResult<f64> {
        self.get(key)
            .ok_or_else(|| ModelError::invalid_parameter(key, "missing"))
    }

    /// Curve id stored as a scalar; absent or negative means no curve.
    pub fn curve(&self, key: &str) -> Option<CurveId> {
        match self.get(key) {
            Some(id) if id >= 0.0 => Some(id.round() as CurveId),
            _ => None,
        }
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scalars.len() + self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =================================================================================================
// Validation helpers
// =================================================================================================

fn positive(name: &str, value: f64) -> ModelResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::invalid_parameter(name, format!("must be positive, got {}", value)))
    }
}

fn non_negative(name: &str, value: f64) -> ModelResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::invalid_parameter(name, format!("must be non-negative, got {}", value)))
    }
}

fn finite(name: &str, value: f64) -> ModelResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::invalid_parameter(name, format!("must be finite, got {}", value)))
    }
}

// =================================================================================================
// Model options
// =================================================================================================

/// How a heart chamber's elastance is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChamberModel {
    /// Time-varying elastance between E_min and E_max driven by an activation curve.
    #[default]
    Elastance0D,

    /// Elastance read directly from a curve.
    Prescribed,

    /// Volume supplied by a 3D structural model.
    Structure3D,
}

impl ChamberModel {
    /// Parse the input keyword (`0D`, `prescribed`, `3D`).
    pub fn from_option(option: &'static str, value: &str) -> ModelResult<Self> {
        match value {
            "0D" => Ok(ChamberModel::Elastance0D),
            "prescribed" => Ok(ChamberModel::Prescribed),
            "3D" => Ok(ChamberModel::Structure3D),
            other => Err(ModelError::UndefinedModel {
                option,
                value: other.to_string(),
            }),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ChamberModel::Elastance0D => "0D",
            ChamberModel::Prescribed => "prescribed",
            ChamberModel::Structure3D => "3D",
        }
    }
}

/// Whether the respiratory and gas-transport rows are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RespiratoryModel {
    #[default]
    None,
    Standard,
}

impl RespiratoryModel {
    /// Parse the input keyword (`None`, `Standard`).
    pub fn from_option(value: &str) -> ModelResult<Self> {
        match value {
            "None" => Ok(RespiratoryModel::None),
            "Standard" => Ok(RespiratoryModel::Standard),
            other => Err(ModelError::UndefinedModel {
                option: "RESPIRATORY_MODEL",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RespiratoryModel::Standard)
    }
}

/// Discrete model choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelOptions {
    pub atrium_model: ChamberModel,
    pub ventricle_model: ChamberModel,
    pub respiratory_model: RespiratoryModel,
}

impl ModelOptions {
    /// Read `ATRIUM_MODEL`, `VENTRICLE_MODEL` and `RESPIRATORY_MODEL`;
    /// absent keys keep their defaults (`0D`, `0D`, `None`).
    pub fn from_list(list: &ParameterList) -> ModelResult<Self> {
        let mut options = Self::default();
        if let Some(value) = list.option("ATRIUM_MODEL") {
            options.atrium_model = ChamberModel::from_option("ATRIUM_MODEL", value)?;
        }
        if let Some(value) = list.option("VENTRICLE_MODEL") {
            options.ventricle_model = ChamberModel::from_option("VENTRICLE_MODEL", value)?;
        }
        if let Some(value) = list.option("RESPIRATORY_MODEL") {
            options.respiratory_model = RespiratoryModel::from_option(value)?;
        }
        Ok(options)
    }
}

// =================================================================================================
// Cardiovascular parameters
// =================================================================================================

/// Elastance bounds, curves and unstressed volume of one heart chamber.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChamberParams {
    pub e_max: f64,
    pub e_min: f64,
    pub activation_curve: Option<CurveId>,
    pub prescribed_curve: Option<CurveId>,
    pub v_u: f64,
}

impl ChamberParams {
    /// `kind` is `at` or `v`, `side` is `l` or `r`.
    fn from_list(list: &ParameterList, kind: &str, side: &str) -> ModelResult<Self> {
        let curve_prefix = if kind == "at" { "Atrium" } else { "Ventricle" };
        Ok(Self {
            e_max: list.get_or(&format!("E_{}_max_{}", kind, side), 0.0),
            e_min: list.get_or(&format!("E_{}_min_{}", kind, side), 0.0),
            activation_curve: list.curve(&format!("{}_act_curve_{}", curve_prefix, side)),
            prescribed_curve: list.curve(&format!("{}_prescr_E_curve_{}", curve_prefix, side)),
            v_u: list.get_or(&format!("V_{}_{}_u", kind, side), 0.0),
        })
    }

    fn validate(&self, name: &str, model: ChamberModel) -> ModelResult<()> {
        finite(&format!("V_u of {}", name), self.v_u)?;
        match model {
            ChamberModel::Elastance0D => {
                positive(&format!("E_min of {}", name), self.e_min)?;
                positive(&format!("E_max of {}", name), self.e_max)
            }
            ChamberModel::Prescribed => {
                if self.prescribed_curve.is_none() {
                    return Err(ModelError::invalid_parameter(
                        format!("prescribed elastance curve of {}", name),
                        "missing",
                    ));
                }
                Ok(())
            }
            ChamberModel::Structure3D => Ok(()),
        }
    }
}

/// Open and closed resistance of one valve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValveParams {
    pub r_min: f64,
    pub r_max: f64,
}

impl ValveParams {
    pub fn new(r_min: f64, r_max: f64) -> Self {
        Self { r_min, r_max }
    }

    fn from_list(list: &ParameterList, kind: &str, side: &str) -> ModelResult<Self> {
        Ok(Self {
            r_min: list.require(&format!("R_{}valve_min_{}", kind, side))?,
            r_max: list.require(&format!("R_{}valve_max_{}", kind, side))?,
        })
    }

    fn validate(&self, name: &str) -> ModelResult<()> {
        positive(&format!("R_min of {}", name), self.r_min)?;
        positive(&format!("R_max of {}", name), self.r_max)
    }
}

/// Windkessel segment: compliance, resistance, inertance, characteristic
/// impedance and unstressed volume. Unused coefficients stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Windkessel {
    pub c: f64,
    pub r: f64,
    pub l: f64,
    pub z: f64,
    pub v_u: f64,
}

impl Windkessel {
    pub fn new(c: f64, r: f64) -> Self {
        Self { c, r, ..Default::default() }
    }

    /// Builder pattern: set inertance.
    pub fn inertance(mut self, l: f64) -> Self {
        self.l = l;
        self
    }

    /// Builder pattern: set characteristic impedance.
    pub fn impedance(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    /// Builder pattern: set unstressed volume.
    pub fn unstressed(mut self, v_u: f64) -> Self {
        self.v_u = v_u;
        self
    }

    /// Keys `C_<tag>`, `R_<tag>`, `L_<tag>`, `Z_<tag>`, `V_<tag>_u`.
    fn from_list(list: &ParameterList, tag: &str) -> ModelResult<Self> {
        Ok(Self {
            c: list.require(&format!("C_{}", tag))?,
            r: list.require(&format!("R_{}", tag))?,
            l: list.get_or(&format!("L_{}", tag), 0.0),
            z: list.get_or(&format!("Z_{}", tag), 0.0),
            v_u: list.get_or(&format!("V_{}_u", tag), 0.0),
        })
    }

    fn validate(&self, tag: &str) -> ModelResult<()> {
        positive(&format!("C_{}", tag), self.c)?;
        positive(&format!("R_{}", tag), self.r)?;
        non_negative(&format!("L_{}", tag), self.l)?;
        non_negative(&format!("Z_{}", tag), self.z)?;
        finite(&format!("V_{}_u", tag), self.v_u)
    }
}

/// Arterial and venous segment of one systemic tissue bed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeripheralParams {
    pub arterial: Windkessel,
    pub venous: Windkessel,
}

impl PeripheralParams {
    pub fn new(arterial: Windkessel, venous: Windkessel) -> Self {
        Self { arterial, venous }
    }
}

/// Coefficients of the closed-loop systemic and pulmonary circulation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardiovascularParams {
    pub atrium_left: ChamberParams,
    pub ventricle_left: ChamberParams,
    pub atrium_right: ChamberParams,
    pub ventricle_right: ChamberParams,

    pub mitral: ValveParams,
    pub aortic: ValveParams,
    pub tricuspid: ValveParams,
    pub pulmonary: ValveParams,

    pub ar_sys: Windkessel,
    pub ven_sys: Windkessel,
    pub ar_pul: Windkessel,
    pub cap_pul: Windkessel,
    pub ven_pul: Windkessel,

    pub beds: [PeripheralParams; 5],
}

impl CardiovascularParams {
    pub fn bed(&self, bed: PeripheralBed) -> &PeripheralParams {
        &self.beds[bed.ordinal()]
    }

    /// Σ C_ar over the five beds.
    pub fn peripheral_arterial_compliance(&self) -> f64 {
        self.beds.iter().map(|b| b.arterial.c).sum()
    }

    /// Σ V_ar,u over the five beds.
    pub fn peripheral_arterial_unstressed_volume(&self) -> f64 {
        self.beds.iter().map(|b| b.arterial.v_u).sum()
    }

    /// Look up every coefficient by name.
    ///
    /// Arterial-peripheral unstressed volumes are read from their own keys
    /// `V_ar<bed>_sys_u`.
    pub fn from_list(list: &ParameterList) -> ModelResult<Self> {
        let mut beds = [PeripheralParams::default(); 5];
        for bed in PeripheralBed::ALL {
            beds[bed.ordinal()] = PeripheralParams {
                arterial: Windkessel::from_list(list, &format!("ar{}_sys", bed.tag()))?,
                venous: Windkessel::from_list(list, &format!("ven{}_sys", bed.tag()))?,
            };
        }

        Ok(Self {
            atrium_left: ChamberParams::from_list(list, "at", "l")?,
            ventricle_left: ChamberParams::from_list(list, "v", "l")?,
            atrium_right: ChamberParams::from_list(list, "at", "r")?,
            ventricle_right: ChamberParams::from_list(list, "v", "r")?,
            mitral: ValveParams::from_list(list, "at", "l")?,
            aortic: ValveParams::from_list(list, "ar", "l")?,
            tricuspid: ValveParams::from_list(list, "at", "r")?,
            pulmonary: ValveParams::from_list(list, "ar", "r")?,
            ar_sys: Windkessel::from_list(list, "ar_sys")?,
            ven_sys: Windkessel::from_list(list, "ven_sys")?,
            ar_pul: Windkessel::from_list(list, "ar_pul")?,
            cap_pul: Windkessel::from_list(list, "cap_pul")?,
            ven_pul: Windkessel::from_list(list, "ven_pul")?,
            beds,
        })
    }

    pub fn validate(&self, options: &ModelOptions) -> ModelResult<()> {
        self.atrium_left.validate("atrium_left", options.atrium_model)?;
        self.atrium_right.validate("atrium_right", options.atrium_model)?;
        self.ventricle_left.validate("ventricle_left", options.ventricle_model)?;
        self.ventricle_right.validate("ventricle_right", options.ventricle_model)?;

        self.mitral.validate("mitral valve")?;
        self.aortic.validate("aortic valve")?;
        self.tricuspid.validate("tricuspid valve")?;
        self.pulmonary.validate("pulmonary valve")?;

        self.ar_sys.validate("ar_sys")?;
        self.ven_sys.validate("ven_sys")?;
        self.ar_pul.validate("ar_pul")?;
        self.cap_pul.validate("cap_pul")?;
        self.ven_pul.validate("ven_pul")?;

        for bed in PeripheralBed::ALL {
            let params = self.bed(bed);
            params.arterial.validate(&format!("ar{}_sys", bed.tag()))?;
            params.venous.validate(&format!("ven{}_sys", bed.tag()))?;
        }
        Ok(())
    }
}

// =================================================================================================
// Respiratory parameters
// =================================================================================================

/// Metabolism and storage volume of one tissue bed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TissueParams {
    /// CO2 production rate.
    pub m_co2: f64,
    /// Maximal O2 consumption rate.
    pub m_o2: f64,
    /// Tissue volume.
    pub v_tiss: f64,
}

/// Coefficients of alveolar mechanics, gas exchange and gas transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RespiratoryParams {
    pub l_alv: f64,
    pub r_alv: f64,
    pub e_alv: f64,
    pub u_t_curve: Option<CurveId>,
    pub u_m: f64,

    pub v_lung_tidal: f64,
    pub v_lung_dead: f64,
    pub v_lung_u: f64,

    pub f_co2_ext: f64,
    pub f_o2_ext: f64,

    pub v_m_gas: f64,
    pub p_vap_water_37: f64,
    pub kappa_co2: f64,
    pub kappa_o2: f64,

    pub kernel: DissociationKernel,
    pub beta_o2: f64,

    pub tissues: [TissueParams; 5],
}

impl RespiratoryParams {
    pub fn tissue(&self, bed: PeripheralBed) -> &TissueParams {
        &self.tissues[bed.ordinal()]
    }

    /// Weight of alveolar gas in the inspired mixture: V_dead/V_tidal when
    /// the tidal volume exceeds the dead space, otherwise 1.
    pub fn dead_space_fraction(&self) -> f64 {
        if self.v_lung_tidal >= self.v_lung_dead {
            self.v_lung_dead / self.v_lung_tidal
        } else {
            1.0
        }
    }

    /// Inspired fraction mixing dead-space gas with ambient gas.
    pub fn inspired_fraction(&self, f_alv: f64, f_ext: f64) -> f64 {
        if self.v_lung_tidal >= self.v_lung_dead {
            (f_alv * self.v_lung_dead + f_ext * (self.v_lung_tidal - self.v_lung_dead))
                / self.v_lung_tidal
        } else {
            f_alv
        }
    }

    pub fn from_list(list: &ParameterList) -> ModelResult<Self> {
        let kernel = DissociationKernel::new(
            list.require("alpha_CO2")?,
            list.require("alpha_O2")?,
            list.require("c_Hb")?,
        )
        .with_hill(
            list.get_or("n_hill", DEFAULT_HILL_EXPONENT),
            list.get_or("P50_O2", DEFAULT_P50),
        );

        let mut tissues = [TissueParams::default(); 5];
        for bed in PeripheralBed::ALL {
            tissues[bed.ordinal()] = TissueParams {
                m_co2: list.require(&format!("M_CO2_ar{}", bed.tag()))?,
                m_o2: list.require(&format!("M_O2_ar{}", bed.tag()))?,
                v_tiss: list.require(&format!("V_tiss{}", bed.tag()))?,
            };
        }

        Ok(Self {
            l_alv: list.get_or("L_alv", 0.0),
            r_alv: list.require("R_alv")?,
            e_alv: list.require("E_alv")?,
            u_t_curve: list.curve("U_t_curve"),
            u_m: list.require("U_m")?,
            v_lung_tidal: list.require("V_lung_tidal")?,
            v_lung_dead: list.require("V_lung_dead")?,
            v_lung_u: list.get_or("V_lung_u", 0.0),
            f_co2_ext: list.require("fCO2_ext")?,
            f_o2_ext: list.require("fO2_ext")?,
            v_m_gas: list.require("V_m_gas")?,
            p_vap_water_37: list.require("p_vap_water_37")?,
            kappa_co2: list.require("kappa_CO2")?,
            kappa_o2: list.require("kappa_O2")?,
            kernel,
            beta_o2: list.get_or("beta_O2", DEFAULT_BETA_O2),
            tissues,
        })
    }

    pub fn validate(&self) -> ModelResult<()> {
        non_negative("L_alv", self.l_alv)?;
        positive("R_alv", self.r_alv)?;
        positive("E_alv", self.e_alv)?;
        finite("U_m", self.u_m)?;
        positive("V_lung_tidal", self.v_lung_tidal)?;
        non_negative("V_lung_dead", self.v_lung_dead)?;
        finite("V_lung_u", self.v_lung_u)?;
        non_negative("fCO2_ext", self.f_co2_ext)?;
        non_negative("fO2_ext", self.f_o2_ext)?;
        non_negative("V_m_gas", self.v_m_gas)?;
        finite("p_vap_water_37", self.p_vap_water_37)?;
        non_negative("kappa_CO2", self.kappa_co2)?;
        non_negative("kappa_O2", self.kappa_o2)?;
        positive("beta_O2", self.beta_o2)?;
        self.kernel.validate()?;
        for bed in PeripheralBed::ALL {
            let tissue = self.tissue(bed);
            finite(&format!("M_CO2_ar{}", bed.tag()), tissue.m_co2)?;
            non_negative(&format!("M_O2_ar{}", bed.tag()), tissue.m_o2)?;
            non_negative(&format!("V_tiss{}", bed.tag()), tissue.v_tiss)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn respiratory() -> RespiratoryParams {
        RespiratoryParams {
            l_alv: 0.0,
            r_alv: 1.0,
            e_alv: 1.0,
            u_t_curve: None,
            u_m: 101.3,
            v_lung_tidal: 400.0,
            v_lung_dead: 150.0,
            v_lung_u: 0.0,
            f_co2_ext: 0.0,
            f_o2_ext: 0.21,
            v_m_gas: 22.4,
            p_vap_water_37: 6.28,
            kappa_co2: 2e-5,
            kappa_o2: 2e-5,
            kernel: DissociationKernel::new(0.226, 0.0103, 8.7),
            beta_o2: DEFAULT_BETA_O2,
            tissues: [TissueParams::default(); 5],
        }
    }

    #[test]
    fn test_dead_space_mixing() {
        let params = respiratory();
        assert_relative_eq!(params.inspired_fraction(0.14, 0.21), 0.18375, epsilon = 1e-15);
        assert_relative_eq!(params.dead_space_fraction(), 0.375);
    }

    #[test]
    fn test_dead_space_equal_to_tidal_volume_rebreathes_alveolar_gas() {
        let mut params = respiratory();
        params.v_lung_dead = params.v_lung_tidal;
        assert_eq!(params.inspired_fraction(0.14, 0.21), 0.14);

        params.v_lung_dead = 2.0 * params.v_lung_tidal;
        assert_eq!(params.inspired_fraction(0.14, 0.21), 0.14);
        assert_eq!(params.dead_space_fraction(), 1.0);
    }

    #[test]
    fn test_respiratory_validation() {
        assert!(respiratory().validate().is_ok());

        let mut params = respiratory();
        params.v_lung_tidal = 0.0;
        assert!(params.validate().is_err());

        let mut params = respiratory();
        params.r_alv = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_curve_ids() {
        let list = ParameterList::new()
            .with("Atrium_act_curve_l", 3.0)
            .with("Atrium_act_curve_r", -1.0);
        assert_eq!(list.curve("Atrium_act_curve_l"), Some(3));
        assert_eq!(list.curve("Atrium_act_curve_r"), None);
        assert_eq!(list.curve("Ventricle_act_curve_l"), None);
    }

    #[test]
    fn test_model_options() {
        let list = ParameterList::new()
            .with_option("ATRIUM_MODEL", "prescribed")
            .with_option("VENTRICLE_MODEL", "3D")
            .with_option("RESPIRATORY_MODEL", "Standard");
        let options = ModelOptions::from_list(&list).unwrap();
        assert_eq!(options.atrium_model, ChamberModel::Prescribed);
        assert_eq!(options.ventricle_model, ChamberModel::Structure3D);
        assert!(options.respiratory_model.is_active());

        let defaults = ModelOptions::from_list(&ParameterList::new()).unwrap();
        assert_eq!(defaults, ModelOptions::default());
    }

    #[test]
    fn test_undefined_model_is_rejected() {
        let list = ParameterList::new().with_option("ATRIUM_MODEL", "4D");
        let err = ModelOptions::from_list(&list).unwrap_err();
        assert_eq!(err.to_string(), "undefined ATRIUM_MODEL: 4D");

        let list = ParameterList::new().with_option("RESPIRATORY_MODEL", "Advanced");
        assert!(matches!(
            ModelOptions::from_list(&list),
            Err(ModelError::UndefinedModel { option: "RESPIRATORY_MODEL", .. })
        ));
    }

    #[test]
    fn test_windkessel_validation() {
        assert!(Windkessel::new(1.0, 1.0).validate("w").is_ok());
        assert!(Windkessel::new(0.0, 1.0).validate("w").is_err());
        assert!(Windkessel::new(1.0, 0.0).validate("w").is_err());
        assert!(Windkessel::new(1.0, 1.0).inertance(-1.0).validate("w").is_err());
    }

    #[test]
    fn test_chamber_validation_depends_on_mode() {
        let chamber = ChamberParams { e_max: 0.0, e_min: 0.0, ..Default::default() };
        assert!(chamber.validate("atrium_left", ChamberModel::Elastance0D).is_err());
        assert!(chamber.validate("atrium_left", ChamberModel::Structure3D).is_ok());
        assert!(chamber.validate("atrium_left", ChamberModel::Prescribed).is_err());

        let prescribed = ChamberParams { prescribed_curve: Some(2), ..Default::default() };
        assert!(prescribed.validate("atrium_left", ChamberModel::Prescribed).is_ok());
    }

    #[test]
    fn test_missing_required_key() {
        let err = RespiratoryParams::from_list(&ParameterList::new()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
    }
}
