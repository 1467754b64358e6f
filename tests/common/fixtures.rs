//! Parameter decks, time curves and states shared by the integration tests
//!
//! Units: kPa, mL, s. The states are chosen away from every switching
//! point: each valve is clearly open or closed and the mouth flow is
//! clearly inspiratory.

use cardio_rs::models::{CurveRegistry, ParameterList, TimeCurve};
use cardio_rs::physics::{GasSite, PeripheralBed, StateVar};
use nalgebra::DVector;

/// Curve ids used by the decks.
pub struct CurveSet;

impl CurveSet {
    pub const ATRIAL_ACTIVATION: usize = 1;
    pub const VENTRICULAR_ACTIVATION: usize = 2;
    pub const ATRIAL_ELASTANCE: usize = 3;
    pub const VENTRICULAR_ELASTANCE: usize = 4;
    pub const PLEURAL_PRESSURE: usize = 5;
}

/// Activation pulses for an 0.8 s beat, prescribed elastances and a
/// constant pleural pressure.
pub fn curves() -> CurveRegistry {
    CurveRegistry::new()
        .with(CurveSet::ATRIAL_ACTIVATION, TimeCurve::activation(0.6, 0.75, 0.8).unwrap())
        .with(CurveSet::VENTRICULAR_ACTIVATION, TimeCurve::activation(0.0, 0.3, 0.8).unwrap())
        .with(
            CurveSet::ATRIAL_ELASTANCE,
            TimeCurve::piecewise_linear(vec![0.0, 0.4, 0.8], vec![0.02, 0.04, 0.02], Some(0.8))
                .unwrap(),
        )
        .with(
            CurveSet::VENTRICULAR_ELASTANCE,
            TimeCurve::piecewise_linear(vec![0.0, 0.2, 0.8], vec![0.012, 0.3, 0.012], Some(0.8))
                .unwrap(),
        )
        .with(CurveSet::PLEURAL_PRESSURE, TimeCurve::constant(-0.5))
}

fn windkessel(
    list: ParameterList,
    tag: &str,
    c: f64,
    r: f64,
    l: f64,
    z: f64,
    v_u: f64,
) -> ParameterList {
    list.with(&format!("C_{}", tag), c)
        .with(&format!("R_{}", tag), r)
        .with(&format!("L_{}", tag), l)
        .with(&format!("Z_{}", tag), z)
        .with(&format!("V_{}_u", tag), v_u)
}

/// Closed-loop circulation with all chambers in `0D` mode.
pub fn cardiovascular_list() -> ParameterList {
    let mut list = ParameterList::new()
        .with_option("ATRIUM_MODEL", "0D")
        .with_option("VENTRICLE_MODEL", "0D")
        .with_option("RESPIRATORY_MODEL", "None");

    // Chambers: (kind, side, E_max, E_min, V_u)
    for (kind, side, e_max, e_min, v_u) in [
        ("at", "l", 0.04, 0.02, 20.0),
        ("v", "l", 0.3, 0.012, 40.0),
        ("at", "r", 0.03, 0.015, 20.0),
        ("v", "r", 0.08, 0.006, 40.0),
    ] {
        list = list
            .with(&format!("E_{}_max_{}", kind, side), e_max)
            .with(&format!("E_{}_min_{}", kind, side), e_min)
            .with(&format!("V_{}_{}_u", kind, side), v_u);
    }
    list = list
        .with("Atrium_act_curve_l", CurveSet::ATRIAL_ACTIVATION as f64)
        .with("Atrium_act_curve_r", CurveSet::ATRIAL_ACTIVATION as f64)
        .with("Ventricle_act_curve_l", CurveSet::VENTRICULAR_ACTIVATION as f64)
        .with("Ventricle_act_curve_r", CurveSet::VENTRICULAR_ACTIVATION as f64)
        .with("Atrium_prescr_E_curve_l", CurveSet::ATRIAL_ELASTANCE as f64)
        .with("Atrium_prescr_E_curve_r", CurveSet::ATRIAL_ELASTANCE as f64)
        .with("Ventricle_prescr_E_curve_l", CurveSet::VENTRICULAR_ELASTANCE as f64)
        .with("Ventricle_prescr_E_curve_r", CurveSet::VENTRICULAR_ELASTANCE as f64);

    // Valves
    for (kind, side, r_min, r_max) in [
        ("at", "l", 1e-3, 1e3),
        ("ar", "l", 1e-3, 1e3),
        ("at", "r", 1e-3, 1e3),
        ("ar", "r", 1e-3, 1e3),
    ] {
        list = list
            .with(&format!("R_{}valve_min_{}", kind, side), r_min)
            .with(&format!("R_{}valve_max_{}", kind, side), r_max);
    }

    // Large vessels
    list = windkessel(list, "ar_sys", 10.0, 0.005, 1e-4, 0.006, 500.0);
    list = windkessel(list, "ven_sys", 100.0, 0.01, 1e-4, 0.0, 2000.0);
    list = windkessel(list, "ar_pul", 25.0, 0.005, 1e-4, 0.002, 100.0);
    list = windkessel(list, "cap_pul", 30.0, 0.02, 0.0, 0.0, 120.0);
    list = windkessel(list, "ven_pul", 60.0, 0.004, 1e-4, 0.0, 400.0);

    // Peripheral beds: (arterial C, R, V_u), (venous C, R, V_u)
    let beds = [
        ((1.5, 0.4, 60.0), (40.0, 0.01, 500.0)),
        ((1.2, 0.5, 50.0), (30.0, 0.012, 400.0)),
        ((1.8, 0.45, 70.0), (45.0, 0.011, 450.0)),
        ((0.8, 0.7, 30.0), (15.0, 0.02, 150.0)),
        ((0.3, 1.6, 10.0), (5.0, 0.05, 50.0)),
    ];
    for (bed, (arterial, venous)) in PeripheralBed::ALL.iter().zip(beds) {
        let (ar, ven) = (format!("ar{}_sys", bed.tag()), format!("ven{}_sys", bed.tag()));
        list = windkessel(list, &ar, arterial.0, arterial.1, 0.0, 0.0, arterial.2);
        list = windkessel(list, &ven, venous.0, venous.1, 0.0, 0.0, venous.2);
    }
    list
}

/// Circulation plus lung mechanics and gas transport.
pub fn respiratory_list() -> ParameterList {
    let mut list = cardiovascular_list()
        .with_option("RESPIRATORY_MODEL", "Standard")
        .with("L_alv", 1e-5)
        .with("R_alv", 1e-3)
        .with("E_alv", 0.04)
        .with("U_t_curve", CurveSet::PLEURAL_PRESSURE as f64)
        .with("U_m", 101.3)
        .with("V_lung_tidal", 400.0)
        .with("V_lung_dead", 150.0)
        .with("V_lung_u", 0.0)
        .with("fCO2_ext", 0.0004)
        .with("fO2_ext", 0.21)
        .with("V_m_gas", 22.4)
        .with("p_vap_water_37", 6.28)
        .with("kappa_CO2", 0.01)
        .with("kappa_O2", 0.01)
        .with("alpha_CO2", 0.226)
        .with("alpha_O2", 0.0103)
        .with("c_Hb", 8.7);

    // Tissue beds: (M_CO2, M_O2, V_tiss)
    let tissues = [
        (0.05, 0.06, 1500.0),
        (0.04, 0.05, 1200.0),
        (0.06, 0.07, 2500.0),
        (0.03, 0.04, 1300.0),
        (0.02, 0.025, 300.0),
    ];
    for (bed, (m_co2, m_o2, v_tiss)) in PeripheralBed::ALL.iter().zip(tissues) {
        list = list
            .with(&format!("M_CO2_ar{}", bed.tag()), m_co2)
            .with(&format!("M_O2_ar{}", bed.tag()), m_o2)
            .with(&format!("V_tiss{}", bed.tag()), v_tiss);
    }
    list
}

/// Replace every valve's open and closed resistance by `r`.
pub fn linear_valves(mut list: ParameterList, r: f64) -> ParameterList {
    for kind in ["at", "ar"] {
        for side in ["l", "r"] {
            list.set(&format!("R_{}valve_min_{}", kind, side), r);
            list.set(&format!("R_{}valve_max_{}", kind, side), r);
        }
    }
    list
}

/// Late diastole: atrioventricular valves open, semilunar valves closed.
pub fn cardiovascular_state() -> DVector<f64> {
    let mut x = DVector::zeros(34);
    let mut set = |state: StateVar, value: f64| x[state.index()] = value;

    set(StateVar::PAtL, 1.2);
    set(StateVar::QVinL, 60.0);
    set(StateVar::QVoutL, 0.5);
    set(StateVar::PVL, 1.0);
    set(StateVar::PArSys, 11.0);
    set(StateVar::QArSys, 80.0);
    set(StateVar::PArperiSys, 10.0);

    let arterial_flows = [20.0, 15.0, 18.0, 12.0, 5.0];
    let venous_pressures = [2.0, 2.1, 1.9, 2.2, 1.8];
    let venous_flows = [19.0, 14.0, 17.0, 12.5, 4.5];
    for (k, bed) in PeripheralBed::ALL.into_iter().enumerate() {
        set(StateVar::QAr(bed), arterial_flows[k]);
        set(StateVar::PVen(bed), venous_pressures[k]);
        set(StateVar::QVen(bed), venous_flows[k]);
    }

    set(StateVar::PVenSys, 0.8);
    set(StateVar::QVenSys, 70.0);
    set(StateVar::PAtR, 0.5);
    set(StateVar::QVinR, 55.0);
    set(StateVar::QVoutR, 0.4);
    set(StateVar::PVR, 0.3);
    set(StateVar::PArPul, 2.5);
    set(StateVar::QArPul, 75.0);
    set(StateVar::PCapPul, 2.0);
    set(StateVar::QCapPul, 72.0);
    set(StateVar::PVenPul, 1.6);
    set(StateVar::QVenPul, 68.0);
    x
}

/// Cardiovascular state extended by an inflating lung and a venous to
/// arterial gradient in every gas site.
pub fn respiratory_state() -> DVector<f64> {
    let mut x = cardiovascular_state().resize_vertically(82, 0.0);

    x[StateVar::VAlv.index()] = 2500.0;
    x[StateVar::QAlv.index()] = 5.0;
    x[StateVar::PAlv.index()] = 101.2;
    x[StateVar::FCo2Alv.index()] = 0.05;
    x[StateVar::FO2Alv.index()] = 0.14;

    for bed in PeripheralBed::ALL {
        x[StateVar::QArIn(bed).index()] = x[StateVar::QAr(bed).index()] + 1.0;
    }

    let mut gas = |site: GasSite, co2: f64, o2: f64| {
        x[site.co2_index()] = co2;
        x[site.o2_index()] = o2;
    };
    gas(GasSite::RightAtrium, 6.1, 5.2);
    gas(GasSite::RightVentricle, 6.1, 5.25);
    gas(GasSite::PulmonaryArteries, 6.0, 5.3);
    gas(GasSite::PulmonaryCapillaries, 5.6, 11.5);
    gas(GasSite::PulmonaryVeins, 5.4, 12.8);
    gas(GasSite::LeftAtrium, 5.35, 12.9);
    gas(GasSite::LeftVentricle, 5.35, 12.85);
    gas(GasSite::SystemicArteries, 5.3, 12.7);
    for (k, bed) in PeripheralBed::ALL.into_iter().enumerate() {
        gas(GasSite::Arteriolar(bed), 5.5 + 0.05 * k as f64, 10.0 - 0.3 * k as f64);
        gas(GasSite::Venous(bed), 6.0 + 0.05 * k as f64, 5.5 - 0.1 * k as f64);
    }
    gas(GasSite::SystemicVeins, 6.1, 5.1);
    x
}

/// External volume vector of length `n` with cavity volumes for chambers
/// coupled to a structure.
pub fn external_volumes(n: usize) -> DVector<f64> {
    let mut v = DVector::zeros(n);
    v[0] = 60.0;
    v[2] = 120.0;
    v[24] = 55.0;
    v[26] = 110.0;
    v
}
