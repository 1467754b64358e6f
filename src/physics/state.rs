//! State variable layout
//!
//! The model has a fixed numeric layout: 34 cardiovascular unknowns,
//! optionally followed by 48 respiratory and gas-transport unknowns.
//! [`StateVar`] is the tagged view of that layout. Every variant maps to
//! exactly one index and back, so residual assembly can be written against
//! names while storage stays a flat `DVector<f64>`.
//!
//! | range    | content |
//! |----------|---------|
//! | 0..=33   | chamber, arterial, peripheral and venous pressures and flows |
//! | 34..=38  | alveolar volume, flux, pressure and gas fractions |
//! | 39..=43  | inlet flows of the five peripheral arterial beds |
//! | 44..=81  | (ppCO2, ppO2) pairs at 19 sampling sites |

use std::fmt;

/// Number of cardiovascular unknowns.
pub const CARDIOVASCULAR_DOFS: usize = 34;

/// Number of respiratory and gas-transport unknowns.
pub const RESPIRATORY_DOFS: usize = 48;

/// Full system size with respiration active.
pub const TOTAL_DOFS: usize = CARDIOVASCULAR_DOFS + RESPIRATORY_DOFS;

/// First index of the gas partial-pressure block.
pub const GAS_BLOCK_START: usize = 44;

// =================================================================================================
// Peripheral beds
// =================================================================================================

/// The five parallel systemic tissue beds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeripheralBed {
    Splanchnic,
    ExtraSplanchnic,
    Muscular,
    Cerebral,
    Coronary,
}

impl PeripheralBed {
    /// All beds in layout order.
    pub const ALL: [PeripheralBed; 5] = [
        PeripheralBed::Splanchnic,
        PeripheralBed::ExtraSplanchnic,
        PeripheralBed::Muscular,
        PeripheralBed::Cerebral,
        PeripheralBed::Coronary,
    ];

    /// Position in layout order (0..5).
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Short tag used in state and parameter names.
    pub const fn tag(self) -> &'static str {
        match self {
            PeripheralBed::Splanchnic => "spl",
            PeripheralBed::ExtraSplanchnic => "espl",
            PeripheralBed::Muscular => "msc",
            PeripheralBed::Cerebral => "cer",
            PeripheralBed::Coronary => "cor",
        }
    }

    /// Arterial outflow of the bed (`q_ar{bed}_sys`).
    pub const fn arterial_flow_index(self) -> usize {
        7 + self.ordinal()
    }

    /// Venous pressure of the bed (`p_ven{bed}_sys`).
    pub const fn venous_pressure_index(self) -> usize {
        12 + 2 * self.ordinal()
    }

    /// Venous outflow of the bed (`q_ven{bed}_sys`).
    pub const fn venous_flow_index(self) -> usize {
        13 + 2 * self.ordinal()
    }

    /// Inlet flow of the bed's arterial compartment (`q_ar{bed}_sys_in`).
    pub const fn inlet_flow_index(self) -> usize {
        39 + self.ordinal()
    }
}

// =================================================================================================
// Gas sampling sites
// =================================================================================================

/// Compartments carrying a (ppCO2, ppO2) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasSite {
    RightAtrium,
    RightVentricle,
    PulmonaryArteries,
    PulmonaryCapillaries,
    PulmonaryVeins,
    LeftAtrium,
    LeftVentricle,
    SystemicArteries,
    Arteriolar(PeripheralBed),
    Venous(PeripheralBed),
    SystemicVeins,
}

impl GasSite {
    /// Number of sampling sites.
    pub const COUNT: usize = 19;

    /// Position in layout order (0..19).
    pub const fn ordinal(self) -> usize {
        match self {
            GasSite::RightAtrium => 0,
            GasSite::RightVentricle => 1,
            GasSite::PulmonaryArteries => 2,
            GasSite::PulmonaryCapillaries => 3,
            GasSite::PulmonaryVeins => 4,
            GasSite::LeftAtrium => 5,
            GasSite::LeftVentricle => 6,
            GasSite::SystemicArteries => 7,
            GasSite::Arteriolar(bed) => 8 + bed.ordinal(),
            GasSite::Venous(bed) => 13 + bed.ordinal(),
            GasSite::SystemicVeins => 18,
        }
    }

    /// Inverse of [`GasSite::ordinal`].
    pub const fn from_ordinal(ordinal: usize) -> Option<GasSite> {
        Some(match ordinal {
            0 => GasSite::RightAtrium,
            1 => GasSite::RightVentricle,
            2 => GasSite::PulmonaryArteries,
            3 => GasSite::PulmonaryCapillaries,
            4 => GasSite::PulmonaryVeins,
            5 => GasSite::LeftAtrium,
            6 => GasSite::LeftVentricle,
            7 => GasSite::SystemicArteries,
            8..=12 => GasSite::Arteriolar(PeripheralBed::ALL[ordinal - 8]),
            13..=17 => GasSite::Venous(PeripheralBed::ALL[ordinal - 13]),
            18 => GasSite::SystemicVeins,
            _ => return None,
        })
    }

    /// All sites in layout order.
    pub fn all() -> impl Iterator<Item = GasSite> {
        (0..Self::COUNT).filter_map(GasSite::from_ordinal)
    }

    /// Index of the CO2 partial pressure; O2 follows at `+1`.
    pub const fn co2_index(self) -> usize {
        GAS_BLOCK_START + 2 * self.ordinal()
    }

    /// Index of the O2 partial pressure.
    pub const fn o2_index(self) -> usize {
        self.co2_index() + 1
    }

    /// Compartment tag used in state names.
    pub fn tag(self) -> String {
        match self {
            GasSite::RightAtrium => "at_r".to_string(),
            GasSite::RightVentricle => "v_r".to_string(),
            GasSite::PulmonaryArteries => "ar_pul".to_string(),
            GasSite::PulmonaryCapillaries => "cap_pul".to_string(),
            GasSite::PulmonaryVeins => "ven_pul".to_string(),
            GasSite::LeftAtrium => "at_l".to_string(),
            GasSite::LeftVentricle => "v_l".to_string(),
            GasSite::SystemicArteries => "ar_sys".to_string(),
            GasSite::Arteriolar(bed) => format!("ar{}_sys", bed.tag()),
            GasSite::Venous(bed) => format!("ven{}_sys", bed.tag()),
            GasSite::SystemicVeins => "ven_sys".to_string(),
        }
    }
}

// =================================================================================================
// State variables
// =================================================================================================

/// One unknown of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVar {
    PAtL,
    QVinL,
    QVoutL,
    PVL,
    PArSys,
    QArSys,
    PArperiSys,
    QAr(PeripheralBed),
    PVen(PeripheralBed),
    QVen(PeripheralBed),
    PVenSys,
    QVenSys,
    PAtR,
    QVinR,
    QVoutR,
    PVR,
    PArPul,
    QArPul,
    PCapPul,
    QCapPul,
    PVenPul,
    QVenPul,
    VAlv,
    QAlv,
    PAlv,
    FCo2Alv,
    FO2Alv,
    QArIn(PeripheralBed),
    PpCo2(GasSite),
    PpO2(GasSite),
}

impl StateVar {
    /// Position in the flat state vector.
    pub const fn index(self) -> usize {
        match self {
            StateVar::PAtL => 0,
            StateVar::QVinL => 1,
            StateVar::QVoutL => 2,
            StateVar::PVL => 3,
            StateVar::PArSys => 4,
            StateVar::QArSys => 5,
            StateVar::PArperiSys => 6,
            StateVar::QAr(bed) => bed.arterial_flow_index(),
            StateVar::PVen(bed) => bed.venous_pressure_index(),
            StateVar::QVen(bed) => bed.venous_flow_index(),
            StateVar::PVenSys => 22,
            StateVar::QVenSys => 23,
            StateVar::PAtR => 24,
            StateVar::QVinR => 25,
            StateVar::QVoutR => 26,
            StateVar::PVR => 27,
            StateVar::PArPul => 28,
            StateVar::QArPul => 29,
            StateVar::PCapPul => 30,
            StateVar::QCapPul => 31,
            StateVar::PVenPul => 32,
            StateVar::QVenPul => 33,
            StateVar::VAlv => 34,
            StateVar::QAlv => 35,
            StateVar::PAlv => 36,
            StateVar::FCo2Alv => 37,
            StateVar::FO2Alv => 38,
            StateVar::QArIn(bed) => bed.inlet_flow_index(),
            StateVar::PpCo2(site) => site.co2_index(),
            StateVar::PpO2(site) => site.o2_index(),
        }
    }

    /// Inverse of [`StateVar::index`].
    pub const fn from_index(index: usize) -> Option<StateVar> {
        Some(match index {
            0 => StateVar::PAtL,
            1 => StateVar::QVinL,
            2 => StateVar::QVoutL,
            3 => StateVar::PVL,
            4 => StateVar::PArSys,
            5 => StateVar::QArSys,
            6 => StateVar::PArperiSys,
            7..=11 => StateVar::QAr(PeripheralBed::ALL[index - 7]),
            12..=21 if index % 2 == 0 => StateVar::PVen(PeripheralBed::ALL[(index - 12) / 2]),
            12..=21 => StateVar::QVen(PeripheralBed::ALL[(index - 13) / 2]),
            22 => StateVar::PVenSys,
            23 => StateVar::QVenSys,
            24 => StateVar::PAtR,
            25 => StateVar::QVinR,
            26 => StateVar::QVoutR,
            27 => StateVar::PVR,
            28 => StateVar::PArPul,
            29 => StateVar::QArPul,
            30 => StateVar::PCapPul,
            31 => StateVar::QCapPul,
            32 => StateVar::PVenPul,
            33 => StateVar::QVenPul,
            34 => StateVar::VAlv,
            35 => StateVar::QAlv,
            36 => StateVar::PAlv,
            37 => StateVar::FCo2Alv,
            38 => StateVar::FO2Alv,
            39..=43 => StateVar::QArIn(PeripheralBed::ALL[index - 39]),
            44..=81 => {
                let site = match GasSite::from_ordinal((index - GAS_BLOCK_START) / 2) {
                    Some(site) => site,
                    None => return None,
                };
                if index % 2 == 0 {
                    StateVar::PpCo2(site)
                } else {
                    StateVar::PpO2(site)
                }
            }
            _ => return None,
        })
    }

    /// The first `n` state variables in layout order.
    pub fn all(n: usize) -> impl Iterator<Item = StateVar> {
        (0..n.min(TOTAL_DOFS)).filter_map(StateVar::from_index)
    }

    /// Look up a state by its printed name.
    pub fn from_name(name: &str) -> Option<StateVar> {
        StateVar::all(TOTAL_DOFS).find(|state| state.name() == name)
    }

    /// Printed name, e.g. `p_v_l` or `ppO2_ar_sys`.
    pub fn name(self) -> String {
        match self {
            StateVar::PAtL => "p_at_l".to_string(),
            StateVar::QVinL => "q_vin_l".to_string(),
            StateVar::QVoutL => "q_vout_l".to_string(),
            StateVar::PVL => "p_v_l".to_string(),
            StateVar::PArSys => "p_ar_sys".to_string(),
            StateVar::QArSys => "q_ar_sys".to_string(),
            StateVar::PArperiSys => "p_arperi_sys".to_string(),
            StateVar::QAr(bed) => format!("q_ar{}_sys", bed.tag()),
            StateVar::PVen(bed) => format!("p_ven{}_sys", bed.tag()),
            StateVar::QVen(bed) => format!("q_ven{}_sys", bed.tag()),
            StateVar::PVenSys => "p_ven_sys".to_string(),
            StateVar::QVenSys => "q_ven_sys".to_string(),
            StateVar::PAtR => "p_at_r".to_string(),
            StateVar::QVinR => "q_vin_r".to_string(),
            StateVar::QVoutR => "q_vout_r".to_string(),
            StateVar::PVR => "p_v_r".to_string(),
            StateVar::PArPul => "p_ar_pul".to_string(),
            StateVar::QArPul => "q_ar_pul".to_string(),
            StateVar::PCapPul => "p_cap_pul".to_string(),
            StateVar::QCapPul => "q_cap_pul".to_string(),
            StateVar::PVenPul => "p_ven_pul".to_string(),
            StateVar::QVenPul => "q_ven_pul".to_string(),
            StateVar::VAlv => "V_alv".to_string(),
            StateVar::QAlv => "q_alv".to_string(),
            StateVar::PAlv => "p_alv".to_string(),
            StateVar::FCo2Alv => "fCO2_alv".to_string(),
            StateVar::FO2Alv => "fO2_alv".to_string(),
            StateVar::QArIn(bed) => format!("q_ar{}_sys_in", bed.tag()),
            StateVar::PpCo2(site) => format!("ppCO2_{}", site.tag()),
            StateVar::PpO2(site) => format!("ppO2_{}", site.tag()),
        }
    }
}

impl fmt::Display for StateVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
