//! Coupling with a 3D structural model
//!
//! Chambers run in `Structure3D` mode get their volume from an external
//! finite-element model of the cavity wall. The 0D side needs three things
//! from each coupled cavity:
//!
//! - the enclosed volume, fed back as `v_ext` on the next evaluation;
//! - S = ∂r_0D/∂d, the sensitivity of the 0D residual to the wall
//!   displacement d (stored structural-dof × 0D-row);
//! - S' = ∂r_struct/∂p, the cavity pressure load on the wall.
//!
//! Element geometry stays on the structural side: a [`CouplingProvider`]
//! hands over, per condition, each element's location vector, its volume
//! contribution and the volume derivative w.r.t. the element's dofs.

use crate::error::{ModelError, ModelResult};
use crate::models::chamber::Chamber;
use crate::physics::{GasSite, StepContext};
use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;

/// Chamber a condition is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Chamber(Chamber),
    /// Placeholder condition without a cavity; skipped.
    Dummy,
}

impl ConditionKind {
    /// Parse the condition `TYPE` string.
    pub fn from_tag(tag: &str) -> ModelResult<Self> {
        match tag {
            "dummy" => Ok(ConditionKind::Dummy),
            _ => Chamber::ALL
                .iter()
                .find(|chamber| chamber.name() == tag)
                .map(|chamber| ConditionKind::Chamber(*chamber))
                .ok_or_else(|| ModelError::UndefinedModel {
                    option: "TYPE",
                    value: tag.to_string(),
                }),
        }
    }

    pub fn chamber(&self) -> Option<Chamber> {
        match self {
            ConditionKind::Chamber(chamber) => Some(*chamber),
            ConditionKind::Dummy => None,
        }
    }
}

/// Contribution of one boundary element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCoupling {
    /// Structural dof of every local element dof.
    pub location: Vec<usize>,

    /// Volume enclosed by this element's surface patch.
    pub volume: f64,

    /// ∂volume/∂d for the element dofs, same order as `location`.
    pub volume_derivative: DVector<f64>,
}

impl ElementCoupling {
    pub fn new(location: Vec<usize>, volume: f64, volume_derivative: DVector<f64>) -> Self {
        Self { location, volume, volume_derivative }
    }
}

/// A surface condition binding a set of elements to one chamber.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingCondition {
    pub id: usize,
    pub kind: ConditionKind,
    pub elements: Vec<ElementCoupling>,
}

/// Structural side of the coupling.
pub trait CouplingProvider {
    /// Whether the structural discretization has been finalized.
    fn is_filled(&self) -> bool;

    /// Whether structural degrees of freedom have been numbered.
    fn has_dofs(&self) -> bool;

    /// Number of structural degrees of freedom.
    fn structural_dofs(&self) -> usize;

    fn conditions(&self) -> &[CouplingCondition];
}

/// Data from the 0D evaluation needed when respiration is active.
#[derive(Debug, Clone, Copy)]
pub struct GasCoupling<'a> {
    pub f_np: &'a DVector<f64>,
    pub volumes: &'a DVector<f64>,
}

/// Off-diagonal coupling blocks and the enclosed chamber volumes.
#[derive(Debug, Clone)]
pub struct CouplingBlocks {
    /// S, structural dofs × 0D rows.
    pub d_cardio_d_disp: CooMatrix<f64>,

    /// S', 0D rows × structural dofs.
    pub d_struct_d_cardio: CooMatrix<f64>,

    /// Element volumes summed into each chamber's volume slot.
    pub enclosed_volumes: DVector<f64>,
}

fn gas_site(chamber: Chamber) -> GasSite {
    match chamber {
        Chamber::LeftAtrium => GasSite::LeftAtrium,
        Chamber::LeftVentricle => GasSite::LeftVentricle,
        Chamber::RightAtrium => GasSite::RightAtrium,
        Chamber::RightVentricle => GasSite::RightVentricle,
    }
}

/// Assemble S, S' and the enclosed volumes for every non-dummy condition.
///
/// With `gas` present the chamber's two gas-transport rows also get their
/// volume sensitivity: −θ·f_np[row]/V_chamber per unit volume change.
///
/// # Errors
///
/// `FillCompleteNotCalled` / `DofsNotAssigned` when the provider is not
/// ready, `ElementEvaluation` on inconsistent element data.
pub fn evaluate_coupling(
    provider: &dyn CouplingProvider,
    dimension: usize,
    ctx: &StepContext,
    gas: Option<GasCoupling<'_>>,
) -> ModelResult<CouplingBlocks> {
    if !provider.is_filled() {
        return Err(ModelError::FillCompleteNotCalled);
    }
    if !provider.has_dofs() {
        return Err(ModelError::DofsNotAssigned);
    }
    ctx.validate()?;

    let n_struct = provider.structural_dofs();
    let mut d_cardio_d_disp = CooMatrix::new(n_struct, dimension);
    let mut d_struct_d_cardio = CooMatrix::new(dimension, n_struct);
    let mut enclosed_volumes = DVector::zeros(dimension);

    for condition in provider.conditions() {
        let Some(chamber) = condition.kind.chamber() else {
            continue;
        };
        let volume_row = chamber.volume_index();
        let pressure_row = chamber.pressure().index();

        // Gas rows of this chamber and their −θ·f/V factor
        let gas_rows = match gas {
            Some(gas) => {
                let site = gas_site(chamber);
                let v = gas.volumes[volume_row];
                if !(v > 0.0) {
                    return Err(ModelError::NonPositiveVolume {
                        compartment: chamber.name().to_string(),
                        value: v,
                    });
                }
                [site.co2_index(), site.o2_index()]
                    .map(|row| (row, -ctx.theta * gas.f_np[row] / v))
                    .to_vec()
            }
            None => Vec::new(),
        };

        for (element_index, element) in condition.elements.iter().enumerate() {
            if element.location.len() != element.volume_derivative.len() {
                return Err(ModelError::element_evaluation(
                    condition.id,
                    format!(
                        "element {}: {} location entries, {} volume derivatives",
                        element_index,
                        element.location.len(),
                        element.volume_derivative.len()
                    ),
                ));
            }

            enclosed_volumes[volume_row] += element.volume;

            for (&dof, &dv) in element.location.iter().zip(element.volume_derivative.iter()) {
                if dof >= n_struct {
                    return Err(ModelError::element_evaluation(
                        condition.id,
                        format!("element {}: dof {} outside 0..{}", element_index, dof, n_struct),
                    ));
                }
                d_cardio_d_disp.push(dof, volume_row, -dv / ctx.dt);
                for &(row, factor) in &gas_rows {
                    d_cardio_d_disp.push(dof, row, factor * dv);
                }
                d_struct_d_cardio.push(pressure_row, dof, dv);
            }
        }
    }

    Ok(CouplingBlocks {
        d_cardio_d_disp,
        d_struct_d_cardio,
        enclosed_volumes,
    })
}
