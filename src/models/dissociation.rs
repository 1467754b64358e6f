//! Blood and tissue gas dissociation
//!
//! Maps partial pressures (ppCO2, ppO2) to gas contents and provides every
//! partial derivative the gas-transport rows need.
//!
//! # Content laws
//!
//! $$ C_{b,O_2} = \alpha_{O_2} \, pp_{O_2} + c_{Hb} \, S_{O_2}(pp_{O_2}) \qquad
//!    C_{b,CO_2} = \alpha_{CO_2} \, pp_{CO_2} $$
//!
//! $$ C_{t,O_2} = \alpha_{O_2} \, pp_{O_2} \qquad C_{t,CO_2} = \alpha_{CO_2} \, pp_{CO_2} $$
//!
//! with the Hill saturation
//!
//! $$ S_{O_2}(p) = \frac{(p/P_{50})^n}{1 + (p/P_{50})^n} $$
//!
//! Vectors and matrices are ordered (CO2, O2) throughout.
//!
//! # Closed-form 2×2 solve
//!
//! The transport rows need $J^{-1} \cdot \text{rate}$ with $J$ the 2×2
//! content Jacobian. [`gas_solve`] and [`invert_2x2`] do this by cofactor
//! expansion; a singular $J$ yields non-finite results rather than an
//! error.

use crate::error::{ModelError, ModelResult};
use nalgebra::{Matrix2, Vector2};

/// Index of CO2 in (CO2, O2) pairs.
pub const CO2: usize = 0;

/// Index of O2 in (CO2, O2) pairs.
pub const O2: usize = 1;

/// Hill exponent used when none is given.
pub const DEFAULT_HILL_EXPONENT: f64 = 2.7;

/// Half-saturation O2 partial pressure used when none is given (kPa).
pub const DEFAULT_P50: f64 = 3.57;

// =================================================================================================
// Content with derivatives
// =================================================================================================

/// Blood gas content at one (ppCO2, ppO2) with its first and second
/// derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloodContent {
    /// (C_CO2, C_O2)
    pub value: Vector2<f64>,

    /// `jacobian[(i, j)]` = ∂C_i/∂pp_j
    pub jacobian: Matrix2<f64>,

    /// `hessian[k][(i, j)]` = ∂²C_i/∂pp_j∂pp_k, i.e. ∂J/∂pp_k
    pub hessian: [Matrix2<f64>; 2],
}

// =================================================================================================
// Dissociation kernel
// =================================================================================================

/// Solubilities, hemoglobin capacity and Hill parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DissociationKernel {
    pub alpha_co2: f64,
    pub alpha_o2: f64,
    pub c_hb: f64,
    pub n_hill: f64,
    pub p50: f64,
}

impl DissociationKernel {
    pub fn new(alpha_co2: f64, alpha_o2: f64, c_hb: f64) -> Self {
        Self {
            alpha_co2,
            alpha_o2,
            c_hb,
            n_hill: DEFAULT_HILL_EXPONENT,
            p50: DEFAULT_P50,
        }
    }

    /// Builder pattern: set the Hill parameters.
    pub fn with_hill(mut self, n_hill: f64, p50: f64) -> Self {
        self.n_hill = n_hill;
        self.p50 = p50;
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        for (name, value) in [
            ("alpha_CO2", self.alpha_co2),
            ("alpha_O2", self.alpha_o2),
            ("c_Hb", self.c_hb),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(ModelError::invalid_parameter(
                    name,
                    format!("must be non-negative, got {}", value),
                ));
            }
        }
        if !(self.n_hill > 0.0) {
            return Err(ModelError::invalid_parameter(
                "n_hill",
                format!("must be positive, got {}", self.n_hill),
            ));
        }
        if !(self.p50 > 0.0) {
            return Err(ModelError::invalid_parameter(
                "P50_O2",
                format!("must be positive, got {}", self.p50),
            ));
        }
        Ok(())
    }

    // ── Hill saturation ──────────────────────────────────────────────────────

    /// S_O2(ppO2); zero for non-positive pressures.
    pub fn saturation_o2(&self, pp_o2: f64) -> f64 {
        if pp_o2 <= 0.0 {
            return 0.0;
        }
        let u = (pp_o2 / self.p50).powf(self.n_hill);
        u / (1.0 + u)
    }

    /// dS_O2/dppO2 = n·u / (p·(1 + u)²)
    pub fn saturation_o2_derivative(&self, pp_o2: f64) -> f64 {
        if pp_o2 <= 0.0 {
            return 0.0;
        }
        let n = self.n_hill;
        let u = (pp_o2 / self.p50).powf(n);
        n * u / (pp_o2 * (1.0 + u).powi(2))
    }

    /// d²S_O2/dppO2² = n·u·((n − 1) − (n + 1)·u) / (p²·(1 + u)³)
    pub fn saturation_o2_second_derivative(&self, pp_o2: f64) -> f64 {
        if pp_o2 <= 0.0 {
            return 0.0;
        }
        let n = self.n_hill;
        let u = (pp_o2 / self.p50).powf(n);
        n * u * ((n - 1.0) - (n + 1.0) * u) / (pp_o2 * pp_o2 * (1.0 + u).powi(3))
    }

    // ── Content laws ─────────────────────────────────────────────────────────

    pub fn blood_o2(&self, _pp_co2: f64, pp_o2: f64) -> f64 {
        self.alpha_o2 * pp_o2 + self.c_hb * self.saturation_o2(pp_o2)
    }

    pub fn blood_co2(&self, pp_co2: f64, _pp_o2: f64) -> f64 {
        self.alpha_co2 * pp_co2
    }

    pub fn tissue_o2(&self, pp_o2: f64) -> f64 {
        self.alpha_o2 * pp_o2
    }

    pub fn tissue_co2(&self, pp_co2: f64) -> f64 {
        self.alpha_co2 * pp_co2
    }

    /// Blood content and derivatives at `pp` = (ppCO2, ppO2).
    pub fn blood_content(&self, pp: &Vector2<f64>) -> BloodContent {
        let (pp_co2, pp_o2) = (pp[CO2], pp[O2]);

        let value = Vector2::new(self.blood_co2(pp_co2, pp_o2), self.blood_o2(pp_co2, pp_o2));

        let jacobian = Matrix2::new(
            self.alpha_co2, 0.0,
            0.0, self.alpha_o2 + self.c_hb * self.saturation_o2_derivative(pp_o2),
        );

        let mut d_jacobian_d_o2 = Matrix2::zeros();
        d_jacobian_d_o2[(O2, O2)] = self.c_hb * self.saturation_o2_second_derivative(pp_o2);

        BloodContent {
            value,
            jacobian,
            hessian: [Matrix2::zeros(), d_jacobian_d_o2],
        }
    }

    /// Tissue content (C_t,CO2, C_t,O2) at `pp`.
    pub fn tissue_content(&self, pp: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(self.tissue_co2(pp[CO2]), self.tissue_o2(pp[O2]))
    }

    /// ∂C_t/∂pp; constant because tissue storage is linear.
    pub fn tissue_jacobian(&self) -> Matrix2<f64> {
        Matrix2::new(self.alpha_co2, 0.0, 0.0, self.alpha_o2)
    }
}

// =================================================================================================
// Closed-form 2×2 algebra
// =================================================================================================

/// Inverse of a 2×2 matrix by cofactors.
pub fn invert_2x2(j: &Matrix2<f64>) -> Matrix2<f64> {
    let det = j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)];
    Matrix2::new(
        j[(1, 1)], -j[(0, 1)],
        -j[(1, 0)], j[(0, 0)],
    ) / det
}

/// Solve `J · dpp = rates` for `dpp`.
pub fn gas_solve(jacobian: &Matrix2<f64>, rates: &Vector2<f64>) -> Vector2<f64> {
    invert_2x2(jacobian) * rates
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kernel() -> DissociationKernel {
        DissociationKernel::new(0.226, 0.0103, 8.7)
    }

    #[test]
    fn test_half_saturation_at_p50() {
        let k = kernel();
        assert_relative_eq!(k.saturation_o2(k.p50), 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_zero_pressure_gives_zero_content() {
        let k = kernel();
        assert_eq!(k.blood_o2(5.0, 0.0), 0.0);
        assert_eq!(k.saturation_o2(-1.0), 0.0);
        assert_eq!(k.saturation_o2_derivative(0.0), 0.0);
    }

    #[test]
    fn test_saturation_derivatives_match_finite_differences() {
        let k = kernel();
        let h = 1e-6;
        for &p in &[0.5, 2.0, 3.57, 5.3, 13.0] {
            let fd1 = (k.saturation_o2(p + h) - k.saturation_o2(p - h)) / (2.0 * h);
            assert_relative_eq!(k.saturation_o2_derivative(p), fd1, max_relative = 1e-7);

            let fd2 =
                (k.saturation_o2_derivative(p + h) - k.saturation_o2_derivative(p - h)) / (2.0 * h);
            assert_relative_eq!(
                k.saturation_o2_second_derivative(p),
                fd2,
                max_relative = 1e-6,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_blood_content_jacobian() {
        let k = kernel();
        let pp = Vector2::new(6.0, 5.3);
        let content = k.blood_content(&pp);

        assert_relative_eq!(content.value[CO2], 0.226 * 6.0);
        assert_relative_eq!(content.value[O2], 0.0103 * 5.3 + 8.7 * k.saturation_o2(5.3));
        assert_eq!(content.jacobian[(CO2, O2)], 0.0);
        assert_eq!(content.jacobian[(O2, CO2)], 0.0);
        assert_eq!(content.hessian[CO2], Matrix2::zeros());
        assert_relative_eq!(
            content.hessian[O2][(O2, O2)],
            8.7 * k.saturation_o2_second_derivative(5.3)
        );
    }

    #[test]
    fn test_tissue_forms_are_linear() {
        let k = kernel();
        let pp = Vector2::new(2.0, 4.0);
        let c = k.tissue_content(&pp);
        assert_relative_eq!(c[CO2], 0.452);
        assert_relative_eq!(c[O2], 0.0412);
        assert_eq!(k.tissue_jacobian() * pp, c);
    }

    #[test]
    fn test_gas_solve_against_lu() {
        let j = Matrix2::new(2.0, 0.5, -0.25, 3.0);
        let rates = Vector2::new(1.0, -2.0);
        let closed_form = gas_solve(&j, &rates);
        let lu = j.lu().solve(&rates).unwrap();
        assert_relative_eq!(closed_form, lu, epsilon = 1e-14);
        assert_relative_eq!(invert_2x2(&j) * j, Matrix2::identity(), epsilon = 1e-14);
    }

    #[test]
    fn test_validation() {
        assert!(kernel().validate().is_ok());
        assert!(kernel().with_hill(0.0, 3.57).validate().is_err());
        assert!(kernel().with_hill(2.7, -1.0).validate().is_err());
        assert!(DissociationKernel::new(-0.1, 0.01, 8.7).validate().is_err());
    }
}
