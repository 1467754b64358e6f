//! Assembly into caller-owned global storage
//!
//! The 0D block is small and dense, but it usually lives inside a larger
//! sparse system (the 3D structure plus the 0D unknowns). Local rows and
//! columns are shifted by an offset, the first global id of the 0D block,
//! and summed into storage the caller owns.
//!
//! Storage is abstracted by [`GlobalMatrix`] and [`GlobalVector`]. A
//! process may own only a range of rows; summing into a row it does not own
//! is an assembly failure, never silently dropped.

use crate::error::{ModelError, ModelResult};
use crate::models::coupling::CouplingBlocks;
use crate::physics::Evaluation;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::ops::Range;

// =================================================================================================
// Storage traits
// =================================================================================================

/// Sparse matrix with sum-into semantics.
pub trait GlobalMatrix {
    fn owns_row(&self, row: usize) -> bool;

    /// Add `values[k]` at `(row, cols[k])`.
    ///
    /// # Errors
    ///
    /// `AssemblyFailed` when the row is not owned, a column is out of
    /// range, or `cols` repeats a column.
    fn sum_into(&mut self, row: usize, cols: &[usize], values: &[f64]) -> ModelResult<()>;
}

/// Vector with sum-into semantics.
pub trait GlobalVector {
    fn owns_row(&self, row: usize) -> bool;

    fn sum_into(&mut self, row: usize, value: f64) -> ModelResult<()>;
}

impl GlobalVector for DVector<f64> {
    fn owns_row(&self, row: usize) -> bool {
        row < self.len()
    }

    fn sum_into(&mut self, row: usize, value: f64) -> ModelResult<()> {
        if !GlobalVector::owns_row(self, row) {
            return Err(ModelError::AssemblyFailed { row });
        }
        self[row] += value;
        Ok(())
    }
}

// =================================================================================================
// Sparse implementation
// =================================================================================================

/// Triplet accumulator over an owned row range, converted to CSR once
/// assembly is complete.
#[derive(Debug, Clone)]
pub struct SparseAssembly {
    owned: Range<usize>,
    coo: CooMatrix<f64>,
}

impl SparseAssembly {
    /// Matrix owning all rows.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            owned: 0..nrows,
            coo: CooMatrix::new(nrows, ncols),
        }
    }

    /// Matrix owning only `owned` of its rows.
    pub fn with_owned_rows(nrows: usize, ncols: usize, owned: Range<usize>) -> Self {
        let end = owned.end.min(nrows);
        Self {
            owned: owned.start.min(end)..end,
            coo: CooMatrix::new(nrows, ncols),
        }
    }

    pub fn nrows(&self) -> usize {
        self.coo.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.coo.ncols()
    }

    /// Stored triplets, duplicates not yet summed.
    pub fn nnz(&self) -> usize {
        self.coo.nnz()
    }

    pub fn coo(&self) -> &CooMatrix<f64> {
        &self.coo
    }

    /// Compressed matrix with duplicate entries summed.
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        CsrMatrix::from(&self.coo)
    }
}

impl GlobalMatrix for SparseAssembly {
    fn owns_row(&self, row: usize) -> bool {
        self.owned.contains(&row)
    }

    fn sum_into(&mut self, row: usize, cols: &[usize], values: &[f64]) -> ModelResult<()> {
        if !self.owns_row(row) || cols.len() != values.len() {
            return Err(ModelError::AssemblyFailed { row });
        }
        for (k, &col) in cols.iter().enumerate() {
            if col >= self.ncols() || cols[..k].contains(&col) {
                return Err(ModelError::AssemblyFailed { row });
            }
        }
        for (&col, &value) in cols.iter().zip(values) {
            self.coo.push(row, col, value);
        }
        Ok(())
    }
}

// =================================================================================================
// Block assembly
// =================================================================================================

/// Sum an evaluation's W, `df_np` and `f_np` into global storage at
/// `offset`. Zero entries of W are skipped.
pub fn assemble_evaluation(
    evaluation: &Evaluation,
    offset: usize,
    matrix: &mut dyn GlobalMatrix,
    df: &mut dyn GlobalVector,
    f: &mut dyn GlobalVector,
) -> ModelResult<()> {
    let w = &evaluation.stiffness;
    let mut cols = Vec::with_capacity(w.ncols());
    let mut values = Vec::with_capacity(w.ncols());

    for i in 0..evaluation.dimension() {
        let row = offset + i;

        cols.clear();
        values.clear();
        for (j, &value) in w.row(i).iter().enumerate() {
            if value != 0.0 {
                cols.push(offset + j);
                values.push(value);
            }
        }
        if !cols.is_empty() {
            matrix.sum_into(row, &cols, &values)?;
        }

        df.sum_into(row, evaluation.df_np[i])?;
        f.sum_into(row, evaluation.f_np[i])?;
    }
    Ok(())
}

/// Sum the coupling blocks into global storage.
///
/// Structural rows and columns keep their numbering; 0D rows and columns
/// are shifted by `offset`.
pub fn assemble_coupling(
    blocks: &CouplingBlocks,
    offset: usize,
    d_cardio_d_disp: &mut dyn GlobalMatrix,
    d_struct_d_cardio: &mut dyn GlobalMatrix,
) -> ModelResult<()> {
    for (dof, col, value) in blocks.d_cardio_d_disp.triplet_iter() {
        d_cardio_d_disp.sum_into(dof, &[offset + col], &[*value])?;
    }
    for (row, dof, value) in blocks.d_struct_d_cardio.triplet_iter() {
        d_struct_d_cardio.sum_into(offset + row, &[dof], &[*value])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn entry(m: &CsrMatrix<f64>, i: usize, j: usize) -> f64 {
        m.get_entry(i, j).map(|e| e.into_value()).unwrap_or(0.0)
    }

    #[test]
    fn test_sum_into_accumulates() {
        let mut matrix = SparseAssembly::new(3, 3);
        matrix.sum_into(1, &[0, 2], &[1.0, 2.0]).unwrap();
        matrix.sum_into(1, &[2], &[0.5]).unwrap();

        let csr = matrix.to_csr();
        assert_relative_eq!(entry(&csr, 1, 0), 1.0);
        assert_relative_eq!(entry(&csr, 1, 2), 2.5);
        assert_eq!(matrix.nnz(), 3);
    }

    #[test]
    fn test_assembly_failures() {
        let mut matrix = SparseAssembly::with_owned_rows(10, 10, 5..10);
        assert!(matches!(
            matrix.sum_into(2, &[0], &[1.0]),
            Err(ModelError::AssemblyFailed { row: 2 })
        ));
        assert!(matrix.sum_into(6, &[3, 3], &[1.0, 1.0]).is_err());
        assert!(matrix.sum_into(6, &[10], &[1.0]).is_err());
        assert!(matrix.sum_into(6, &[1, 2], &[1.0]).is_err());
        assert!(matrix.sum_into(6, &[1, 2], &[1.0, 2.0]).is_ok());

        let mut v = DVector::<f64>::zeros(3);
        assert!(v.sum_into(3, 1.0).is_err());
    }

    #[test]
    fn test_evaluation_lands_at_offset() {
        let mut eval = Evaluation::zeros(2, DVector::zeros(2));
        eval.stiffness = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 3.0, 4.0]);
        eval.df_np = DVector::from_vec(vec![5.0, 6.0]);
        eval.f_np = DVector::from_vec(vec![7.0, 8.0]);

        let mut matrix = SparseAssembly::new(5, 5);
        let mut df = DVector::<f64>::zeros(5);
        let mut f = DVector::<f64>::zeros(5);
        assemble_evaluation(&eval, 3, &mut matrix, &mut df, &mut f).unwrap();

        let csr = matrix.to_csr();
        assert_relative_eq!(entry(&csr, 3, 3), 1.0);
        assert_relative_eq!(entry(&csr, 4, 3), 3.0);
        assert_relative_eq!(entry(&csr, 4, 4), 4.0);
        assert_eq!(matrix.nnz(), 3);
        assert_eq!(df, DVector::from_vec(vec![0.0, 0.0, 0.0, 5.0, 6.0]));
        assert_eq!(f[4], 8.0);

        // Offset beyond the storage
        let mut small = SparseAssembly::new(4, 4);
        let err = assemble_evaluation(&eval, 3, &mut small, &mut df, &mut f);
        assert!(matches!(err, Err(ModelError::AssemblyFailed { row: 4 })));
    }

    #[test]
    fn test_coupling_lands_at_offset() {
        let mut s = CooMatrix::new(2, 3);
        s.push(1, 2, -4.0);
        let mut s_adj = CooMatrix::new(3, 2);
        s_adj.push(2, 1, 2.0);
        let blocks = CouplingBlocks {
            d_cardio_d_disp: s,
            d_struct_d_cardio: s_adj,
            enclosed_volumes: DVector::zeros(3),
        };

        let mut upper = SparseAssembly::new(2, 13);
        let mut lower = SparseAssembly::new(13, 2);
        assemble_coupling(&blocks, 10, &mut upper, &mut lower).unwrap();
        assert_relative_eq!(entry(&upper.to_csr(), 1, 12), -4.0);
        assert_relative_eq!(entry(&lower.to_csr(), 12, 1), 2.0);
    }
}
