use adjoin_core::{Matrix, Result, Scalar};
use faer::{linalg::solvers::Lblt, Side};
use ndarray::{Array2, ArrayView2};

use super::{
    check_rhs, check_square,
    faer_interop::{matrix_to_faer, solve_with},
    unfactorized, Solve,
};

struct Factor<T> {
    lblt: Lblt<T>,
    dimension: usize,
}

/// Hermitian indefinite factorization `P A Pᵀ = L B Lᴴ` with Bunch-Kaufman
/// pivoting, where `B` has 1x1 and 2x2 diagonal blocks.
///
/// Only the lower triangle of the matrix is read.
pub struct DenseLdl<T> {
    factor: Option<Factor<T>>,
}

impl<T> Default for DenseLdl<T> {
    fn default() -> Self {
        Self { factor: None }
    }
}

impl<T> Solve<T> for DenseLdl<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let dimension = check_square(matrix, "LDL")?;
        let lblt = matrix_to_faer(matrix).as_ref().lblt(Side::Lower);
        self.factor = Some(Factor { lblt, dimension });
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.dimension, rhs)?;
        Ok(solve_with(&factor.lblt, rhs, false))
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.solve(rhs)
    }
}
