use adjoin_core::{Error, Matrix, Result, Scalar};
use faer::linalg::solvers::PartialPivLu;
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

use super::{
    check_rhs, check_square,
    faer_interop::{matrix_to_faer, solve_with},
    unfactorized, Solve,
};

/// Dense LU factorization with partial pivoting, `PA = LU`.
pub struct DenseLu<T> {
    factor: Option<PartialPivLu<T>>,
}

impl<T> Default for DenseLu<T> {
    fn default() -> Self {
        Self { factor: None }
    }
}

impl<T> Solve<T> for DenseLu<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let n = check_square(matrix, "LU")?;
        let lu = matrix_to_faer(matrix).as_ref().partial_piv_lu();

        let u = lu.U();
        if let Some(index) = (0..n).find(|&k| u[(k, k)].is_zero()) {
            return Err(Error::SingularMatrix { index });
        }
        self.factor = Some(lu);
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.U().nrows(), rhs)?;
        Ok(solve_with(factor, rhs, false))
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.U().nrows(), rhs)?;
        Ok(solve_with(factor, rhs, true))
    }
}
