use adjoin_core::{Error, Matrix, Result, Scalar};
use faer::{linalg::solvers::Llt, Side};
use ndarray::{Array2, ArrayView2};

use super::{
    check_rhs, check_square,
    faer_interop::{solve_with, to_faer},
    unfactorized, Solve,
};

struct Factor<T> {
    llt: Llt<T>,
    // -1 for negative definite matrices, factorized as -A = L Lᴴ.
    sign: f64,
    dimension: usize,
}

/// Dense Cholesky factorization of a Hermitian definite matrix.
///
/// Negative definite matrices are handled by factorizing `-A`.
pub struct DenseCholesky<T> {
    factor: Option<Factor<T>>,
}

impl<T> Default for DenseCholesky<T> {
    fn default() -> Self {
        Self { factor: None }
    }
}

impl<T> Solve<T> for DenseCholesky<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let dimension = check_square(matrix, "Cholesky")?;
        let mut a = matrix.to_dense();
        let sign = if dimension > 0 && a[[0, 0]].re() < 0. {
            -1.
        } else {
            1.
        };
        if sign < 0. {
            a.mapv_inplace(|value| -value);
        }

        let llt = to_faer(&a.view())
            .as_ref()
            .llt(Side::Lower)
            .map_err(|error| Error::numerical(format!("matrix is not definite: {:?}", error)))?;
        self.factor = Some(Factor {
            llt,
            sign,
            dimension,
        });
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.dimension, rhs)?;
        let x = solve_with(&factor.llt, rhs, false);
        Ok(x.mapv(|value| value * T::from_real(factor.sign)))
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.solve(rhs)
    }
}
