use adjoin_core::{Error, Matrix, Result, Scalar};
use faer::sparse::{linalg::solvers::Lu, SparseColMat, Triplet};
use ndarray::{Array2, ArrayView2};

use super::{check_rhs, check_square, faer_interop::solve_with, unfactorized, Solve};

struct Factor<T> {
    lu: Lu<usize, T>,
    dimension: usize,
}

/// Sparse LU factorization with a fill-reducing column ordering and partial
/// pivoting, computed by faer.
pub struct SparseLu<T> {
    factor: Option<Factor<T>>,
}

impl<T> Default for SparseLu<T> {
    fn default() -> Self {
        Self { factor: None }
    }
}

impl<T> Solve<T> for SparseLu<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let dimension = check_square(matrix, "sparse LU")?;
        let triplets: Vec<Triplet<usize, usize, T>> = matrix
            .entries()
            .into_iter()
            .map(|(row, col, value)| Triplet::new(row, col, value))
            .collect();
        let csc = SparseColMat::<usize, T>::try_new_from_triplets(dimension, dimension, &triplets)
            .map_err(|error| Error::configuration(format!("invalid sparse matrix: {:?}", error)))?;

        let lu = csc
            .as_ref()
            .sp_lu()
            .map_err(|error| Error::numerical(format!("sparse LU failed: {:?}", error)))?;
        self.factor = Some(Factor { lu, dimension });
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.dimension, rhs)?;
        Ok(solve_with(&factor.lu, rhs, false))
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.dimension, rhs)?;
        Ok(solve_with(&factor.lu, rhs, true))
    }
}
