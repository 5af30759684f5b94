use adjoin_core::{Error, Matrix, Result, Scalar};
use ndarray::{Array1, Array2, ArrayView2, Zip};
use num_traits::Zero;

use super::{check_rhs, check_square, unfactorized, Solve};

/// Solver for diagonal matrices. Off-diagonal entries are ignored.
pub struct Diagonal<T> {
    diagonal: Option<Array1<T>>,
}

impl<T> Default for Diagonal<T> {
    fn default() -> Self {
        Self { diagonal: None }
    }
}

impl<T> Diagonal<T>
where
    T: Scalar,
{
    fn divide(&self, rhs: &ArrayView2<T>, op: impl Fn(T) -> T) -> Result<Array2<T>> {
        let diagonal = self.diagonal.as_ref().ok_or_else(unfactorized)?;
        check_rhs(diagonal.len(), rhs)?;

        let mut x = rhs.to_owned();
        Zip::from(x.rows_mut())
            .and(diagonal)
            .for_each(|mut row, &d| {
                let d = op(d);
                row.mapv_inplace(|value| value / d)
            });
        Ok(x)
    }
}

impl<T> Solve<T> for Diagonal<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        check_square(matrix, "diagonal")?;
        let diagonal = matrix.diagonal();
        if let Some(index) = diagonal.iter().position(|d| d.is_zero()) {
            return Err(Error::SingularMatrix { index });
        }
        self.diagonal = Some(diagonal);
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.divide(rhs, |d| d)
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.divide(rhs, Scalar::conj)
    }
}
