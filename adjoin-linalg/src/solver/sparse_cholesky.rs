use std::marker::PhantomData;

use adjoin_core::{Error, Matrix, Result, Scalar};
use ndarray::{Array1, Array2, ArrayView2};
use sprs::{CsMat, FillInReduction, SymmetryCheck, TriMat};
use sprs_ldl::{Ldl, LdlNumeric};

use super::{check_rhs, check_square, unfactorized, Solve};

/// Sparse `LDLᵀ` factorization of a real symmetric definite matrix, backed by
/// `sprs_ldl` with a reverse Cuthill-McKee fill-in reducing ordering.
pub struct SparseCholesky<T> {
    factor: Option<(LdlNumeric<f64, usize>, usize)>,
    _scalar: PhantomData<T>,
}

impl<T> Default for SparseCholesky<T> {
    fn default() -> Self {
        Self {
            factor: None,
            _scalar: PhantomData,
        }
    }
}

impl<T> SparseCholesky<T>
where
    T: Scalar,
{
    fn solve_real(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let (factor, n) = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(*n, rhs)?;

        let mut x = Array2::zeros(rhs.dim());
        for (c, column) in rhs.columns().into_iter().enumerate() {
            let real: Vec<f64> = column.iter().map(|value| value.re()).collect();
            let solution = Array1::from(factor.solve(&real[..]));
            x.column_mut(c).assign(&solution.mapv(T::from_real));
        }
        Ok(x)
    }
}

impl<T> Solve<T> for SparseCholesky<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let n = check_square(matrix, "sparse Cholesky")?;
        if T::IS_COMPLEX {
            return Err(Error::configuration(
                "sparse Cholesky factorization supports real matrices only",
            ));
        }

        let mut triplets = TriMat::new((n, n));
        for (row, col, value) in matrix.entries() {
            triplets.add_triplet(row, col, value.re());
        }
        let real: CsMat<f64> = triplets.to_csc();

        let factor = Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(real.view())?;

        let d = factor.d();
        if let Some(index) = d.iter().position(|&di| di == 0.) {
            return Err(Error::SingularMatrix { index });
        }
        let positive = d.iter().filter(|&&di| di > 0.).count();
        if positive != 0 && positive != n {
            return Err(Error::numerical(
                "matrix is not definite, its LDLᵀ pivots change sign",
            ));
        }
        self.factor = Some((factor, n));
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.solve_real(rhs)
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        self.solve_real(rhs)
    }
}
