//! Copies between ndarray storage and faer matrices.
//!
//! ndarray arrays are row-major by default and faer matrices are
//! column-major, so both directions copy element by element.

use adjoin_core::{Matrix, Scalar};
use faer::{linalg::solvers::Solve as FaerSolve, Mat, MatRef};
use ndarray::{Array2, ArrayView2};

pub(super) fn to_faer<T: Scalar>(array: &ArrayView2<T>) -> Mat<T> {
    Mat::from_fn(array.nrows(), array.ncols(), |i, j| array[[i, j]])
}

pub(super) fn matrix_to_faer<T: Scalar>(matrix: &Matrix<T>) -> Mat<T> {
    match matrix {
        Matrix::Dense(array) => to_faer(&array.view()),
        Matrix::Sparse(_) => to_faer(&matrix.to_dense().view()),
    }
}

pub(super) fn from_faer<T: Scalar>(mat: MatRef<'_, T>) -> Array2<T> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Runs a faer solve on a copy of `rhs`, `Aᴴ X = B` when `adjoint` is set.
pub(super) fn solve_with<T, S>(factor: &S, rhs: &ArrayView2<T>, adjoint: bool) -> Array2<T>
where
    T: Scalar,
    S: FaerSolve<T>,
{
    let mut x = to_faer(rhs);
    if adjoint {
        factor.solve_adjoint_in_place(&mut x);
    } else {
        factor.solve_in_place(&mut x);
    }
    from_faer(x.as_ref())
}
