use adjoin_core::{Error, Matrix, Result, Scalar};
use faer::{
    linalg::{
        solvers::Qr,
        triangular_solve::{solve_lower_triangular_in_place, solve_upper_triangular_in_place},
    },
    Mat, Par,
};
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

use super::{
    check_rhs,
    faer_interop::{from_faer, to_faer},
    unfactorized, Solve,
};

struct Factor<T> {
    // Thin factors of `A` (or of `Aᴴ` when `A` is wide).
    q: Mat<T>,
    r: Mat<T>,
    transposed: bool,
    shape: (usize, usize),
}

/// Householder QR factorization.
///
/// Tall matrices are solved in the least squares sense and wide matrices
/// with the minimum norm solution; the adjoint solve does the converse.
pub struct DenseQr<T> {
    factor: Option<Factor<T>>,
}

impl<T> Default for DenseQr<T> {
    fn default() -> Self {
        Self { factor: None }
    }
}

impl<T> Factor<T>
where
    T: Scalar,
{
    // x = R⁻¹ Qᴴ b
    fn least_squares(&self, rhs: &ArrayView2<T>) -> Array2<T> {
        let b = to_faer(rhs);
        let mut x: Mat<T> = self.q.as_ref().adjoint() * b.as_ref();
        solve_upper_triangular_in_place(self.r.as_ref(), x.as_mut(), Par::Seq);
        from_faer(x.as_ref())
    }

    // x = Q R⁻ᴴ b
    fn minimum_norm(&self, rhs: &ArrayView2<T>) -> Array2<T> {
        let mut z = to_faer(rhs);
        solve_lower_triangular_in_place(self.r.as_ref().adjoint(), z.as_mut(), Par::Seq);
        let x: Mat<T> = self.q.as_ref() * z.as_ref();
        from_faer(x.as_ref())
    }
}

impl<T> Solve<T> for DenseQr<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let shape = matrix.shape();
        let dense = matrix.to_dense();
        let transposed = shape.0 < shape.1;
        let target = if transposed {
            dense.t().mapv(Scalar::conj)
        } else {
            dense
        };

        let qr = Qr::new(to_faer(&target.view()).as_ref());
        let r = qr.thin_R().to_owned();
        if let Some(index) = (0..r.ncols()).find(|&k| r[(k, k)].is_zero()) {
            return Err(Error::SingularMatrix { index });
        }
        self.factor = Some(Factor {
            q: qr.compute_thin_Q(),
            r,
            transposed,
            shape,
        });
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.shape.0, rhs)?;
        Ok(if factor.transposed {
            factor.minimum_norm(rhs)
        } else {
            factor.least_squares(rhs)
        })
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.shape.1, rhs)?;
        Ok(if factor.transposed {
            factor.least_squares(rhs)
        } else {
            factor.minimum_norm(rhs)
        })
    }
}
