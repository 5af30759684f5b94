mod cholesky;
mod diagonal;
mod faer_interop;
mod ldl;
mod lu;
mod qr;
mod sparse_cholesky;
mod sparse_lu;
mod triangular;

pub use cholesky::DenseCholesky;
pub use diagonal::Diagonal;
pub use ldl::DenseLdl;
pub use lu::DenseLu;
pub use qr::DenseQr;
pub use sparse_cholesky::SparseCholesky;
pub use sparse_lu::SparseLu;
pub use triangular::Triangular;

use adjoin_core::{Error, Matrix, Result, Scalar};
use ndarray::{Array2, ArrayView2};

use crate::SolverKind;

/// Factorize-once, solve-many behavior shared by every solver family.
pub trait Solve<T>
where
    T: Scalar,
{
    /// Computes a reusable factorization of `matrix`.
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()>;

    /// Solves `A X = B`, one column of `rhs` per right-hand side.
    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>>;

    /// Solves `Aᴴ X = B`, which is `Aᵀ X = B` for real matrices.
    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>>;
}

/// The closed set of solver families.
///
/// The variant is chosen once, usually by [`classify`](crate::classify), and
/// every call is forwarded to the concrete solver.
pub enum LinearSolver<T> {
    Diagonal(Diagonal<T>),
    Triangular(Triangular<T>),
    DenseLu(DenseLu<T>),
    DenseCholesky(DenseCholesky<T>),
    DenseLdl(DenseLdl<T>),
    DenseQr(DenseQr<T>),
    SparseLu(SparseLu<T>),
    SparseCholesky(SparseCholesky<T>),
}

impl<T> LinearSolver<T>
where
    T: Scalar,
{
    /// Creates an unfactorized solver of the given family.
    pub fn new(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Diagonal => Self::Diagonal(Diagonal::default()),
            SolverKind::LowerTriangular => Self::Triangular(Triangular::lower()),
            SolverKind::UpperTriangular => Self::Triangular(Triangular::upper()),
            SolverKind::DenseLu => Self::DenseLu(DenseLu::default()),
            SolverKind::DenseCholesky => Self::DenseCholesky(DenseCholesky::default()),
            SolverKind::DenseLdl => Self::DenseLdl(DenseLdl::default()),
            SolverKind::DenseQr => Self::DenseQr(DenseQr::default()),
            SolverKind::SparseLu => Self::SparseLu(SparseLu::default()),
            SolverKind::SparseCholesky => Self::SparseCholesky(SparseCholesky::default()),
        }
    }

    /// The family of this solver.
    pub fn kind(&self) -> SolverKind {
        match self {
            Self::Diagonal(_) => SolverKind::Diagonal,
            Self::Triangular(solver) if solver.is_lower() => SolverKind::LowerTriangular,
            Self::Triangular(_) => SolverKind::UpperTriangular,
            Self::DenseLu(_) => SolverKind::DenseLu,
            Self::DenseCholesky(_) => SolverKind::DenseCholesky,
            Self::DenseLdl(_) => SolverKind::DenseLdl,
            Self::DenseQr(_) => SolverKind::DenseQr,
            Self::SparseLu(_) => SolverKind::SparseLu,
            Self::SparseCholesky(_) => SolverKind::SparseCholesky,
        }
    }

    fn inner(&self) -> &dyn Solve<T> {
        match self {
            Self::Diagonal(solver) => solver,
            Self::Triangular(solver) => solver,
            Self::DenseLu(solver) => solver,
            Self::DenseCholesky(solver) => solver,
            Self::DenseLdl(solver) => solver,
            Self::DenseQr(solver) => solver,
            Self::SparseLu(solver) => solver,
            Self::SparseCholesky(solver) => solver,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Solve<T> {
        match self {
            Self::Diagonal(solver) => solver,
            Self::Triangular(solver) => solver,
            Self::DenseLu(solver) => solver,
            Self::DenseCholesky(solver) => solver,
            Self::DenseLdl(solver) => solver,
            Self::DenseQr(solver) => solver,
            Self::SparseLu(solver) => solver,
            Self::SparseCholesky(solver) => solver,
        }
    }
}

impl<T> Solve<T> for LinearSolver<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        self.inner_mut().factorize(matrix)
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let x = self.inner().solve(rhs)?;
        check_finite(&x)?;
        Ok(x)
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let x = self.inner().adjoint_solve(rhs)?;
        check_finite(&x)?;
        Ok(x)
    }
}

fn unfactorized() -> Error {
    Error::configuration("solver used before factorization")
}

fn check_square<T: Scalar>(matrix: &Matrix<T>, family: &str) -> Result<usize> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(Error::UnsupportedMatrixShape {
            rows,
            cols,
            reason: format!("{} solver needs a square matrix", family),
        });
    }
    Ok(rows)
}

fn check_rhs<T>(expected: usize, rhs: &ArrayView2<T>) -> Result<()> {
    if rhs.nrows() != expected {
        return Err(Error::configuration(format!(
            "right-hand side has {} rows, expected {}",
            rhs.nrows(),
            expected
        )));
    }
    Ok(())
}

fn check_finite<T: Scalar>(x: &Array2<T>) -> Result<()> {
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, value)| !value.is_finite()) {
        return Err(Error::numerical(format!(
            "non-finite solution entry at ({}, {})",
            row, col
        )));
    }
    Ok(())
}
