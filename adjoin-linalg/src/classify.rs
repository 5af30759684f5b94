use adjoin_core::{Error, Matrix, Result, Scalar};
use tracing::{debug, info};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::LinearSolver;

/// Structural facts about a matrix.
///
/// `Some(_)` overrides detection, `None` lets [`classify`] inspect the
/// entries. Triangularity of sparse matrices is never detected, only taken
/// from an override.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MatrixHints {
    pub diagonal: Option<bool>,
    pub lower_triangular: Option<bool>,
    pub upper_triangular: Option<bool>,
    pub hermitian: Option<bool>,
    pub symmetric: Option<bool>,
    pub positive_definite: Option<bool>,
    /// Accept non-square sparse matrices by densifying them for QR.
    pub dense_fallback: bool,
    /// Relative tolerance of the structure checks.
    pub tolerance: f64,
}

impl Default for MatrixHints {
    fn default() -> Self {
        Self {
            diagonal: None,
            lower_triangular: None,
            upper_triangular: None,
            hermitian: None,
            symmetric: None,
            positive_definite: None,
            dense_fallback: false,
            tolerance: 1e-12,
        }
    }
}

/// The solver families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum SolverKind {
    Diagonal,
    LowerTriangular,
    UpperTriangular,
    DenseLu,
    DenseCholesky,
    /// Hermitian indefinite `LBLᴴ`.
    DenseLdl,
    DenseQr,
    SparseLu,
    SparseCholesky,
}

impl SolverKind {
    /// The family to retry with when a Cholesky factorization finds the
    /// matrix indefinite.
    pub fn fallback(self) -> Option<SolverKind> {
        match self {
            Self::DenseCholesky => Some(Self::DenseLdl),
            Self::SparseCholesky => Some(Self::SparseLu),
            _ => None,
        }
    }
}

/// Picks the solver family for `matrix`.
///
/// The decision goes from the cheapest structure to the most general:
/// diagonal, triangular, Hermitian definite, Hermitian indefinite and finally
/// general square. Complex symmetric matrices that are not Hermitian go to LU.
/// Non-square matrices go to QR.
///
/// Definiteness is guessed from a diagonal of uniform sign unless
/// `positive_definite` is set. A wrong guess is caught by the Cholesky
/// factorization itself, see [`SolverKind::fallback`].
pub fn classify<T>(matrix: &Matrix<T>, hints: &MatrixHints) -> Result<SolverKind>
where
    T: Scalar,
{
    let (rows, cols) = matrix.shape();
    let sparse = matrix.is_sparse();
    let tolerance = hints.tolerance;

    if rows != cols {
        if sparse && !hints.dense_fallback {
            return Err(Error::UnsupportedMatrixShape {
                rows,
                cols,
                reason: "no sparse solver handles non-square matrices".to_string(),
            });
        }
        return Ok(SolverKind::DenseQr);
    }

    if hints.diagonal == Some(true)
        && (hints.lower_triangular == Some(false) || hints.upper_triangular == Some(false))
    {
        return Err(Error::InconsistentOverride(
            "a diagonal matrix is both lower and upper triangular".to_string(),
        ));
    }
    if hints
        .diagonal
        .unwrap_or_else(|| matrix.is_diagonal(tolerance))
    {
        return Ok(SolverKind::Diagonal);
    }
    if hints
        .lower_triangular
        .unwrap_or_else(|| !sparse && matrix.is_lower_triangular(tolerance))
    {
        return Ok(SolverKind::LowerTriangular);
    }
    if hints
        .upper_triangular
        .unwrap_or_else(|| !sparse && matrix.is_upper_triangular(tolerance))
    {
        return Ok(SolverKind::UpperTriangular);
    }

    let (hermitian, symmetric) = symmetry(matrix, hints)?;
    if hints.positive_definite == Some(true) && !hermitian {
        return Err(Error::InconsistentOverride(
            "a positive definite matrix must be Hermitian".to_string(),
        ));
    }
    let definite = hints
        .positive_definite
        .unwrap_or_else(|| hermitian && uniform_diagonal_sign(matrix));
    debug!(hermitian, symmetric, definite, "matrix structure");

    let kind = if sparse {
        if hermitian && definite && !T::IS_COMPLEX {
            SolverKind::SparseCholesky
        } else {
            SolverKind::SparseLu
        }
    } else if hermitian && definite {
        SolverKind::DenseCholesky
    } else if hermitian {
        SolverKind::DenseLdl
    } else {
        SolverKind::DenseLu
    };
    Ok(kind)
}

/// Classifies `matrix` and returns an unfactorized solver of that family.
pub fn auto_solver<T>(matrix: &Matrix<T>, hints: &MatrixHints) -> Result<LinearSolver<T>>
where
    T: Scalar,
{
    let kind = classify(matrix, hints)?;
    let (rows, cols) = matrix.shape();
    info!(
        ?kind,
        rows,
        cols,
        sparse = matrix.is_sparse(),
        complex = T::IS_COMPLEX,
        "selected linear solver"
    );
    let mut solver = LinearSolver::new(kind);
    if let LinearSolver::Triangular(triangular) = &mut solver {
        triangular.set_tolerance(hints.tolerance);
    }
    Ok(solver)
}

fn symmetry<T>(matrix: &Matrix<T>, hints: &MatrixHints) -> Result<(bool, bool)>
where
    T: Scalar,
{
    let tolerance = hints.tolerance;
    if T::IS_COMPLEX {
        let hermitian = hints
            .hermitian
            .unwrap_or_else(|| matrix.is_hermitian(tolerance));
        let symmetric = hints
            .symmetric
            .unwrap_or_else(|| matrix.is_symmetric(tolerance));
        return Ok((hermitian, symmetric));
    }

    // Real matrices are Hermitian exactly when they are symmetric.
    let flag = match (hints.hermitian, hints.symmetric) {
        (Some(hermitian), Some(symmetric)) if hermitian != symmetric => {
            return Err(Error::InconsistentOverride(
                "hermitian and symmetric overrides disagree for a real matrix".to_string(),
            ));
        }
        (Some(flag), _) | (None, Some(flag)) => flag,
        (None, None) => matrix.is_symmetric(tolerance),
    };
    Ok((flag, flag))
}

fn uniform_diagonal_sign<T>(matrix: &Matrix<T>) -> bool
where
    T: Scalar,
{
    let diagonal = matrix.diagonal();
    diagonal.iter().all(|d| d.re() > 0.) || diagonal.iter().all(|d| d.re() < 0.)
}
