use adjoin_core::{Error, Matrix, Result, Scalar};
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

use super::{check_rhs, check_square, unfactorized, Solve};

// Same default as the structure checks of `MatrixHints`.
const DEFAULT_TOLERANCE: f64 = 1e-12;

struct Factor<T> {
    diagonal: Vec<T>,
    // Strictly triangular entries, grouped by row.
    rows: Vec<Vec<(usize, T)>>,
}

/// Forward or backward substitution on a lower or upper triangular matrix.
///
/// Works on dense and sparse storage alike; only the stored entries are
/// visited. Entries on the wrong side of the diagonal are dropped when their
/// modulus is at most `tolerance` times the largest entry, and rejected
/// otherwise.
pub struct Triangular<T> {
    lower: bool,
    tolerance: f64,
    factor: Option<Factor<T>>,
}

impl<T> Triangular<T>
where
    T: Scalar,
{
    pub fn lower() -> Self {
        Self {
            lower: true,
            tolerance: DEFAULT_TOLERANCE,
            factor: None,
        }
    }

    pub fn upper() -> Self {
        Self {
            lower: false,
            tolerance: DEFAULT_TOLERANCE,
            factor: None,
        }
    }

    /// Relative size below which entries outside the triangle are ignored.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    pub fn is_lower(&self) -> bool {
        self.lower
    }

    /// Row-oriented substitution on the stored triangle.
    fn substitute(&self, factor: &Factor<T>, x: &mut Array2<T>) {
        let n = factor.diagonal.len();
        let order: Box<dyn Iterator<Item = usize>> = if self.lower {
            Box::new(0..n)
        } else {
            Box::new((0..n).rev())
        };
        for i in order {
            for &(j, value) in &factor.rows[i] {
                for c in 0..x.ncols() {
                    let xj = x[[j, c]];
                    x[[i, c]] -= value * xj;
                }
            }
            let d = factor.diagonal[i];
            x.row_mut(i).mapv_inplace(|value| value / d);
        }
    }

    /// Column-oriented substitution on the conjugate transpose.
    fn substitute_adjoint(&self, factor: &Factor<T>, x: &mut Array2<T>) {
        let n = factor.diagonal.len();
        let order: Box<dyn Iterator<Item = usize>> = if self.lower {
            Box::new((0..n).rev())
        } else {
            Box::new(0..n)
        };
        for j in order {
            let d = factor.diagonal[j].conj();
            x.row_mut(j).mapv_inplace(|value| value / d);
            for &(i, value) in &factor.rows[j] {
                let value = value.conj();
                for c in 0..x.ncols() {
                    let xj = x[[j, c]];
                    x[[i, c]] -= value * xj;
                }
            }
        }
    }
}

impl<T> Solve<T> for Triangular<T>
where
    T: Scalar,
{
    fn factorize(&mut self, matrix: &Matrix<T>) -> Result<()> {
        let n = check_square(matrix, "triangular")?;
        let mut diagonal = vec![T::zero(); n];
        let mut rows = vec![Vec::new(); n];
        let bound = self.tolerance * matrix.max_abs();

        for (row, col, value) in matrix.entries() {
            if row == col {
                diagonal[row] += value;
            } else if (col < row) == self.lower {
                rows[row].push((col, value));
            } else if value.modulus() > bound {
                return Err(Error::configuration(format!(
                    "entry ({}, {}) lies outside the {} triangle",
                    row,
                    col,
                    if self.lower { "lower" } else { "upper" }
                )));
            }
        }
        if let Some(index) = diagonal.iter().position(|d| d.is_zero()) {
            return Err(Error::SingularMatrix { index });
        }

        self.factor = Some(Factor { diagonal, rows });
        Ok(())
    }

    fn solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.diagonal.len(), rhs)?;
        let mut x = rhs.to_owned();
        self.substitute(factor, &mut x);
        Ok(x)
    }

    fn adjoint_solve(&self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let factor = self.factor.as_ref().ok_or_else(unfactorized)?;
        check_rhs(factor.diagonal.len(), rhs)?;
        let mut x = rhs.to_owned();
        self.substitute_adjoint(factor, &mut x);
        Ok(x)
    }
}
