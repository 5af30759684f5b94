use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView2};
use num_traits::Zero;
use sprs::{CsMat, TriMat};

use crate::{Error, Result, Scalar};

/// A two-dimensional operator, stored either densely or in compressed sparse form.
#[derive(Clone, Debug)]
pub enum Matrix<T> {
    Dense(Array2<T>),
    Sparse(CsMat<T>),
}

impl<T> Matrix<T>
where
    T: Scalar,
{
    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(array) => array.dim(),
            Self::Sparse(matrix) => (matrix.rows(), matrix.cols()),
        }
    }

    pub fn rows(&self) -> usize {
        self.shape().0
    }

    pub fn cols(&self) -> usize {
        self.shape().1
    }

    pub fn is_square(&self) -> bool {
        let (rows, cols) = self.shape();
        rows == cols
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Explicitly stored entries as `(row, col, value)` triplets.
    ///
    /// Dense matrices report their non-zero entries.
    pub fn entries(&self) -> Vec<(usize, usize, T)> {
        match self {
            Self::Dense(array) => array
                .indexed_iter()
                .filter(|(_, value)| !value.is_zero())
                .map(|((row, col), &value)| (row, col, value))
                .collect(),
            Self::Sparse(matrix) => matrix
                .iter()
                .map(|(&value, (row, col))| (row, col, value))
                .collect(),
        }
    }

    /// Applies `f` to every stored entry.
    pub fn map<U, F>(&self, f: F) -> Matrix<U>
    where
        U: Scalar,
        F: Fn(T) -> U,
    {
        match self {
            Self::Dense(array) => Matrix::Dense(array.mapv(f)),
            Self::Sparse(matrix) => {
                let mut triplets = TriMat::new((matrix.rows(), matrix.cols()));
                for (&value, (row, col)) in matrix.iter() {
                    triplets.add_triplet(row, col, f(value));
                }
                Matrix::Sparse(triplets.to_csc())
            }
        }
    }

    /// Converts to a dense array.
    pub fn to_dense(&self) -> Array2<T> {
        match self {
            Self::Dense(array) => array.clone(),
            Self::Sparse(matrix) => {
                let mut dense = Array2::zeros((matrix.rows(), matrix.cols()));
                for (&value, (row, col)) in matrix.iter() {
                    dense[[row, col]] += value;
                }
                dense
            }
        }
    }

    /// Main diagonal, zero where nothing is stored.
    pub fn diagonal(&self) -> Array1<T> {
        match self {
            Self::Dense(array) => array.diag().to_owned(),
            Self::Sparse(matrix) => {
                let mut diagonal = Array1::zeros(matrix.rows().min(matrix.cols()));
                for (&value, (row, col)) in matrix.iter() {
                    if row == col {
                        diagonal[row] += value;
                    }
                }
                diagonal
            }
        }
    }

    /// Largest entry modulus.
    pub fn max_abs(&self) -> f64 {
        let fold = |acc: f64, value: &T| acc.max(value.modulus());
        match self {
            Self::Dense(array) => array.iter().fold(0., fold),
            Self::Sparse(matrix) => matrix.data().iter().fold(0., fold),
        }
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64 {
        let fold = |acc: f64, value: &T| acc + value.modulus().powi(2);
        match self {
            Self::Dense(array) => array.iter().fold(0., fold).sqrt(),
            Self::Sparse(matrix) => matrix.data().iter().fold(0., fold).sqrt(),
        }
    }

    /// Whether every off-diagonal entry vanishes.
    ///
    /// `tolerance` is relative to the largest entry.
    pub fn is_diagonal(&self, tolerance: f64) -> bool {
        let bound = tolerance * self.max_abs();
        self.entries()
            .iter()
            .all(|&(row, col, value)| row == col || value.modulus() <= bound)
    }

    /// Whether every entry above the diagonal vanishes.
    pub fn is_lower_triangular(&self, tolerance: f64) -> bool {
        let bound = tolerance * self.max_abs();
        self.entries()
            .iter()
            .all(|&(row, col, value)| col <= row || value.modulus() <= bound)
    }

    /// Whether every entry below the diagonal vanishes.
    pub fn is_upper_triangular(&self, tolerance: f64) -> bool {
        let bound = tolerance * self.max_abs();
        self.entries()
            .iter()
            .all(|&(row, col, value)| col >= row || value.modulus() <= bound)
    }

    /// Whether `A = Aᵀ` within tolerance.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.is_self_adjoint(tolerance, |value| value)
    }

    /// Whether `A = Aᴴ` within tolerance.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        self.is_self_adjoint(tolerance, Scalar::conj)
    }

    fn is_self_adjoint(&self, tolerance: f64, op: impl Fn(T) -> T) -> bool {
        if !self.is_square() {
            return false;
        }
        let bound = tolerance * self.max_abs();
        match self {
            Self::Dense(array) => {
                let n = array.nrows();
                (0..n).all(|i| {
                    (i..n).all(|j| (array[[i, j]] - op(array[[j, i]])).modulus() <= bound)
                })
            }
            Self::Sparse(_) => {
                let mut entries = BTreeMap::new();
                for (row, col, value) in self.entries() {
                    *entries.entry((row, col)).or_insert_with(T::zero) += value;
                }
                entries.iter().all(|(&(row, col), &value)| {
                    let mirrored = entries.get(&(col, row)).copied().unwrap_or_else(T::zero);
                    (value - op(mirrored)).modulus() <= bound
                })
            }
        }
    }

    /// Computes `A X`.
    pub fn dot(&self, x: &ArrayView2<T>) -> Result<Array2<T>> {
        let (rows, cols) = self.shape();
        check_operand(cols, x)?;
        match self {
            Self::Dense(array) => Ok(array.dot(x)),
            Self::Sparse(matrix) => {
                let mut out = Array2::zeros((rows, x.ncols()));
                for (&value, (row, col)) in matrix.iter() {
                    out.row_mut(row).scaled_add(value, &x.row(col));
                }
                Ok(out)
            }
        }
    }

    /// Computes `Aᴴ X`.
    pub fn adjoint_dot(&self, x: &ArrayView2<T>) -> Result<Array2<T>> {
        let (rows, cols) = self.shape();
        check_operand(rows, x)?;
        match self {
            Self::Dense(array) => Ok(array.t().mapv(Scalar::conj).dot(x)),
            Self::Sparse(matrix) => {
                let mut out = Array2::zeros((cols, x.ncols()));
                for (&value, (row, col)) in matrix.iter() {
                    out.row_mut(col).scaled_add(value.conj(), &x.row(row));
                }
                Ok(out)
            }
        }
    }

    /// Extracts the block selected by `rows` and `cols`, keeping the storage kind.
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Matrix<T>> {
        let (nrows, ncols) = self.shape();
        if rows.iter().any(|&row| row >= nrows) || cols.iter().any(|&col| col >= ncols) {
            return Err(Error::configuration(format!(
                "submatrix indices out of bounds for a {}x{} matrix",
                nrows, ncols
            )));
        }
        match self {
            Self::Dense(array) => Ok(Matrix::Dense(Array2::from_shape_fn(
                (rows.len(), cols.len()),
                |(i, j)| array[[rows[i], cols[j]]],
            ))),
            Self::Sparse(matrix) => {
                let row_map = position_map(rows, nrows);
                let col_map = position_map(cols, ncols);
                let mut triplets = TriMat::new((rows.len(), cols.len()));
                for (&value, (row, col)) in matrix.iter() {
                    if let (Some(i), Some(j)) = (row_map[row], col_map[col]) {
                        triplets.add_triplet(i, j, value);
                    }
                }
                Ok(Matrix::Sparse(triplets.to_csc()))
            }
        }
    }

    /// Whether `other` holds the same values with the same storage.
    pub fn same_as(&self, other: &Matrix<T>) -> bool {
        match (self, other) {
            (Self::Dense(lhs), Self::Dense(rhs)) => lhs == rhs,
            (Self::Sparse(lhs), Self::Sparse(rhs)) => {
                lhs.shape() == rhs.shape()
                    && lhs.is_csc() == rhs.is_csc()
                    && lhs.nnz() == rhs.nnz()
                    && lhs.iter().eq(rhs.iter())
            }
            _ => false,
        }
    }
}

fn check_operand<T>(expected: usize, x: &ArrayView2<T>) -> Result<()> {
    if x.nrows() != expected {
        return Err(Error::configuration(format!(
            "operand has {} rows, expected {}",
            x.nrows(),
            expected
        )));
    }
    Ok(())
}

/// Maps original indices to their position in `selection`.
fn position_map(selection: &[usize], len: usize) -> Vec<Option<usize>> {
    let mut map = vec![None; len];
    for (position, &index) in selection.iter().enumerate() {
        map[index] = Some(position);
    }
    map
}

#[cfg(test)]
mod test;
