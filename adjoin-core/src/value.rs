use ndarray::{arr0, Array, ArrayD, Dimension, IxDyn, Zip};
use sprs::{CsMat, TriMat};

use crate::{c64, DyadCarrier, Error, Matrix, Result, Scalar};

/// The content of a data node: its value or its gradient.
///
/// Gradients of complex quantities follow the convention
/// `df = Re Σ conj(g) dz`, so that the gradient of a real response with respect
/// to a real quantity is the ordinary derivative and the real part of any
/// complex gradient is the gradient with respect to a real input.
#[derive(Clone, Debug)]
pub enum Value {
    /// Dense real array of any rank, rank zero for scalars.
    Real(ArrayD<f64>),
    /// Dense complex array of any rank.
    Complex(ArrayD<c64>),
    /// Sparse real matrix.
    SparseReal(CsMat<f64>),
    /// Sparse complex matrix.
    SparseComplex(CsMat<c64>),
    /// Real sum of dyads, the gradient of a sparse matrix.
    Dyad(DyadCarrier<f64>),
    /// Complex sum of dyads.
    DyadComplex(DyadCarrier<c64>),
}

impl Value {
    /// Creates a rank zero real value.
    pub fn scalar(value: f64) -> Self {
        Self::Real(arr0(value).into_dyn())
    }

    /// Shape of the represented array or matrix.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Real(array) => array.shape().to_vec(),
            Self::Complex(array) => array.shape().to_vec(),
            Self::SparseReal(matrix) => vec![matrix.rows(), matrix.cols()],
            Self::SparseComplex(matrix) => vec![matrix.rows(), matrix.cols()],
            Self::Dyad(dyad) => vec![dyad.shape().0, dyad.shape().1],
            Self::DyadComplex(dyad) => vec![dyad.shape().0, dyad.shape().1],
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Real(_) => "real array",
            Self::Complex(_) => "complex array",
            Self::SparseReal(_) => "real sparse matrix",
            Self::SparseComplex(_) => "complex sparse matrix",
            Self::Dyad(_) => "real dyad",
            Self::DyadComplex(_) => "complex dyad",
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            Self::Complex(_) | Self::SparseComplex(_) | Self::DyadComplex(_)
        )
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::SparseReal(_) | Self::SparseComplex(_))
    }

    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Real(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ArrayD<c64>> {
        match self {
            Self::Complex(array) => Some(array),
            _ => None,
        }
    }

    /// Returns the single entry of a real value holding exactly one element.
    pub fn item(&self) -> Option<f64> {
        match self {
            Self::Real(array) if array.len() == 1 => array.iter().next().copied(),
            _ => None,
        }
    }

    /// Dense real array; complex variants contribute their real part.
    pub fn dense_real(&self) -> ArrayD<f64> {
        match self {
            Self::Real(array) => array.clone(),
            Self::Complex(array) => array.mapv(|z| z.re),
            Self::SparseReal(matrix) => Matrix::Sparse(matrix.clone()).to_dense().into_dyn(),
            Self::SparseComplex(matrix) => Matrix::Sparse(matrix.clone())
                .to_dense()
                .mapv(|z| z.re)
                .into_dyn(),
            Self::Dyad(dyad) => dyad.to_dense().into_dyn(),
            Self::DyadComplex(dyad) => dyad.to_dense().mapv(|z| z.re).into_dyn(),
        }
    }

    /// Dense complex array, promoting real variants.
    pub fn dense_complex(&self) -> ArrayD<c64> {
        match self {
            Self::Complex(array) => array.clone(),
            Self::SparseComplex(matrix) => Matrix::Sparse(matrix.clone()).to_dense().into_dyn(),
            Self::DyadComplex(dyad) => dyad.to_dense().into_dyn(),
            real => real.dense_real().mapv(c64::from_real),
        }
    }

    /// Real part, keeping the storage kind.
    pub fn real_part(&self) -> Value {
        match self {
            Self::Complex(array) => Self::Real(array.mapv(|z| z.re)),
            Self::SparseComplex(matrix) => {
                f64::matrix_into_value(Matrix::Sparse(matrix.clone()).map(|z| z.re))
            }
            Self::DyadComplex(dyad) => Self::Dyad(dyad.real_part()),
            real => real.clone(),
        }
    }

    /// Multiplies every entry by `factor`.
    pub fn scaled(&self, factor: f64) -> Value {
        match self {
            Self::Real(array) => Self::Real(array * factor),
            Self::Complex(array) => Self::Complex(array.mapv(|z| z * factor)),
            Self::SparseReal(matrix) => {
                Self::SparseReal(sparse_map(matrix, |value| value * factor))
            }
            Self::SparseComplex(matrix) => {
                Self::SparseComplex(sparse_map(matrix, |value| value * factor))
            }
            Self::Dyad(dyad) => Self::Dyad(dyad.scaled(factor)),
            Self::DyadComplex(dyad) => Self::DyadComplex(dyad.scaled(c64::from_real(factor))),
        }
    }

    /// Adds `other` into `self`.
    ///
    /// Shapes must agree, a mismatch is a configuration error. Real and complex
    /// data mix by promotion. Sparse and dyadic values keep their
    /// representation when added to their own kind; any other pairing, such as
    /// sparse with dense or sparse with a dyad, is densified.
    pub fn accumulate(&mut self, other: Value) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::configuration(format!(
                "cannot accumulate a {} of shape {:?} into a {} of shape {:?}",
                other.kind(),
                other.shape(),
                self.kind(),
                self.shape()
            )));
        }

        let current = std::mem::replace(self, Value::scalar(0.));
        *self = current.sum(other)?;
        Ok(())
    }

    fn sum(self, other: Value) -> Result<Value> {
        use Value::*;

        let value = match (self, other) {
            (Real(mut lhs), Real(rhs)) => {
                lhs += &rhs;
                Real(lhs)
            }
            (Complex(mut lhs), Complex(rhs)) => {
                lhs += &rhs;
                Complex(lhs)
            }
            (Complex(mut lhs), Real(rhs)) | (Real(rhs), Complex(mut lhs)) => {
                Zip::from(&mut lhs)
                    .and(&rhs)
                    .for_each(|lhs, &rhs| *lhs += c64::from_real(rhs));
                Complex(lhs)
            }
            (SparseReal(lhs), SparseReal(rhs)) => SparseReal(sparse_sum(&lhs, &rhs)),
            (SparseComplex(lhs), SparseComplex(rhs)) => SparseComplex(sparse_sum(&lhs, &rhs)),
            (SparseComplex(lhs), SparseReal(rhs)) | (SparseReal(rhs), SparseComplex(lhs)) => {
                SparseComplex(sparse_sum(&lhs, &sparse_map(&rhs, c64::from_real)))
            }
            (Dyad(mut lhs), Dyad(rhs)) => {
                lhs.extend(rhs)?;
                Dyad(lhs)
            }
            (DyadComplex(mut lhs), DyadComplex(rhs)) => {
                lhs.extend(rhs)?;
                DyadComplex(lhs)
            }
            (DyadComplex(mut lhs), Dyad(rhs)) | (Dyad(rhs), DyadComplex(mut lhs)) => {
                lhs.extend(rhs.map(c64::from_real))?;
                DyadComplex(lhs)
            }
            (lhs, rhs) if lhs.is_complex() || rhs.is_complex() => {
                Complex(lhs.dense_complex() + rhs.dense_complex())
            }
            (lhs, rhs) => Real(lhs.dense_real() + rhs.dense_real()),
        };
        Ok(value)
    }
}

fn sparse_map<A, B, F>(matrix: &CsMat<A>, f: F) -> CsMat<B>
where
    A: Scalar,
    B: Scalar,
    F: Fn(A) -> B,
{
    let mut triplets = TriMat::new((matrix.rows(), matrix.cols()));
    for (&value, (row, col)) in matrix.iter() {
        triplets.add_triplet(row, col, f(value));
    }
    triplets.to_csc()
}

fn sparse_sum<T>(lhs: &CsMat<T>, rhs: &CsMat<T>) -> CsMat<T>
where
    T: Scalar,
{
    let mut triplets = TriMat::new((lhs.rows(), lhs.cols()));
    for (&value, (row, col)) in lhs.iter().chain(rhs.iter()) {
        triplets.add_triplet(row, col, value);
    }
    triplets.to_csc()
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl<D> From<Array<f64, D>> for Value
where
    D: Dimension,
{
    fn from(array: Array<f64, D>) -> Self {
        Self::Real(array.into_dyn())
    }
}

impl<D> From<Array<c64, D>> for Value
where
    D: Dimension,
{
    fn from(array: Array<c64, D>) -> Self {
        Self::Complex(array.into_dyn())
    }
}

impl From<CsMat<f64>> for Value {
    fn from(matrix: CsMat<f64>) -> Self {
        Self::SparseReal(matrix)
    }
}

impl From<CsMat<c64>> for Value {
    fn from(matrix: CsMat<c64>) -> Self {
        Self::SparseComplex(matrix)
    }
}

impl From<Matrix<f64>> for Value {
    fn from(matrix: Matrix<f64>) -> Self {
        f64::matrix_into_value(matrix)
    }
}

impl From<Matrix<c64>> for Value {
    fn from(matrix: Matrix<c64>) -> Self {
        c64::matrix_into_value(matrix)
    }
}

impl From<DyadCarrier<f64>> for Value {
    fn from(dyad: DyadCarrier<f64>) -> Self {
        Self::Dyad(dyad)
    }
}

impl From<DyadCarrier<c64>> for Value {
    fn from(dyad: DyadCarrier<c64>) -> Self {
        Self::DyadComplex(dyad)
    }
}

/// Creates a zero-filled real value of the given shape.
pub fn zeros(shape: &[usize]) -> Value {
    Value::Real(ArrayD::zeros(IxDyn(shape)))
}

#[cfg(test)]
mod test;
