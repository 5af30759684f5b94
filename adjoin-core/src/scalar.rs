//! Scalar trait for matrix and vector element types.

use std::{
    fmt::{Debug, Display},
    ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign},
};

use faer_traits::ComplexField;
use ndarray::{ArrayD, Ix2, LinalgScalar, ScalarOperand};

use crate::{DyadCarrier, Matrix, Value};

/// Double precision complex number.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

/// Element types the solvers and nodes operate on: `f64` and [`c64`].
///
/// The trait extends faer's `ComplexField`, so the dense and sparse
/// factorizations run on it directly. It also knows how to move arrays of its
/// own type in and out of a [`Value`], which lets node code stay generic over
/// real and complex data.
pub trait Scalar:
    ComplexField
    + LinalgScalar
    + ScalarOperand
    + Debug
    + Display
    + Default
    + PartialEq
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + 'static
{
    /// Whether the type carries an imaginary part.
    const IS_COMPLEX: bool;

    /// Embeds a real number.
    fn from_real(re: f64) -> Self;

    /// Complex conjugate, identity for real numbers.
    fn conj(self) -> Self;

    /// Real part.
    fn re(self) -> f64;

    /// Imaginary part, zero for real numbers.
    fn im(self) -> f64;

    /// Absolute value (modulus).
    fn modulus(self) -> f64;

    /// Principal square root.
    fn sqrt(self) -> Self;

    /// Whether every component is finite.
    fn is_finite(self) -> bool;

    /// Extracts a dense array of this type, promoting real data when `Self` is complex.
    fn array_from_value(value: &Value) -> Option<ArrayD<Self>>;

    /// Wraps a dense array.
    fn array_into_value(array: ArrayD<Self>) -> Value;

    /// Extracts a two-dimensional matrix, dense or sparse.
    fn matrix_from_value(value: &Value) -> Option<Matrix<Self>>;

    /// Wraps a matrix.
    fn matrix_into_value(matrix: Matrix<Self>) -> Value;

    /// Wraps a dyadic gradient.
    fn dyad_into_value(dyad: DyadCarrier<Self>) -> Value;
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;

    fn from_real(re: f64) -> Self {
        re
    }

    fn conj(self) -> Self {
        self
    }

    fn re(self) -> f64 {
        self
    }

    fn im(self) -> f64 {
        0.
    }

    fn modulus(self) -> f64 {
        f64::abs(self)
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }

    fn array_from_value(value: &Value) -> Option<ArrayD<Self>> {
        match value {
            Value::Real(array) => Some(array.clone()),
            _ => None,
        }
    }

    fn array_into_value(array: ArrayD<Self>) -> Value {
        Value::Real(array)
    }

    fn matrix_from_value(value: &Value) -> Option<Matrix<Self>> {
        match value {
            Value::Real(array) if array.ndim() == 2 => array
                .clone()
                .into_dimensionality::<Ix2>()
                .ok()
                .map(Matrix::Dense),
            Value::SparseReal(matrix) => Some(Matrix::Sparse(matrix.clone())),
            _ => None,
        }
    }

    fn matrix_into_value(matrix: Matrix<Self>) -> Value {
        match matrix {
            Matrix::Dense(array) => Value::Real(array.into_dyn()),
            Matrix::Sparse(matrix) => Value::SparseReal(matrix),
        }
    }

    fn dyad_into_value(dyad: DyadCarrier<Self>) -> Value {
        Value::Dyad(dyad)
    }
}

impl Scalar for c64 {
    const IS_COMPLEX: bool = true;

    fn from_real(re: f64) -> Self {
        c64::new(re, 0.)
    }

    fn conj(self) -> Self {
        num_complex::Complex::conj(&self)
    }

    fn re(self) -> f64 {
        self.re
    }

    fn im(self) -> f64 {
        self.im
    }

    fn modulus(self) -> f64 {
        self.norm()
    }

    fn sqrt(self) -> Self {
        num_complex::Complex::sqrt(self)
    }

    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    fn array_from_value(value: &Value) -> Option<ArrayD<Self>> {
        match value {
            Value::Real(array) => Some(array.mapv(c64::from_real)),
            Value::Complex(array) => Some(array.clone()),
            _ => None,
        }
    }

    fn array_into_value(array: ArrayD<Self>) -> Value {
        Value::Complex(array)
    }

    fn matrix_from_value(value: &Value) -> Option<Matrix<Self>> {
        match value {
            Value::Real(_) | Value::SparseReal(_) => {
                f64::matrix_from_value(value).map(|matrix| matrix.map(c64::from_real))
            }
            Value::Complex(array) if array.ndim() == 2 => array
                .clone()
                .into_dimensionality::<Ix2>()
                .ok()
                .map(Matrix::Dense),
            Value::SparseComplex(matrix) => Some(Matrix::Sparse(matrix.clone())),
            _ => None,
        }
    }

    fn matrix_into_value(matrix: Matrix<Self>) -> Value {
        match matrix {
            Matrix::Dense(array) => Value::Complex(array.into_dyn()),
            Matrix::Sparse(matrix) => Value::SparseComplex(matrix),
        }
    }

    fn dyad_into_value(dyad: DyadCarrier<Self>) -> Value {
        Value::DyadComplex(dyad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_is_not_complex() {
        assert!(!<f64 as Scalar>::IS_COMPLEX);
        assert!(<c64 as Scalar>::IS_COMPLEX);
    }

    #[test]
    fn conjugation() {
        let z = c64::new(1., 2.);
        assert_eq!(Scalar::conj(z), c64::new(1., -2.));
        assert_eq!(Scalar::conj(3.0_f64), 3.);
    }

    #[test]
    fn promotion_from_value() {
        let value = Value::from(ndarray::arr1(&[1., 2.]));
        let promoted = c64::array_from_value(&value).unwrap();

        assert_eq!(promoted[[1]], c64::new(2., 0.));
        assert!(f64::array_from_value(&Value::from(ndarray::arr1(&[c64::new(1., 1.)]))).is_none());
    }
}
