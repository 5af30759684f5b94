use adjoin_core::{c64, DyadCarrier, Error, Matrix, Result, Scalar, Value};
use ndarray::{Array2, ArrayD, Axis, Ix2};
use tracing::warn;

/// Load cases of a vector or matrix value, one per column.
///
/// Vectors become a single column; the original rank is returned alongside
/// so results can be given the same layout.
pub(crate) fn columns<T>(value: &Value, what: &str) -> Result<(Array2<T>, usize)>
where
    T: Scalar,
{
    let array = T::array_from_value(value).ok_or_else(|| {
        Error::configuration(format!("{} must be a dense array, got a {}", what, value.kind()))
    })?;
    into_columns(array, what)
}

/// Splits a real or complex array into its real and imaginary columns.
pub(crate) fn split_columns(value: &Value, what: &str) -> Result<(Array2<f64>, Array2<f64>, usize)> {
    let (array, rank) = columns::<c64>(value, what)?;
    Ok((array.mapv(|z| z.re), array.mapv(|z| z.im), rank))
}

fn into_columns<T>(array: ArrayD<T>, what: &str) -> Result<(Array2<T>, usize)>
where
    T: Scalar,
{
    let rank = array.ndim();
    let columns = match rank {
        1 => array.insert_axis(Axis(1)).into_dimensionality::<Ix2>(),
        2 => array.into_dimensionality::<Ix2>(),
        _ => {
            return Err(Error::configuration(format!(
                "{} must be a vector or a matrix, got rank {}",
                what, rank
            )))
        }
    };
    columns
        .map(|columns| (columns, rank))
        .map_err(|error| Error::configuration(format!("{}: {}", what, error)))
}

/// Inverse of [`columns`].
pub(crate) fn from_columns<T>(columns: Array2<T>, rank: usize) -> ArrayD<T>
where
    T: Scalar,
{
    if rank == 1 {
        columns.index_axis_move(Axis(1), 0).into_dyn()
    } else {
        columns.into_dyn()
    }
}

/// Joins real and imaginary parts.
pub(crate) fn join(re: &Array2<f64>, im: &Array2<f64>) -> Array2<c64> {
    let mut joined = re.mapv(c64::from_real);
    joined.zip_mut_with(im, |z, &im| z.im = im);
    joined
}

/// Reads a matrix operand as `T`, promoting real matrices when `T` is complex.
pub(crate) fn matrix<T>(value: &Value, what: &str) -> Result<Matrix<T>>
where
    T: Scalar,
{
    T::matrix_from_value(value).ok_or_else(|| {
        Error::configuration(format!(
            "{} must be a dense or sparse matrix, got a {} of shape {:?}",
            what,
            value.kind(),
            value.shape()
        ))
    })
}

/// The gradient `Σ_c left[:, c] ⊗ conj(right[:, c])` of a matrix operand.
///
/// Sparse operands receive a dyadic gradient, dense ones a dense array. For
/// real operands only the real part is kept; a real sparse operand combined
/// with complex factors uses `Re(a ⊗ conj b) = Re a ⊗ Re b + Im a ⊗ Im b`.
pub(crate) fn outer_gradient<T>(
    left: &Array2<T>,
    right: &Array2<T>,
    real: bool,
    sparse: bool,
) -> Result<Value>
where
    T: Scalar,
{
    let shape = (left.nrows(), right.nrows());

    if real && T::IS_COMPLEX {
        if !sparse {
            let dense = left.dot(&right.t().mapv(Scalar::conj));
            return Ok(Value::Real(dense.mapv(Scalar::re).into_dyn()));
        }

        warn!(
            rows = shape.0,
            cols = shape.1,
            "complex factors for a real sparse matrix, splitting the dyads"
        );
        let mut dyad = DyadCarrier::new(shape);
        for (a, b) in left.axis_iter(Axis(1)).zip(right.axis_iter(Axis(1))) {
            dyad.push(a.mapv(Scalar::re), b.mapv(Scalar::re))?;
            dyad.push(a.mapv(Scalar::im), b.mapv(Scalar::im))?;
        }
        return Ok(Value::Dyad(dyad));
    }

    if sparse {
        let mut dyad = DyadCarrier::new(shape);
        for (a, b) in left.axis_iter(Axis(1)).zip(right.axis_iter(Axis(1))) {
            dyad.push(a.to_owned(), b.mapv(Scalar::conj))?;
        }
        Ok(T::dyad_into_value(dyad))
    } else {
        let dense = left.dot(&right.t().mapv(Scalar::conj));
        Ok(T::array_into_value(dense.into_dyn()))
    }
}

/// Gradient of a vector operand: `gradient`, or its real part when the operand is real.
pub(crate) fn operand_gradient<T>(gradient: Array2<T>, rank: usize, real: bool) -> Value
where
    T: Scalar,
{
    let gradient = from_columns(gradient, rank);
    if real {
        Value::Real(gradient.mapv(Scalar::re))
    } else {
        T::array_into_value(gradient)
    }
}

#[cfg(test)]
mod test;
