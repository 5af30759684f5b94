use std::error::Error;

use adjoin_core::{c64, Value};
use ndarray::{arr1, arr2};

use super::{columns, from_columns, join, outer_gradient, split_columns};

#[test]
fn vectors_become_one_column() -> Result<(), Box<dyn Error>> {
    let value = Value::from(arr1(&[1., 2., 3.]));
    let (array, rank) = columns::<f64>(&value, "rhs")?;

    assert_eq!(rank, 1);
    assert_eq!(array.dim(), (3, 1));
    assert_eq!(from_columns(array, rank), arr1(&[1., 2., 3.]).into_dyn());
    Ok(())
}

#[test]
fn scalars_are_rejected() {
    assert!(columns::<f64>(&Value::scalar(1.), "rhs").is_err());
    assert!(columns::<f64>(&Value::from(arr1(&[c64::new(1., 1.)])), "rhs").is_err());
}

#[test]
fn split_and_join() -> Result<(), Box<dyn Error>> {
    let value = Value::from(arr2(&[[c64::new(1., 2.)], [c64::new(3., -4.)]]));
    let (re, im, rank) = split_columns(&value, "rhs")?;

    assert_eq!(rank, 2);
    assert_eq!(re, arr2(&[[1.], [3.]]));
    assert_eq!(im, arr2(&[[2.], [-4.]]));
    assert_eq!(Value::from(join(&re, &im)).dense_complex(), value.dense_complex());
    Ok(())
}

#[test]
fn split_dyads_equal_the_dense_real_part() -> Result<(), Box<dyn Error>> {
    let a = arr2(&[[c64::new(1., 2.)], [c64::new(0., -1.)]]);
    let b = arr2(&[[c64::new(3., 1.)], [c64::new(-2., 0.5)]]);

    let dense = outer_gradient(&a, &b, true, false)?;
    let split = outer_gradient(&a, &b, true, true)?;

    assert!(matches!(split, Value::Dyad(ref dyad) if dyad.len() == 2));
    assert_eq!(split.dense_real(), dense.dense_real());
    // (1 + 2i) * conj(3 + i) = 5 + 5i
    assert_eq!(dense.dense_real()[[0, 0]], 5.);
    Ok(())
}

#[test]
fn complex_sparse_gradients_stay_dyadic() -> Result<(), Box<dyn Error>> {
    let a = arr2(&[[c64::new(1., 1.)], [c64::new(2., 0.)]]);
    let gradient = outer_gradient(&a, &a, false, true)?;

    assert!(matches!(gradient, Value::DyadComplex(_)));
    assert_eq!(gradient.dense_complex()[[0, 0]], c64::new(2., 0.));
    Ok(())
}
