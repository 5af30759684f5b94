use std::error::Error;

use ndarray::{arr1, array};
use sprs::{CsMat, TriMat};

use super::Value;
use crate::{c64, DyadCarrier};

#[test]
fn real_accumulation() -> Result<(), Box<dyn Error>> {
    let mut gradient = Value::from(arr1(&[1., 2.]));
    gradient.accumulate(Value::from(arr1(&[0.5, 0.5])))?;
    gradient.accumulate(Value::from(arr1(&[0.5, 0.5])))?;

    assert_eq!(gradient.as_real().unwrap(), &arr1(&[2., 3.]).into_dyn());
    Ok(())
}

#[test]
fn shape_mismatch_is_a_configuration_error() {
    let mut gradient = Value::from(arr1(&[1., 2.]));
    let error = gradient.accumulate(Value::from(arr1(&[1.]))).unwrap_err();

    assert!(matches!(error, crate::Error::Configuration(_)));
    assert_eq!(gradient.shape(), vec![2]);
}

#[test]
fn complex_promotion() -> Result<(), Box<dyn Error>> {
    let mut gradient = Value::from(arr1(&[1., 2.]));
    gradient.accumulate(Value::from(arr1(&[c64::new(0., 1.), c64::new(1., -1.)])))?;

    assert!(gradient.is_complex());
    assert_eq!(
        gradient.as_complex().unwrap(),
        &arr1(&[c64::new(1., 1.), c64::new(3., -1.)]).into_dyn()
    );
    assert_eq!(gradient.real_part().as_real().unwrap(), &arr1(&[1., 3.]).into_dyn());
    Ok(())
}

#[test]
fn dyads_concatenate() -> Result<(), Box<dyn Error>> {
    let mut gradient = Value::from(DyadCarrier::from_pair(arr1(&[1., 0.]), arr1(&[1., 1.])));
    gradient.accumulate(Value::from(DyadCarrier::from_pair(
        arr1(&[0., 1.]),
        arr1(&[2., 2.]),
    )))?;

    match &gradient {
        Value::Dyad(dyad) => {
            assert_eq!(dyad.len(), 2);
            assert_eq!(dyad.to_dense(), array![[1., 1.], [2., 2.]]);
        }
        other => return Err(format!("unexpected {}", other.kind()).into()),
    }
    Ok(())
}

#[test]
fn dyad_plus_dense_densifies() -> Result<(), Box<dyn Error>> {
    let mut gradient = Value::from(DyadCarrier::from_pair(arr1(&[1., 0.]), arr1(&[1., 1.])));
    gradient.accumulate(Value::from(array![[0., 0.], [1., 0.]]))?;

    assert_eq!(
        gradient.as_real().unwrap(),
        &array![[1., 1.], [1., 0.]].into_dyn()
    );
    Ok(())
}

#[test]
fn sparse_sum() -> Result<(), Box<dyn Error>> {
    let mut lhs = TriMat::new((2, 2));
    lhs.add_triplet(0, 0, 1.);
    let mut rhs = TriMat::new((2, 2));
    rhs.add_triplet(0, 0, 2.);
    rhs.add_triplet(1, 0, 3.);

    let lhs: CsMat<f64> = lhs.to_csc();
    let rhs: CsMat<f64> = rhs.to_csc();

    let mut gradient = Value::from(lhs);
    gradient.accumulate(Value::from(rhs))?;

    assert!(gradient.is_sparse());
    assert_eq!(gradient.dense_real(), array![[3., 0.], [3., 0.]].into_dyn());
    Ok(())
}

#[test]
fn sparse_plus_dyad_densifies() -> Result<(), Box<dyn Error>> {
    let mut triplets = TriMat::new((2, 2));
    triplets.add_triplet(1, 1, 2.);
    let sparse: CsMat<f64> = triplets.to_csc();

    let mut gradient = Value::from(sparse);
    gradient.accumulate(Value::from(DyadCarrier::from_pair(
        arr1(&[c64::new(1., 0.), c64::new(0., 0.)]),
        arr1(&[c64::new(0., 1.), c64::new(1., 0.)]),
    )))?;

    assert_eq!(
        gradient.as_complex().unwrap(),
        &array![
            [c64::new(0., 1.), c64::new(1., 0.)],
            [c64::new(0., 0.), c64::new(2., 0.)]
        ]
        .into_dyn()
    );
    Ok(())
}

#[test]
fn scaling_and_items() {
    let value = Value::scalar(2.).scaled(-1.5);
    assert_eq!(value.item(), Some(-3.));
    assert_eq!(Value::from(arr1(&[1., 2.])).item(), None);
}
