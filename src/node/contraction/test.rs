use std::error::Error;

use adjoin_core::{c64, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use ndarray::arr1;

use super::{InnerProduct, Sum};

#[test]
fn inner_product() -> Result<(), Box<dyn Error>> {
    let a = DataNode::with_value("a", arr1(&[1., 2., 3.]));
    let b = DataNode::with_value("b", arr1(&[4., -5., 6.]));
    let mut node = InnerProduct::new(&a, &b).tagged("compliance");

    node.forward()?;
    let y = node.outputs()[0].clone();
    assert_eq!(&*y.tag(), "compliance");
    assert_eq!(y.value().unwrap().item(), Some(12.));

    y.add_gradient(Value::scalar(2.))?;
    node.backward()?;
    assert_eq!(a.gradient().unwrap().dense_real(), arr1(&[8., -10., 12.]).into_dyn());
    assert_eq!(b.gradient().unwrap().dense_real(), arr1(&[2., 4., 6.]).into_dyn());
    Ok(())
}

#[test]
fn inner_product_of_the_same_node() -> Result<(), Box<dyn Error>> {
    let a = DataNode::with_value("a", arr1(&[1., 2.]));
    let mut node = InnerProduct::new(&a, &a);

    node.forward()?;
    node.outputs()[0].add_gradient(Value::scalar(1.))?;
    node.backward()?;
    assert_eq!(a.gradient().unwrap().dense_real(), arr1(&[2., 4.]).into_dyn());
    Ok(())
}

#[test]
fn complex_inner_product() -> Result<(), Box<dyn Error>> {
    let a = DataNode::with_value("a", arr1(&[c64::new(1., 1.), c64::new(0., 2.)]));
    let b = DataNode::with_value("b", arr1(&[2., 1.]));
    let mut node = InnerProduct::new(&a, &b);

    node.forward()?;
    let y = node.outputs()[0].value().unwrap().dense_complex();
    assert_eq!(y.iter().next(), Some(&c64::new(2., 4.)));

    node.outputs()[0].add_gradient(Value::from(ndarray::arr0(c64::new(1., 0.))))?;
    node.backward()?;
    assert!(matches!(*b.gradient().unwrap(), Value::Real(_)));
    // d Re(y) / d b = Re a
    assert_eq!(b.gradient().unwrap().dense_real(), arr1(&[1., 0.]).into_dyn());
    assert!(matches!(*a.gradient().unwrap(), Value::Complex(_)));
    Ok(())
}

#[test]
fn mismatched_shapes() {
    let a = DataNode::with_value("a", arr1(&[1., 2.]));
    let b = DataNode::with_value("b", arr1(&[1., 2., 3.]));
    assert!(InnerProduct::new(&a, &b).forward().is_err());
}

#[test]
fn sum() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("x", ndarray::arr2(&[[1., 2.], [3., 4.]]));
    let mut node = Sum::new(&x).tagged("volume");

    node.forward()?;
    assert_eq!(node.outputs()[0].value().unwrap().item(), Some(10.));

    node.outputs()[0].add_gradient(Value::scalar(0.5))?;
    node.backward()?;
    assert_eq!(
        x.gradient().unwrap().dense_real(),
        ndarray::arr2(&[[0.5, 0.5], [0.5, 0.5]]).into_dyn()
    );
    Ok(())
}
