use std::error::Error;

use adjoin_core::Value;
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use approx::assert_relative_eq;

use super::Scaling;

fn run(node: &mut Scaling, seed: f64) -> Result<(f64, f64), Box<dyn Error>> {
    node.forward()?;
    let y = node.outputs()[0].clone();
    y.reset_gradient();
    node.inputs()[0].reset_gradient();
    y.add_gradient(Value::scalar(seed))?;
    node.backward()?;

    let value = y.value().unwrap().item().ok_or("not a scalar")?;
    let gradient = node.inputs()[0]
        .gradient()
        .and_then(|gradient| gradient.item())
        .ok_or("no gradient")?;
    Ok((value, gradient))
}

#[test]
fn plain() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("x", 3.);
    let (y, dx) = run(&mut Scaling::new(&x, -1.), 1.)?;

    assert_eq!(y, -3.);
    assert_eq!(dx, -1.);
    Ok(())
}

#[test]
fn upper_bound() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("compliance", 8.);
    let (y, dx) = run(&mut Scaling::new(&x, 10.).with_maxval(4.), 1.)?;

    // violated constraint is positive
    assert_relative_eq!(y, 10.);
    assert_relative_eq!(dx, 2.5);
    Ok(())
}

#[test]
fn lower_bound() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("volume", 3.);
    let (y, dx) = run(&mut Scaling::new(&x, 2.).with_minval(2.), 2.)?;

    // satisfied constraint is negative
    assert_relative_eq!(y, -1.);
    assert_relative_eq!(dx, -2.);
    Ok(())
}

#[test]
fn zero_bound_is_rejected() {
    let x = DataNode::with_value("x", 1.);
    assert!(Scaling::new(&x, 1.).with_maxval(0.).forward().is_err());
}
