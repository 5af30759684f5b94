use std::error::Error;

use adjoin_core::{c64, Value};
use adjoin_graph::{
    finite_difference, Backward, DataNode, FiniteDifferenceOptions, Forward, Graph,
    Transformation,
};
use approx::assert_abs_diff_eq;
use ndarray::{arr1, arr2, Array2, ArrayD};
use sprs::{CsMat, TriMat};

use super::SystemOfEquations;
use crate::node::InnerProduct;

fn assert_close(actual: &ArrayD<f64>, expected: &ArrayD<f64>) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *e, epsilon = 1e-10);
    }
}

// Non-symmetric, so perturbing single entries keeps the solver family valid.
fn stiffness() -> Array2<f64> {
    arr2(&[
        [4., 1., 0.5, 0.],
        [-1., 5., 1., 0.2],
        [0.3, -1., 3., 1.],
        [0., 0.4, -0.5, 2.],
    ])
}

fn to_sparse(dense: &Array2<f64>) -> CsMat<f64> {
    let mut triplets = TriMat::new(dense.dim());
    for ((row, col), &value) in dense.indexed_iter() {
        if value != 0. {
            triplets.add_triplet(row, col, value);
        }
    }
    triplets.to_csc()
}

#[test]
fn all_free() -> Result<(), Box<dyn Error>> {
    let k = DataNode::with_value("K", stiffness());
    let f = DataNode::with_value("f", arr1(&[1., 0., -1., 2.]));
    let mut node = SystemOfEquations::new(&k, &f, 4);

    node.forward()?;
    let forces = node.outputs()[1].value().unwrap().dense_real();
    assert_close(&forces, &arr1(&[1., 0., -1., 2.]).into_dyn());
    assert_eq!(node.stats().factorizations, 1);
    Ok(())
}

#[test]
fn prescribed_state() -> Result<(), Box<dyn Error>> {
    let k = DataNode::with_value("K", stiffness());
    let f = DataNode::with_value("f", arr2(&[[1., 0.], [2., 1.]]));
    let up = DataNode::with_value("up", arr2(&[[0.5, 0.], [-1., 0.]]));
    let mut node = SystemOfEquations::with_partition(&k, &f, Some(&up), vec![0, 2], vec![1, 3]);

    node.forward()?;
    let state = node.outputs()[0].value().unwrap().dense_real();
    let forces = node.outputs()[1].value().unwrap().dense_real();

    assert_eq!(state.shape(), &[4, 2]);
    assert_eq!(state[[1, 0]], 0.5);
    assert_eq!(state[[3, 0]], -1.);
    assert_eq!(state[[1, 1]], 0.);
    // free rows reproduce the applied forces
    assert_abs_diff_eq!(forces[[0, 0]], 1., epsilon = 1e-12);
    assert_abs_diff_eq!(forces[[2, 0]], 2., epsilon = 1e-12);
    assert_abs_diff_eq!(forces[[2, 1]], 1., epsilon = 1e-12);
    Ok(())
}

fn sensitivities_pass(k: Value) -> Result<(), Box<dyn Error>> {
    let mut graph = Graph::new();
    let k = graph.state("K", k);
    let f = graph.state("f", arr1(&[1., -0.5]));
    let up = graph.state("up", arr1(&[0.25, -1.]));
    let w = graph.state("w", arr1(&[1., 2., -1., 0.5]));

    let outputs = graph
        .append(SystemOfEquations::with_partition(&k, &f, Some(&up), vec![0, 2], vec![1, 3]))?
        .into_vec();
    let displacement = graph
        .append(InnerProduct::new(&outputs[0], &w))?
        .into_single()?;
    let reaction = graph
        .append(InnerProduct::new(&outputs[1], &w))?
        .into_single()?;

    let report = finite_difference(
        &mut graph,
        &[k, f, up],
        &[displacement, reaction],
        &FiniteDifferenceOptions::default(),
    )?;
    for failure in report.failures() {
        eprintln!("{:?}", failure);
    }
    assert!(report.passed());
    Ok(())
}

#[test]
fn dense_sensitivities() -> Result<(), Box<dyn Error>> {
    sensitivities_pass(Value::from(stiffness()))
}

#[test]
fn sparse_sensitivities() -> Result<(), Box<dyn Error>> {
    sensitivities_pass(Value::from(to_sparse(&stiffness())))
}

#[test]
fn complex_matrix() -> Result<(), Box<dyn Error>> {
    let k = DataNode::with_value(
        "K",
        stiffness().mapv(|v| c64::new(v, 0.1 * v)),
    );
    let f = DataNode::with_value("f", arr1(&[1., 0., -1., 2.]));
    let mut node = SystemOfEquations::new(&k, &f, 4);

    node.forward()?;
    let forces = node.outputs()[1].value().unwrap().clone();
    assert!(forces.is_complex());
    assert_close(&forces.dense_real(), &arr1(&[1., 0., -1., 2.]).into_dyn());

    node.outputs()[0].add_gradient(Value::from(arr1(&[1., 0., 0., 0.])))?;
    node.backward()?;
    assert!(matches!(*k.gradient().unwrap(), Value::Complex(_)));
    assert!(matches!(*f.gradient().unwrap(), Value::Real(_)));
    Ok(())
}

#[test]
fn invalid_partitions() {
    let k = DataNode::with_value("K", stiffness());
    let f = DataNode::with_value("f", arr1(&[1., 1.]));

    for (free, prescribed) in [
        (vec![0, 1], vec![1, 3]),
        (vec![0, 1], vec![3]),
        (vec![0, 1], vec![2, 4]),
    ] {
        let mut node = SystemOfEquations::with_partition(&k, &f, None, free, prescribed);
        assert!(node.forward().is_err());
    }
}
