use std::error::Error;

use adjoin_core::{DyadCarrier, Matrix, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use ndarray::{arr1, arr2};
use sprs::{CsMat, TriMat};

use super::AssembleMatrix;

fn element(i: usize, j: usize) -> Matrix<f64> {
    // a two-node spring between i and j in a 3x3 system
    let mut triplets = TriMat::new((3, 3));
    triplets.add_triplet(i, i, 1.);
    triplets.add_triplet(j, j, 1.);
    triplets.add_triplet(i, j, -1.);
    triplets.add_triplet(j, i, -1.);
    let matrix: CsMat<f64> = triplets.to_csc();
    Matrix::Sparse(matrix)
}

fn springs() -> Vec<Matrix<f64>> {
    vec![element(0, 1), element(1, 2)]
}

#[test]
fn sparse_assembly() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("x", arr1(&[2., 3.]));
    let base = Matrix::Dense(ndarray::Array2::eye(3));
    let mut node = AssembleMatrix::new(&x, springs())?.with_base(base)?;

    node.forward()?;
    let assembled = node.outputs()[0].value().unwrap().clone();
    assert!(assembled.is_sparse());
    assert_eq!(
        assembled.dense_real(),
        arr2(&[[3., -2., 0.], [-2., 6., -3.], [0., -3., 4.]]).into_dyn()
    );
    Ok(())
}

#[test]
fn dense_assembly() -> Result<(), Box<dyn Error>> {
    let x = DataNode::with_value("x", arr1(&[1., 1.]));
    let mut node = AssembleMatrix::new(&x, springs())?.dense().tagged("K");

    node.forward()?;
    let assembled = node.outputs()[0].value().unwrap().clone();
    assert!(matches!(assembled, Value::Real(_)));
    assert_eq!(&*node.outputs()[0].tag(), "K");
    Ok(())
}

#[test]
fn dense_and_dyadic_gradients_agree() -> Result<(), Box<dyn Error>> {
    let u = arr1(&[1., -2., 0.5]);
    let v = arr1(&[0., 1., 3.]);
    let dyad = DyadCarrier::from_pair(u.clone(), v.clone());
    let dense = Value::from(dyad.to_dense());

    let mut gradients = Vec::new();
    for gradient in [Value::Dyad(dyad), dense] {
        let x = DataNode::with_value("x", arr1(&[2., 3.]));
        let mut node = AssembleMatrix::new(&x, springs())?;
        node.forward()?;
        node.outputs()[0].add_gradient(gradient)?;
        node.backward()?;
        gradients.push(x.gradient().unwrap().dense_real());
    }

    // dx_0 = (u0 - u1)(v0 - v1), dx_1 = (u1 - u2)(v1 - v2)
    assert_eq!(gradients[0], arr1(&[-3., 5.]).into_dyn());
    assert_eq!(gradients[0], gradients[1]);
    Ok(())
}

#[test]
fn invalid_terms() {
    let x = DataNode::with_value("x", arr1(&[1.]));
    assert!(AssembleMatrix::new(&x, Vec::new()).is_err());

    let terms = vec![element(0, 1), Matrix::Dense(ndarray::Array2::zeros((2, 2)))];
    assert!(AssembleMatrix::new(&x, terms).is_err());

    let mut node = match AssembleMatrix::new(&x, springs()) {
        Ok(node) => node,
        Err(error) => panic!("{}", error),
    };
    // two terms, one weight
    assert!(node.forward().is_err());
}
