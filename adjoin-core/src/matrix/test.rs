use std::error::Error;

use ndarray::{array, Array2};
use sprs::TriMat;

use super::Matrix;
use crate::c64;

fn sparse(dense: &Array2<f64>) -> Matrix<f64> {
    let mut triplets = TriMat::new(dense.dim());
    for ((row, col), &value) in dense.indexed_iter() {
        if value != 0. {
            triplets.add_triplet(row, col, value);
        }
    }
    Matrix::Sparse(triplets.to_csc())
}

#[test]
fn structure_detection() {
    let diagonal = Matrix::Dense(array![[2., 0.], [0., 4.]]);
    let lower = Matrix::Dense(array![[2., 0.], [1., 4.]]);
    let symmetric = Matrix::Dense(array![[2., 1.], [1., 4.]]);

    assert!(diagonal.is_diagonal(1e-12));
    assert!(lower.is_lower_triangular(1e-12));
    assert!(!lower.is_upper_triangular(1e-12));
    assert!(!lower.is_symmetric(1e-12));
    assert!(symmetric.is_symmetric(1e-12));
    assert!(symmetric.is_hermitian(1e-12));
}

#[test]
fn sparse_symmetry() {
    let symmetric = sparse(&array![[2., 1., 0.], [1., 3., 0.], [0., 0., 1.]]);
    let skewed = sparse(&array![[2., 1., 0.], [0., 3., 0.], [0., 0., 1.]]);

    assert!(symmetric.is_symmetric(1e-12));
    assert!(!skewed.is_symmetric(1e-12));
    assert!(!skewed.is_diagonal(1e-12));
}

#[test]
fn complex_hermitian_is_not_symmetric() {
    let matrix = Matrix::Dense(array![
        [c64::new(2., 0.), c64::new(1., 1.)],
        [c64::new(1., -1.), c64::new(3., 0.)]
    ]);

    assert!(matrix.is_hermitian(1e-12));
    assert!(!matrix.is_symmetric(1e-12));
}

#[test]
fn products_agree_between_storages() -> Result<(), Box<dyn Error>> {
    let dense = array![[1., 2., 0.], [0., 3., 4.], [5., 0., 6.]];
    let x = array![[1., 0.], [2., 1.], [3., -1.]];

    let from_dense = Matrix::Dense(dense.clone()).dot(&x.view())?;
    let from_sparse = sparse(&dense).dot(&x.view())?;
    assert_eq!(from_dense, from_sparse);

    let adjoint_dense = Matrix::Dense(dense.clone()).adjoint_dot(&x.view())?;
    let adjoint_sparse = sparse(&dense).adjoint_dot(&x.view())?;
    assert_eq!(adjoint_dense, dense.t().dot(&x));
    assert_eq!(adjoint_dense, adjoint_sparse);

    Ok(())
}

#[test]
fn operand_mismatch() {
    let matrix = Matrix::Dense(Array2::<f64>::eye(3));
    assert!(matrix.dot(&Array2::zeros((2, 1)).view()).is_err());
}

#[test]
fn submatrix_keeps_storage() -> Result<(), Box<dyn Error>> {
    let dense = array![[1., 2., 0.], [0., 3., 4.], [5., 0., 6.]];
    let block = sparse(&dense).submatrix(&[0, 2], &[1, 2])?;

    assert!(block.is_sparse());
    assert_eq!(block.to_dense(), array![[2., 0.], [0., 6.]]);
    assert!(sparse(&dense).submatrix(&[3], &[0]).is_err());

    Ok(())
}

#[test]
fn value_identity() {
    let a = sparse(&array![[1., 0.], [0., 2.]]);
    let b = sparse(&array![[1., 0.], [0., 2.]]);
    let c = sparse(&array![[1., 0.], [0., 3.]]);

    assert!(a.same_as(&b));
    assert!(!a.same_as(&c));
    assert!(!a.same_as(&Matrix::Dense(array![[1., 0.], [0., 2.]])));
}
