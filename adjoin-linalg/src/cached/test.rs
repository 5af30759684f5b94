use std::error::Error as StdError;

use adjoin_core::{c64, Error, Matrix};
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use ndarray_rand::{rand_distr::Uniform, RandomExt};

use super::{CachedSolver, SolveStats, SolverOptions};
use sprs::{CsMat, TriMat};

use crate::{auto_solver, LinearSolver, MatrixHints, SolverKind};

type TestResult = Result<(), Box<dyn StdError>>;

fn assert_close(lhs: &Array2<f64>, rhs: &Array2<f64>, epsilon: f64) {
    assert_eq!(lhs.dim(), rhs.dim());
    for (&a, &b) in lhs.iter().zip(rhs.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = epsilon);
    }
}

fn cached(kind: SolverKind, matrix: &Matrix<f64>) -> Result<CachedSolver<f64>, Box<dyn StdError>> {
    let mut solver = CachedSolver::new(LinearSolver::new(kind), SolverOptions::default());
    solver.update(matrix)?;
    Ok(solver)
}

fn spd(n: usize) -> Array2<f64> {
    let a = Array2::random((n, n), Uniform::new(-1., 1.));
    a.t().dot(&a) + Array2::<f64>::eye(n) * n as f64
}

#[test]
fn refactorizes_only_on_change() -> TestResult {
    let matrix = Matrix::Dense(spd(4));
    let mut solver = cached(SolverKind::DenseCholesky, &matrix)?;

    assert!(!solver.update(&matrix.clone())?);
    assert_eq!(solver.stats().factorizations, 1);

    let changed = Matrix::Dense(matrix.to_dense() * 2.);
    assert!(solver.update(&changed)?);
    assert_eq!(solver.stats().factorizations, 2);
    Ok(())
}

#[test]
fn dependent_right_hand_sides_are_not_solved_again() -> TestResult {
    let matrix = Matrix::Dense(array![[2., 1.], [0., 4.]]);
    let mut solver = cached(SolverKind::DenseLu, &matrix)?;

    let b = array![[1.], [3.]];
    let first = solver.adjoint_solve(&b.view())?;
    let second = solver.adjoint_solve(&(&b * 3.).view())?;

    assert_close(&second, &(&first * 3.), 1e-12);
    assert_eq!(
        solver.stats(),
        SolveStats {
            factorizations: 1,
            solves: 0,
            adjoint_solves: 1,
            dependency_hits: 1,
        }
    );
    Ok(())
}

#[test]
fn combinations_of_earlier_right_hand_sides() -> TestResult {
    let dense = spd(5);
    let matrix = Matrix::Dense(dense.clone());
    let mut solver = cached(SolverKind::DenseLu, &matrix)?;

    let b = Array2::random((5, 2), Uniform::new(-1., 1.));
    solver.adjoint_solve(&b.view())?;
    assert_eq!(solver.cached_directions(), 2);

    let combined = b.dot(&array![[0.5], [-2.]]);
    let lambda = solver.adjoint_solve(&combined.view())?;
    assert_eq!(solver.stats().adjoint_solves, 2);
    assert_eq!(solver.stats().dependency_hits, 1);
    assert_close(&dense.t().dot(&lambda), &combined, 1e-10);

    // a partially new direction costs exactly one more solve
    let mut fresh = combined.clone();
    fresh[[0, 0]] += 1.;
    let lambda = solver.adjoint_solve(&fresh.view())?;
    assert_eq!(solver.stats().adjoint_solves, 3);
    assert_close(&dense.t().dot(&lambda), &fresh, 1e-10);
    Ok(())
}

#[test]
fn refactorization_invalidates_the_cache() -> TestResult {
    let matrix = Matrix::Dense(array![[2., 0.5], [0.5, 1.]]);
    let mut solver = cached(SolverKind::DenseCholesky, &matrix)?;
    let b = array![[1.], [0.]];
    solver.adjoint_solve(&b.view())?;

    let changed = Matrix::Dense(array![[4., 0.5], [0.5, 1.]]);
    solver.update(&changed)?;
    assert_eq!(solver.cached_directions(), 0);

    let lambda = solver.adjoint_solve(&b.view())?;
    assert_close(&changed.to_dense().dot(&lambda), &b, 1e-12);
    assert_eq!(solver.stats().adjoint_solves, 2);
    Ok(())
}

#[test]
fn zero_right_hand_side() -> TestResult {
    let matrix = Matrix::Dense(array![[2., 1.], [0., 4.]]);
    let mut solver = cached(SolverKind::DenseLu, &matrix)?;
    let lambda = solver.adjoint_solve(&Array2::zeros((2, 1)).view())?;
    assert_eq!(lambda, Array2::zeros((2, 1)));
    assert_eq!(solver.stats().adjoint_solves, 0);
    Ok(())
}

#[test]
fn complex_adjoint_caching() -> TestResult {
    let dense = array![
        [c64::new(2., 1.), c64::new(0., 1.)],
        [c64::new(1., 0.), c64::new(3., -1.)]
    ];
    let matrix = Matrix::Dense(dense.clone());
    let mut solver = CachedSolver::new(
        LinearSolver::new(SolverKind::DenseLu),
        SolverOptions::default(),
    );
    solver.update(&matrix)?;

    let b = array![[c64::new(1., 0.)], [c64::new(0., 2.)]];
    let first = solver.adjoint_solve(&b.view())?;
    let scaled = b.mapv(|z| z * c64::new(0., 2.));
    let second = solver.adjoint_solve(&scaled.view())?;

    assert_eq!(solver.stats().dependency_hits, 1);
    let expected = first.mapv(|z| z * c64::new(0., 2.));
    for (lhs, rhs) in second.iter().zip(expected.iter()) {
        assert!((lhs - rhs).norm() < 1e-12);
    }
    Ok(())
}

#[test]
fn solve_checks_the_residual() -> TestResult {
    let matrix = Matrix::Dense(spd(3));
    let mut solver = cached(SolverKind::DenseCholesky, &matrix)?;
    let b = array![[1.], [2.], [3.]];
    let x = solver.solve(&b.view())?;
    assert_close(&matrix.to_dense().dot(&x), &b, 1e-10);
    assert_eq!(solver.stats().solves, 1);
    Ok(())
}

#[test]
fn wrong_family_fails_the_residual_check() -> TestResult {
    // a diagonal solver ignores the off-diagonal coupling
    let matrix = Matrix::Dense(array![[2., 1.], [1., 2.]]);
    let mut solver = cached(SolverKind::Diagonal, &matrix)?;
    let error = solver.solve(&array![[1.], [1.]].view()).unwrap_err();
    assert!(matches!(error, Error::NumericalSolve(_)));
    Ok(())
}

#[test]
fn use_before_update() {
    let mut solver = CachedSolver::<f64>::new(
        LinearSolver::new(SolverKind::DenseLu),
        SolverOptions::default(),
    );
    assert!(solver.adjoint_solve(&array![[1.]].view()).is_err());
}

#[test]
fn indefinite_matrices_fall_back_from_cholesky() -> TestResult {
    // positive diagonal, eigenvalues 3 and -1
    let dense = array![[1., 2.], [2., 1.]];
    let mut triplets = TriMat::new((2, 2));
    for ((row, col), &value) in dense.indexed_iter() {
        triplets.add_triplet(row, col, value);
    }
    let sparse: CsMat<f64> = triplets.to_csc();
    let b = array![[3.], [3.]];

    for (matrix, chosen, fallback) in [
        (
            Matrix::Dense(dense.clone()),
            SolverKind::DenseCholesky,
            SolverKind::DenseLdl,
        ),
        (
            Matrix::Sparse(sparse),
            SolverKind::SparseCholesky,
            SolverKind::SparseLu,
        ),
    ] {
        let solver = auto_solver(&matrix, &MatrixHints::default())?;
        assert_eq!(solver.kind(), chosen);

        let mut solver = CachedSolver::new(solver, SolverOptions::default());
        assert!(solver.update(&matrix)?);
        assert_eq!(solver.kind(), fallback);
        assert_eq!(solver.stats().factorizations, 1);

        assert_close(&solver.solve(&b.view())?, &array![[1.], [1.]], 1e-12);
        assert_close(&solver.adjoint_solve(&b.view())?, &array![[1.], [1.]], 1e-12);
    }
    Ok(())
}

#[test]
fn definite_solvers_can_refuse_to_fall_back() {
    let matrix = Matrix::Dense(array![[1., 2.], [2., 1.]]);
    let mut solver = CachedSolver::new(
        LinearSolver::new(SolverKind::DenseCholesky),
        SolverOptions::default(),
    )
    .without_fallback();
    let error = solver.update(&matrix).unwrap_err();
    assert!(matches!(error, Error::NumericalSolve(_)));
    assert_eq!(solver.kind(), SolverKind::DenseCholesky);
}
