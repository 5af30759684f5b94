//! Structure-aware linear solvers.
//!
//! [`classify`] inspects a [`Matrix`](adjoin_core::Matrix) and picks the
//! cheapest applicable factorization, [`LinearSolver`] runs it and
//! [`CachedSolver`] adds refactorization avoidance and reuse of adjoint
//! solutions on top.
mod cached;
mod classify;
mod solver;

pub use cached::{CachedSolver, SolveStats, SolverOptions};
pub use classify::{auto_solver, classify, MatrixHints, SolverKind};
pub use solver::{
    DenseCholesky, DenseLdl, DenseLu, DenseQr, Diagonal, LinearSolver, Solve, SparseCholesky,
    SparseLu, Triangular,
};
