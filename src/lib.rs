//! The `adjoin` crate computes sensitivities of responses that depend on the solution of linear
//! systems.
//!
//! A model is written as a [`Graph`] of transformation nodes connected through [`DataNode`]s.
//! Evaluating the graph runs every node forward; propagating seeds the gradient of one or more
//! responses and runs the nodes backward, leaving on every data node the gradient of the seeded
//! responses with respect to it. Gradients of complex quantities follow the convention
//! `df = Re Σ conj(g) dz`.
//!
//! # Highlights
//!
//! * Linear solves whose factorization is picked from the structure of the matrix: diagonal,
//!   triangular, Cholesky, `LDLᵀ`/`LDLᴴ`, LU or QR, dense or sparse, real or complex.
//! * Refactorization only when the matrix changes, and reuse of earlier adjoint solutions when a
//!   new adjoint right-hand side is linearly dependent on previous ones.
//! * Low-rank [`DyadCarrier`] gradients for sparse matrices.
//! * A [`finite_difference`] checker for any graph.
//!
//! # Nodes
//!
//! The [`node`] module holds the transformation nodes: [`LinSolve`], [`SystemOfEquations`],
//! [`AssembleMatrix`], [`InnerProduct`], [`Sum`] and [`Scaling`]. Custom nodes implement
//! [`Forward`], [`Backward`] and [`Transformation`].
//!
//! # Example
//!
//! The compliance `c = fᵀ K(x)⁻¹ f` of two springs in series, and its gradient with respect to
//! the spring stiffnesses.
//!
//! ```
//! use adjoin::{
//!     node::{AssembleMatrix, InnerProduct, LinSolve},
//!     Graph, Matrix, Value,
//! };
//! use ndarray::{arr1, arr2};
//!
//! # fn main() -> adjoin::Result<()> {
//! let springs = vec![
//!     Matrix::Dense(arr2(&[[1., 0.], [0., 0.]])),
//!     Matrix::Dense(arr2(&[[1., -1.], [-1., 1.]])),
//! ];
//!
//! let mut graph = Graph::new();
//! let x = graph.state("x", arr1(&[2., 2.]));
//! let f = graph.state("f", arr1(&[0., 1.]));
//!
//! let k = graph.append(AssembleMatrix::new(&x, springs)?)?.into_single()?;
//! let u = graph.append(LinSolve::new(&k, &f))?.into_single()?;
//! let c = graph.append(InnerProduct::new(&u, &f))?.into_single()?;
//!
//! graph.evaluate()?;
//! graph.propagate(&[(c.clone(), Value::scalar(1.))])?;
//!
//! assert!((c.value().unwrap().item().unwrap() - 1.).abs() < 1e-12);
//! let dx = x.gradient().unwrap().dense_real();
//! assert!((dx[[0]] + 0.25).abs() < 1e-12 && (dx[[1]] + 0.25).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```
pub mod node;
mod utils;

pub use adjoin_core::{c64, zeros, DyadCarrier, Error, Matrix, Result, Scalar, Value};
pub use adjoin_graph::{
    finite_difference, finite_difference::Report, Backward, DataNode, FiniteDifferenceOptions,
    Forward, Graph, NodeView, Observer, Outputs, TracingObserver, Transformation,
};
pub use adjoin_linalg::{
    auto_solver, classify, CachedSolver, LinearSolver, MatrixHints, Solve, SolveStats, SolverKind,
    SolverOptions,
};
pub use node::{
    AssembleMatrix, InnerProduct, LinSolve, LinSolveOptions, Scaling, SolveState,
    SystemOfEquations, Sum,
};
