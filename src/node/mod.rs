mod assembly;
mod contraction;
mod linsolve;
mod scaling;
mod system;

use adjoin_core::{Matrix, Result, Scalar};
use adjoin_linalg::{auto_solver, CachedSolver, LinearSolver};
use tracing::info;

pub use assembly::AssembleMatrix;
pub use contraction::{InnerProduct, Sum};
pub use linsolve::{LinSolve, LinSolveOptions, SolveState};
pub use scaling::{Bound, Scaling};
pub use system::SystemOfEquations;

/// Picks the solver for `matrix`, honouring a configured family.
///
/// A matrix declared positive definite never falls back from Cholesky.
pub(crate) fn cached_solver<T>(matrix: &Matrix<T>, options: &LinSolveOptions) -> Result<CachedSolver<T>>
where
    T: Scalar,
{
    let solver = match options.solver {
        Some(kind) => {
            info!(?kind, "using configured linear solver");
            LinearSolver::new(kind)
        }
        None => auto_solver(matrix, &options.hints)?,
    };
    let solver = CachedSolver::new(solver, options.solver_options.clone());
    if options.hints.positive_definite == Some(true) {
        return Ok(solver.without_fallback());
    }
    Ok(solver)
}
