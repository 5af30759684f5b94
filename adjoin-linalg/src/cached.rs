use adjoin_core::{Error, Matrix, Result, Scalar};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{debug, trace, warn};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::{LinearSolver, Solve, SolverKind};

/// Tolerances of a [`CachedSolver`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SolverOptions {
    /// Relative residual below which a right-hand side counts as linearly
    /// dependent on the ones already solved.
    pub dependency_tolerance: f64,
    /// Maximum relative backward error `‖A x - b‖ / (‖A‖ ‖x‖ + ‖b‖)` of a
    /// fresh solve, `None` disables the check.
    pub residual_tolerance: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            dependency_tolerance: 1e-5,
            residual_tolerance: Some(1e-8),
        }
    }
}

/// Work counters of a [`CachedSolver`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SolveStats {
    pub factorizations: usize,
    pub solves: usize,
    pub adjoint_solves: usize,
    /// Adjoint right-hand sides answered from the cache.
    pub dependency_hits: usize,
}

/// A linear solver that refactorizes only when its matrix changes and reuses
/// earlier adjoint solutions.
///
/// The adjoint right-hand sides seen since the last factorization are kept as
/// an orthonormal basis `Q` together with `Y = A⁻ᴴ Q`. A new right-hand side
/// `b` is split into `Q Qᴴ b` and a remainder `r`; only `r` is solved for,
/// and not at all when it is negligible.
///
/// A Cholesky factorization that finds its matrix indefinite is retried once
/// with the family of [`SolverKind::fallback`], which is kept for later
/// updates.
pub struct CachedSolver<T> {
    solver: LinearSolver<T>,
    options: SolverOptions,
    fallback: bool,
    matrix: Option<Matrix<T>>,
    norm: f64,
    basis: Vec<Array1<T>>,
    solutions: Vec<Array1<T>>,
    stats: SolveStats,
}

impl<T> CachedSolver<T>
where
    T: Scalar,
{
    pub fn new(solver: LinearSolver<T>, options: SolverOptions) -> Self {
        Self {
            solver,
            options,
            fallback: true,
            matrix: None,
            norm: 0.,
            basis: Vec::new(),
            solutions: Vec::new(),
            stats: SolveStats::default(),
        }
    }

    /// Disables the retry of failed Cholesky factorizations, for matrices
    /// known to be definite.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }

    pub fn kind(&self) -> SolverKind {
        self.solver.kind()
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// The matrix of the current factorization.
    pub fn matrix(&self) -> Option<&Matrix<T>> {
        self.matrix.as_ref()
    }

    /// Number of cached adjoint directions.
    pub fn cached_directions(&self) -> usize {
        self.basis.len()
    }

    /// Factorizes `matrix` unless it equals the one already factorized.
    ///
    /// Returns whether a new factorization was computed. Refactorizing drops
    /// every cached adjoint solution.
    pub fn update(&mut self, matrix: &Matrix<T>) -> Result<bool> {
        if let Some(current) = &self.matrix {
            if current.same_as(matrix) {
                trace!("matrix unchanged, keeping factorization");
                return Ok(false);
            }
        }

        self.matrix = None;
        self.basis.clear();
        self.solutions.clear();

        if let Err(error) = self.solver.factorize(matrix) {
            let kind = self.solver.kind();
            let retry = match (&error, kind.fallback()) {
                (Error::NumericalSolve(_), Some(retry)) if self.fallback => retry,
                _ => return Err(error),
            };
            warn!(from = ?kind, to = ?retry, %error, "factorization failed, retrying");
            self.solver = LinearSolver::new(retry);
            self.solver.factorize(matrix)?;
        }
        self.stats.factorizations += 1;
        self.norm = matrix.norm();
        self.matrix = Some(matrix.clone());
        debug!(kind = ?self.solver.kind(), "factorized matrix");
        Ok(true)
    }

    fn current(&self) -> Result<&Matrix<T>> {
        self.matrix
            .as_ref()
            .ok_or_else(|| Error::configuration("solver used before factorization"))
    }

    /// Solves `A X = B`.
    pub fn solve(&mut self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let x = self.solver.solve(rhs)?;
        self.stats.solves += 1;

        let matrix = self.current()?;
        if matrix.is_square() {
            let residual = matrix.dot(&x.view())? - rhs;
            self.check_residual(&residual, &x, rhs)?;
        }
        Ok(x)
    }

    /// Solves `Aᴴ X = B`, reusing earlier solutions for the part of each
    /// column that lies in the span of previous right-hand sides.
    pub fn adjoint_solve(&mut self, rhs: &ArrayView2<T>) -> Result<Array2<T>> {
        let (rows, cols) = self.current()?.shape();
        if rhs.nrows() != cols {
            return Err(Error::configuration(format!(
                "adjoint right-hand side has {} rows, expected {}",
                rhs.nrows(),
                cols
            )));
        }

        let mut out = Array2::zeros((rows, rhs.ncols()));
        for (c, column) in rhs.axis_iter(Axis(1)).enumerate() {
            let lambda = self.adjoint_column(column)?;
            out.column_mut(c).assign(&lambda);
        }
        Ok(out)
    }

    fn adjoint_column(&mut self, b: ArrayView1<T>) -> Result<Array1<T>> {
        let rows = self.current()?.rows();
        let norm = vector_norm(&b);
        if norm == 0. {
            return Ok(Array1::zeros(rows));
        }

        // Gram-Schmidt against the basis, twice for stability.
        let mut remainder = b.to_owned();
        let mut coefficients = vec![T::zero(); self.basis.len()];
        for _ in 0..2 {
            for (q, coefficient) in self.basis.iter().zip(coefficients.iter_mut()) {
                let projection = inner(q, &remainder.view());
                remainder.scaled_add(-projection, q);
                *coefficient += projection;
            }
        }

        let mut lambda = Array1::zeros(rows);
        for (y, &coefficient) in self.solutions.iter().zip(coefficients.iter()) {
            lambda.scaled_add(coefficient, y);
        }

        let remainder_norm = vector_norm(&remainder.view());
        if remainder_norm <= self.options.dependency_tolerance * norm {
            self.stats.dependency_hits += 1;
            trace!(
                relative_remainder = remainder_norm / norm,
                "adjoint right-hand side is linearly dependent"
            );
            return Ok(lambda);
        }

        let direction = remainder.mapv(|value| value / T::from_real(remainder_norm));
        let rhs = direction.view().insert_axis(Axis(1));
        let y = self.solver.adjoint_solve(&rhs)?;
        self.stats.adjoint_solves += 1;

        let matrix = self.current()?;
        if matrix.is_square() {
            let residual = matrix.adjoint_dot(&y.view())? - &rhs;
            self.check_residual(&residual, &y, &rhs)?;
        }

        let y = y.index_axis_move(Axis(1), 0);
        lambda.scaled_add(T::from_real(remainder_norm), &y);
        self.basis.push(direction);
        self.solutions.push(y);
        Ok(lambda)
    }

    fn check_residual(
        &self,
        residual: &Array2<T>,
        x: &Array2<T>,
        rhs: &ArrayView2<T>,
    ) -> Result<()> {
        let tolerance = match self.options.residual_tolerance {
            Some(tolerance) => tolerance,
            None => return Ok(()),
        };
        let scale = self.norm * frobenius(x.iter()) + frobenius(rhs.iter());
        if scale == 0. {
            return Ok(());
        }
        let error = frobenius(residual.iter()) / scale;
        if error > tolerance {
            return Err(Error::numerical(format!(
                "relative backward error {:e} exceeds {:e}",
                error, tolerance
            )));
        }
        Ok(())
    }
}

fn frobenius<'a, T: Scalar + 'a>(values: impl Iterator<Item = &'a T>) -> f64 {
    values.map(|v| v.modulus().powi(2)).sum::<f64>().sqrt()
}

fn vector_norm<T: Scalar>(v: &ArrayView1<T>) -> f64 {
    frobenius(v.iter())
}

// ⟨q, v⟩ = qᴴ v
fn inner<T: Scalar>(q: &Array1<T>, v: &ArrayView1<T>) -> T {
    q.iter()
        .zip(v.iter())
        .fold(T::zero(), |acc, (&a, &b)| acc + a.conj() * b)
}

#[cfg(test)]
mod test;
