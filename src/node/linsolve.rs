use adjoin_core::{c64, Error, Matrix, Result, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use adjoin_linalg::{CachedSolver, MatrixHints, SolveStats, SolverKind, SolverOptions};
use ndarray::{concatenate, s, Array2, Axis};
use tracing::debug;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use super::cached_solver;
use crate::utils::{
    columns, from_columns, join, matrix, operand_gradient, outer_gradient, split_columns,
};

/// Configuration of a [`LinSolve`] node.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LinSolveOptions {
    /// Structural overrides passed to the classifier.
    pub hints: MatrixHints,
    /// Solver family to use instead of classifying the matrix.
    pub solver: Option<SolverKind>,
    pub solver_options: SolverOptions,
}

/// Lifecycle of the factorization held by a [`LinSolve`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveState {
    /// No factorization matches the current matrix.
    Unfactored,
    /// The matrix is factorized and `x` is up to date.
    Factored,
    /// Adjoint solutions for the last backward pass are cached.
    SensitivityReady,
}

enum Engine {
    Real(CachedSolver<f64>),
    Complex(CachedSolver<c64>),
}

impl Engine {
    fn stats(&self) -> SolveStats {
        match self {
            Self::Real(solver) => solver.stats(),
            Self::Complex(solver) => solver.stats(),
        }
    }

    fn kind(&self) -> SolverKind {
        match self {
            Self::Real(solver) => solver.kind(),
            Self::Complex(solver) => solver.kind(),
        }
    }
}

// What the forward pass saw, needed to shape the gradients.
#[derive(Clone, Copy)]
struct Recorded {
    rank: usize,
    rhs_complex: bool,
    sparse: bool,
}

/// Solves `A x = b` for one or more right-hand sides.
///
/// Inputs are the matrix `A` (dense or sparse, real or complex) and the
/// right-hand side `b` (a vector or one column per load case). The single
/// output is `x`, shaped like `b`.
///
/// The solver family is picked once, on the first forward pass, unless one is
/// given in [`LinSolveOptions`]. The matrix is refactorized only when its
/// value changes and adjoint solves reuse earlier solutions whenever the new
/// right-hand side depends linearly on previous ones.
///
/// A real matrix with a complex right-hand side is solved as two real
/// systems; a complex matrix promotes a real right-hand side.
pub struct LinSolve {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
    options: LinSolveOptions,
    engine: Option<Engine>,
    state: SolveState,
    recorded: Option<Recorded>,
}

impl LinSolve {
    pub fn new(matrix: &DataNode, rhs: &DataNode) -> Self {
        Self::with_options(matrix, rhs, LinSolveOptions::default())
    }

    pub fn with_options(matrix: &DataNode, rhs: &DataNode, options: LinSolveOptions) -> Self {
        Self {
            inputs: vec![matrix.clone(), rhs.clone()],
            outputs: vec![DataNode::new("x")],
            options,
            engine: None,
            state: SolveState::Unfactored,
            recorded: None,
        }
    }

    /// Names the solution node.
    pub fn tagged(self, tag: impl Into<String>) -> Self {
        Self {
            outputs: vec![DataNode::new(tag)],
            ..self
        }
    }

    pub fn state(&self) -> SolveState {
        self.state
    }

    /// Counters of the underlying solver, zero before the first forward pass.
    pub fn stats(&self) -> SolveStats {
        self.engine
            .as_ref()
            .map(Engine::stats)
            .unwrap_or_default()
    }

    /// The solver family in use, once chosen.
    pub fn solver_kind(&self) -> Option<SolverKind> {
        self.engine.as_ref().map(Engine::kind)
    }

    fn real_engine(&mut self, matrix: &Matrix<f64>) -> Result<&mut CachedSolver<f64>> {
        if !matches!(self.engine, Some(Engine::Real(_))) {
            self.engine = Some(Engine::Real(cached_solver(matrix, &self.options)?));
        }
        match &mut self.engine {
            Some(Engine::Real(solver)) => Ok(solver),
            _ => Err(Error::configuration("real solver unavailable")),
        }
    }

    fn complex_engine(&mut self, matrix: &Matrix<c64>) -> Result<&mut CachedSolver<c64>> {
        if !matches!(self.engine, Some(Engine::Complex(_))) {
            self.engine = Some(Engine::Complex(cached_solver(matrix, &self.options)?));
        }
        match &mut self.engine {
            Some(Engine::Complex(solver)) => Ok(solver),
            _ => Err(Error::configuration("complex solver unavailable")),
        }
    }

    // Solves for `x`, returning it with the rank of `b` and whether the
    // matrix was refactorized.
    fn solve(&mut self, matrix_value: &Value, rhs_value: &Value) -> Result<(Value, usize, bool)> {
        if matrix_value.is_complex() {
            let a = matrix::<c64>(matrix_value, "matrix")?;
            let (b, rank) = columns::<c64>(rhs_value, "right-hand side")?;
            let solver = self.complex_engine(&a)?;
            let changed = solver.update(&a)?;
            let x = solver.solve(&b.view())?;
            Ok((Value::from(from_columns(x, rank)), rank, changed))
        } else if rhs_value.is_complex() {
            let a = matrix::<f64>(matrix_value, "matrix")?;
            let (re, im, rank) = split_columns(rhs_value, "right-hand side")?;
            let solver = self.real_engine(&a)?;
            let changed = solver.update(&a)?;
            let (re, im) = solve_split(solver, &re, &im)?;
            Ok((Value::from(from_columns(join(&re, &im), rank)), rank, changed))
        } else {
            let a = matrix::<f64>(matrix_value, "matrix")?;
            let (b, rank) = columns::<f64>(rhs_value, "right-hand side")?;
            let solver = self.real_engine(&a)?;
            let changed = solver.update(&a)?;
            let x = solver.solve(&b.view())?;
            Ok((Value::from(from_columns(x, rank)), rank, changed))
        }
    }
}

impl Forward for LinSolve {
    fn forward(&mut self) -> Result<()> {
        let matrix_value = self.inputs[0].require_value()?.clone();
        let rhs_value = self.inputs[1].require_value()?.clone();

        let (x, rank, changed) = match self.solve(&matrix_value, &rhs_value) {
            Ok(solved) => solved,
            Err(error) => {
                self.state = SolveState::Unfactored;
                self.recorded = None;
                return Err(error);
            }
        };
        if changed {
            debug!(kind = ?self.solver_kind(), "matrix changed, refactorized");
        }

        // cached adjoint solutions survive an unchanged matrix
        self.state = match (changed, self.state) {
            (false, SolveState::SensitivityReady) => SolveState::SensitivityReady,
            _ => SolveState::Factored,
        };
        self.recorded = Some(Recorded {
            rank,
            rhs_complex: rhs_value.is_complex(),
            sparse: matrix_value.is_sparse(),
        });
        self.outputs[0].set_value(x);
        Ok(())
    }
}

impl Backward for LinSolve {
    fn backward(&mut self) -> Result<()> {
        let gradient = match self.outputs[0].gradient() {
            Some(gradient) => gradient.clone(),
            None => return Ok(()),
        };
        let x = self.outputs[0].require_value()?.clone();
        let Recorded {
            rank,
            rhs_complex,
            sparse,
        } = self
            .recorded
            .ok_or_else(|| Error::configuration("backward before forward"))?;

        let (matrix_gradient, rhs_gradient) = match &mut self.engine {
            Some(Engine::Complex(solver)) => {
                let (g, _) = columns::<c64>(&gradient, "solution gradient")?;
                let (x, _) = columns::<c64>(&x, "solution")?;
                let lambda = solver.adjoint_solve(&g.view())?;
                (
                    outer_gradient(&lambda.mapv(|v| -v), &x, false, sparse)?,
                    operand_gradient(lambda, rank, !rhs_complex),
                )
            }
            Some(Engine::Real(solver)) if rhs_complex || gradient.is_complex() => {
                let (re, im, _) = split_columns(&gradient, "solution gradient")?;
                let (x, _) = columns::<c64>(&x, "solution")?;
                let (re, im) = adjoint_split(solver, &re, &im)?;
                let lambda = join(&re, &im);
                (
                    outer_gradient(&lambda.mapv(|v| -v), &x, true, sparse)?,
                    operand_gradient(lambda, rank, !rhs_complex),
                )
            }
            Some(Engine::Real(solver)) => {
                let (g, _) = columns::<f64>(&gradient, "solution gradient")?;
                let (x, _) = columns::<f64>(&x, "solution")?;
                let lambda = solver.adjoint_solve(&g.view())?;
                (
                    outer_gradient(&(-&lambda), &x, true, sparse)?,
                    operand_gradient(lambda, rank, true),
                )
            }
            None => return Err(Error::configuration("backward before forward")),
        };

        self.inputs[0].add_gradient(matrix_gradient)?;
        self.inputs[1].add_gradient(rhs_gradient)?;
        self.state = SolveState::SensitivityReady;
        Ok(())
    }
}

impl Transformation for LinSolve {
    fn name(&self) -> &str {
        "lin_solve"
    }

    fn inputs(&self) -> &[DataNode] {
        &self.inputs
    }

    fn outputs(&self) -> &[DataNode] {
        &self.outputs
    }

    fn as_backward(&mut self) -> Option<&mut dyn Backward> {
        Some(self)
    }
}

/// Solves a real system for the real and imaginary columns in one call.
fn solve_split(
    solver: &mut CachedSolver<f64>,
    re: &Array2<f64>,
    im: &Array2<f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let stacked = concatenate(Axis(1), &[re.view(), im.view()])
        .map_err(|error| Error::configuration(error.to_string()))?;
    let x = solver.solve(&stacked.view())?;
    let n = re.ncols();
    Ok((x.slice(s![.., ..n]).to_owned(), x.slice(s![.., n..]).to_owned()))
}

fn adjoint_split(
    solver: &mut CachedSolver<f64>,
    re: &Array2<f64>,
    im: &Array2<f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let stacked = concatenate(Axis(1), &[re.view(), im.view()])
        .map_err(|error| Error::configuration(error.to_string()))?;
    let lambda = solver.adjoint_solve(&stacked.view())?;
    let n = re.ncols();
    Ok((
        lambda.slice(s![.., ..n]).to_owned(),
        lambda.slice(s![.., n..]).to_owned(),
    ))
}
