use adjoin_core::{c64, Error, Result, Scalar, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use adjoin_linalg::{CachedSolver, SolveStats};
use ndarray::Array2;
use tracing::debug;

use super::{cached_solver, LinSolveOptions};
use crate::utils::{columns, from_columns, matrix, operand_gradient, outer_gradient};

/// Solves `K u = f` where part of `u` is prescribed.
///
/// The degrees of freedom are split into `free` ones, for which the forces
/// are given, and `prescribed` ones, for which the state is given. Inputs are
/// the matrix `K`, the free forces `f_f` and, optionally, the prescribed
/// values `u_p` (zero when absent). Outputs are the full state `u` and the
/// full forces `f = K u`, reactions included.
///
/// Only `K_ff` is factorized:
///
/// ```text
/// K_ff u_f = f_f - K_fp u_p
/// ```
pub struct SystemOfEquations {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
    free: Vec<usize>,
    prescribed: Vec<usize>,
    options: LinSolveOptions,
    real: Option<CachedSolver<f64>>,
    complex: Option<CachedSolver<c64>>,
}

impl SystemOfEquations {
    /// A system with every degree of freedom free.
    pub fn new(matrix: &DataNode, forces: &DataNode, size: usize) -> Self {
        Self {
            inputs: vec![matrix.clone(), forces.clone()],
            outputs: vec![DataNode::new("state"), DataNode::new("forces")],
            free: (0..size).collect(),
            prescribed: Vec::new(),
            options: LinSolveOptions::default(),
            real: None,
            complex: None,
        }
    }

    /// A system with the given free and prescribed index sets.
    ///
    /// `prescribed_values` holds `u_p`; pass `None` to prescribe zeros.
    pub fn with_partition(
        matrix: &DataNode,
        forces: &DataNode,
        prescribed_values: Option<&DataNode>,
        free: Vec<usize>,
        prescribed: Vec<usize>,
    ) -> Self {
        let mut inputs = vec![matrix.clone(), forces.clone()];
        inputs.extend(prescribed_values.cloned());
        Self {
            inputs,
            free,
            prescribed,
            ..Self::new(matrix, forces, 0)
        }
    }

    pub fn options(self, options: LinSolveOptions) -> Self {
        Self { options, ..self }
    }

    /// Counters of the solver used for `K_ff`.
    pub fn stats(&self) -> SolveStats {
        match (&self.real, &self.complex) {
            (Some(solver), _) => solver.stats(),
            (None, Some(solver)) => solver.stats(),
            (None, None) => SolveStats::default(),
        }
    }

    fn is_complex(&self) -> Result<bool> {
        let mut complex = false;
        for input in &self.inputs {
            complex |= input.require_value()?.is_complex();
        }
        Ok(complex)
    }
}

// Per-type view of the node, so the algebra is written once for f64 and c64.
struct Parts<'a, T> {
    inputs: &'a [DataNode],
    outputs: &'a [DataNode],
    solver: &'a mut Option<CachedSolver<T>>,
    options: &'a LinSolveOptions,
    free: &'a [usize],
    prescribed: &'a [usize],
}

impl<'a, T> Parts<'a, T>
where
    T: Scalar,
{
    fn forward(&mut self) -> Result<(Value, Value)> {
        let inputs = self.inputs;
        let stiffness = matrix::<T>(&*inputs[0].require_value()?, "matrix")?;
        let (rows, cols) = stiffness.shape();
        if rows != cols {
            return Err(Error::UnsupportedMatrixShape {
                rows,
                cols,
                reason: "a system of equations needs a square matrix".to_string(),
            });
        }
        check_partition(self.free, self.prescribed, rows)?;

        let (forces, rank) = columns::<T>(&*inputs[1].require_value()?, "free forces")?;
        let cases = forces.ncols();
        check_rows(&forces, self.free.len(), "free forces")?;

        let values = match inputs.get(2) {
            Some(node) => {
                let (values, _) = columns::<T>(&*node.require_value()?, "prescribed values")?;
                check_rows(&values, self.prescribed.len(), "prescribed values")?;
                if values.ncols() != cases {
                    return Err(Error::configuration(format!(
                        "{} prescribed load cases for {} force load cases",
                        values.ncols(),
                        cases
                    )));
                }
                values
            }
            None => Array2::zeros((self.prescribed.len(), cases)),
        };

        let k_ff = stiffness.submatrix(self.free, self.free)?;
        let mut rhs = forces;
        if !self.prescribed.is_empty() {
            let k_fp = stiffness.submatrix(self.free, self.prescribed)?;
            rhs = rhs - k_fp.dot(&values.view())?;
        }

        if self.solver.is_none() {
            *self.solver = Some(cached_solver(&k_ff, self.options)?);
        }
        let solver = self
            .solver
            .as_mut()
            .ok_or_else(|| Error::configuration("solver unavailable"))?;
        if solver.update(&k_ff)? {
            debug!(free = self.free.len(), "refactorized free block");
        }
        let free_state = solver.solve(&rhs.view())?;

        let mut state = Array2::zeros((rows, cases));
        scatter(&mut state, self.free, &free_state);
        scatter(&mut state, self.prescribed, &values);
        let full_forces = stiffness.dot(&state.view())?;

        Ok((
            T::array_into_value(from_columns(state, rank)),
            T::array_into_value(from_columns(full_forces, rank)),
        ))
    }

    fn backward(&mut self) -> Result<Vec<Value>> {
        let (inputs, outputs) = (self.inputs, self.outputs);
        let stiffness_value = inputs[0].require_value()?.clone();
        let stiffness = matrix::<T>(&stiffness_value, "matrix")?;
        let (state, rank) = columns::<T>(&*outputs[0].require_value()?, "state")?;
        let shape = state.dim();

        let state_gradient = output_gradient::<T>(&outputs[0], shape)?;
        let forces_gradient = output_gradient::<T>(&outputs[1], shape)?;

        // f = K u feeds back into u
        let total = state_gradient + stiffness.adjoint_dot(&forces_gradient.view())?;
        let lambda = self
            .solver
            .as_mut()
            .ok_or_else(|| Error::configuration("backward before forward"))?
            .adjoint_solve(&gather(&total, self.free).view())?;

        let mut lambda_full = Array2::zeros(shape);
        scatter(&mut lambda_full, self.free, &lambda);
        let stiffness_gradient = outer_gradient(
            &(forces_gradient - &lambda_full),
            &state,
            !stiffness_value.is_complex(),
            stiffness_value.is_sparse(),
        )?;

        let mut gradients = vec![
            stiffness_gradient,
            operand_gradient(
                lambda.clone(),
                rank,
                !inputs[1].require_value()?.is_complex(),
            ),
        ];
        if let Some(node) = inputs.get(2) {
            let k_fp = stiffness.submatrix(self.free, self.prescribed)?;
            let values_gradient =
                gather(&total, self.prescribed) - k_fp.adjoint_dot(&lambda.view())?;
            gradients.push(operand_gradient(
                values_gradient,
                rank,
                !node.require_value()?.is_complex(),
            ));
        }
        Ok(gradients)
    }
}

impl Forward for SystemOfEquations {
    fn forward(&mut self) -> Result<()> {
        let (state, forces) = if self.is_complex()? {
            self.complex_parts().forward()?
        } else {
            self.real_parts().forward()?
        };
        self.outputs[0].set_value(state);
        self.outputs[1].set_value(forces);
        Ok(())
    }
}

impl Backward for SystemOfEquations {
    fn backward(&mut self) -> Result<()> {
        let gradients = if self.is_complex()? {
            self.complex_parts().backward()?
        } else {
            self.real_parts().backward()?
        };
        for (input, gradient) in self.inputs.iter().zip(gradients) {
            input.add_gradient(gradient)?;
        }
        Ok(())
    }
}

impl SystemOfEquations {
    fn real_parts(&mut self) -> Parts<'_, f64> {
        Parts {
            inputs: &self.inputs,
            outputs: &self.outputs,
            solver: &mut self.real,
            options: &self.options,
            free: &self.free,
            prescribed: &self.prescribed,
        }
    }

    fn complex_parts(&mut self) -> Parts<'_, c64> {
        Parts {
            inputs: &self.inputs,
            outputs: &self.outputs,
            solver: &mut self.complex,
            options: &self.options,
            free: &self.free,
            prescribed: &self.prescribed,
        }
    }
}

impl Transformation for SystemOfEquations {
    fn name(&self) -> &str {
        "system_of_equations"
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

fn check_partition(free: &[usize], prescribed: &[usize], size: usize) -> Result<()> {
    let mut seen = vec![false; size];
    for &index in free.iter().chain(prescribed.iter()) {
        match seen.get_mut(index) {
            Some(flag) if !*flag => *flag = true,
            Some(_) => {
                return Err(Error::configuration(format!(
                    "degree of freedom {} is listed twice",
                    index
                )))
            }
            None => {
                return Err(Error::configuration(format!(
                    "degree of freedom {} is out of bounds for a system of size {}",
                    index, size
                )))
            }
        }
    }
    match seen.iter().position(|flag| !flag) {
        Some(index) => Err(Error::configuration(format!(
            "degree of freedom {} is neither free nor prescribed",
            index
        ))),
        None => Ok(()),
    }
}

fn check_rows<T>(array: &Array2<T>, expected: usize, what: &str) -> Result<()> {
    if array.nrows() != expected {
        return Err(Error::configuration(format!(
            "{} have {} rows, expected {}",
            what,
            array.nrows(),
            expected
        )));
    }
    Ok(())
}

// Zero when the output received no gradient; real systems keep the real part.
fn output_gradient<T>(output: &DataNode, shape: (usize, usize)) -> Result<Array2<T>>
where
    T: Scalar,
{
    match output.gradient() {
        Some(gradient) if T::IS_COMPLEX => Ok(columns::<T>(&gradient, "gradient")?.0),
        Some(gradient) => Ok(columns::<T>(&gradient.real_part(), "gradient")?.0),
        None => Ok(Array2::zeros(shape)),
    }
}

fn scatter<T>(target: &mut Array2<T>, indices: &[usize], rows: &Array2<T>)
where
    T: Scalar,
{
    for (row, &index) in rows.outer_iter().zip(indices) {
        target.row_mut(index).assign(&row);
    }
}

fn gather<T>(source: &Array2<T>, indices: &[usize]) -> Array2<T>
where
    T: Scalar,
{
    Array2::from_shape_fn((indices.len(), source.ncols()), |(i, j)| {
        source[[indices[i], j]]
    })
}

#[cfg(test)]
mod test;
