//! Central-difference validation of propagated sensitivities.

use adjoin_core::{c64, Error, Result, Value};
use ndarray::ArrayD;
use sprs::{CsMat, TriMat};
use tracing::{debug, warn};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::{DataNode, Graph};

/// Step and acceptance tolerances of [`finite_difference`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FiniteDifferenceOptions {
    /// Absolute perturbation applied to each entry.
    pub step: f64,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
}

impl Default for FiniteDifferenceOptions {
    fn default() -> Self {
        Self {
            step: 1e-6,
            relative_tolerance: 1e-5,
            absolute_tolerance: 1e-8,
        }
    }
}

/// One compared derivative `d response / d input[index]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub response: String,
    pub input: String,
    /// Position of the entry in iteration order; stored entries for sparse inputs.
    pub index: usize,
    pub analytic: f64,
    pub numeric: f64,
    pub passed: bool,
}

/// Outcome of a finite-difference check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub comparisons: Vec<Comparison>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.comparisons.iter().all(|comparison| comparison.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|comparison| !comparison.passed)
    }
}

/// Compares the gradients of scalar `responses` with respect to `inputs`
/// obtained by [`Graph::propagate`] with central differences.
///
/// Real parts of complex inputs and stored entries of sparse inputs are
/// perturbed one at a time. Input values are restored and the graph is
/// re-evaluated before returning.
pub fn finite_difference(
    graph: &mut Graph,
    inputs: &[DataNode],
    responses: &[DataNode],
    options: &FiniteDifferenceOptions,
) -> Result<Report> {
    graph.evaluate()?;

    let mut analytic_gradients = Vec::with_capacity(responses.len());
    for response in responses {
        scalar_response(response)?;
        graph.propagate(&[(response.clone(), Value::scalar(1.))])?;
        let gradients = inputs
            .iter()
            .map(|input| {
                let value = input.require_value()?;
                let gradient = input.gradient().map(|gradient| gradient.dense_real());
                Ok(entries(&value)
                    .iter()
                    .map(|&position| match &gradient {
                        Some(gradient) => gradient_at(gradient, position),
                        None => 0.,
                    })
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>>>()?;
        analytic_gradients.push(gradients);
    }

    let mut report = Report::default();
    for (i, input) in inputs.iter().enumerate() {
        let original = input.require_value()?.clone();
        let positions = entries(&original);

        for (index, &position) in positions.iter().enumerate() {
            input.set_value(perturbed(&original, position, options.step));
            graph.evaluate()?;
            let plus = responses
                .iter()
                .map(scalar_response)
                .collect::<Result<Vec<_>>>()?;

            input.set_value(perturbed(&original, position, -options.step));
            graph.evaluate()?;
            let minus = responses
                .iter()
                .map(scalar_response)
                .collect::<Result<Vec<_>>>()?;

            for (r, response) in responses.iter().enumerate() {
                let numeric = (plus[r] - minus[r]) / (2. * options.step);
                let analytic = analytic_gradients[r][i][index];
                let bound = options.absolute_tolerance
                    + options.relative_tolerance * analytic.abs().max(numeric.abs());
                let comparison = Comparison {
                    response: response.tag().to_string(),
                    input: input.tag().to_string(),
                    index,
                    analytic,
                    numeric,
                    passed: (analytic - numeric).abs() <= bound,
                };
                if comparison.passed {
                    debug!(?comparison, "finite difference");
                } else {
                    warn!(?comparison, "finite difference mismatch");
                }
                report.comparisons.push(comparison);
            }
        }
        input.set_value(original);
    }

    graph.evaluate()?;
    Ok(report)
}

fn scalar_response(response: &DataNode) -> Result<f64> {
    response.require_value()?.item().ok_or_else(|| {
        Error::configuration(format!(
            "response `{}` is not a real scalar",
            response.tag()
        ))
    })
}

// A perturbable entry: flat index for dense values, (row, col) for sparse ones.
#[derive(Clone, Copy)]
enum Position {
    Flat(usize),
    Stored(usize, usize),
}

fn entries(value: &Value) -> Vec<Position> {
    match value {
        Value::Real(array) => (0..array.len()).map(Position::Flat).collect(),
        Value::Complex(array) => (0..array.len()).map(Position::Flat).collect(),
        Value::SparseReal(matrix) => matrix
            .iter()
            .map(|(_, (row, col))| Position::Stored(row, col))
            .collect(),
        Value::SparseComplex(matrix) => matrix
            .iter()
            .map(|(_, (row, col))| Position::Stored(row, col))
            .collect(),
        Value::Dyad(_) | Value::DyadComplex(_) => Vec::new(),
    }
}

fn gradient_at(dense: &ArrayD<f64>, position: Position) -> f64 {
    match position {
        Position::Flat(index) => match dense.as_slice() {
            Some(values) => values.get(index).copied(),
            None => dense.iter().nth(index).copied(),
        }
        .unwrap_or(0.),
        Position::Stored(row, col) => dense.get(&[row, col][..]).copied().unwrap_or(0.),
    }
}

fn perturbed(value: &Value, position: Position, delta: f64) -> Value {
    match (value, position) {
        (Value::Real(array), Position::Flat(index)) => {
            let mut array = array.clone();
            if let Some(entry) = array.iter_mut().nth(index) {
                *entry += delta;
            }
            Value::Real(array)
        }
        (Value::Complex(array), Position::Flat(index)) => {
            let mut array = array.clone();
            if let Some(entry) = array.iter_mut().nth(index) {
                entry.re += delta;
            }
            Value::Complex(array)
        }
        (Value::SparseReal(matrix), Position::Stored(row, col)) => {
            Value::SparseReal(perturb_stored(matrix, row, col, delta, |v, d| v + d))
        }
        (Value::SparseComplex(matrix), Position::Stored(row, col)) => {
            Value::SparseComplex(perturb_stored(matrix, row, col, delta, |mut v: c64, d| {
                v.re += d;
                v
            }))
        }
        (other, _) => other.clone(),
    }
}

fn perturb_stored<T>(
    matrix: &CsMat<T>,
    row: usize,
    col: usize,
    delta: f64,
    add: impl Fn(T, f64) -> T,
) -> CsMat<T>
where
    T: adjoin_core::Scalar,
{
    let mut triplets = TriMat::new((matrix.rows(), matrix.cols()));
    let mut done = false;
    for (&value, (r, c)) in matrix.iter() {
        let value = if !done && (r, c) == (row, col) {
            done = true;
            add(value, delta)
        } else {
            value
        };
        triplets.add_triplet(r, c, value);
    }
    triplets.to_csc()
}

#[cfg(test)]
mod test;
