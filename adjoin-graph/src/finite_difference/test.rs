use std::error::Error as StdError;

use adjoin_core::{Result, Value};
use approx::assert_relative_eq;
use ndarray::{arr0, arr1};

use super::{finite_difference, FiniteDifferenceOptions};
use crate::{Backward, DataNode, Forward, Graph, Transformation};

/// `y = Σ x_i³`, with an optionally wrong derivative.
struct Cubes {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
    derivative_scale: f64,
}

impl Cubes {
    fn new(input: &DataNode, derivative_scale: f64) -> Self {
        Self {
            inputs: vec![input.clone()],
            outputs: vec![DataNode::new("cubes")],
            derivative_scale,
        }
    }
}

impl Forward for Cubes {
    fn forward(&mut self) -> Result<()> {
        let x = self.inputs[0].require_value()?.dense_real();
        self.outputs[0].set_value(arr0(x.mapv(|v| v.powi(3)).sum()));
        Ok(())
    }
}

impl Backward for Cubes {
    fn backward(&mut self) -> Result<()> {
        let seed = match self.outputs[0].gradient().and_then(|g| g.item()) {
            Some(seed) => seed,
            None => return Ok(()),
        };
        let x = self.inputs[0].require_value()?.dense_real();
        let gradient = x.mapv(|v| 3. * v * v * seed * self.derivative_scale);
        self.inputs[0].add_gradient(Value::Real(gradient))
    }
}

impl Transformation for Cubes {
    fn name(&self) -> &str {
        "cubes"
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

#[test]
fn correct_sensitivities_pass() -> std::result::Result<(), Box<dyn StdError>> {
    let mut graph = Graph::new();
    let x = graph.state("x", arr1(&[0.5, -1., 2.]));
    let y = graph.append(Cubes::new(&x, 1.))?.into_single()?;

    let report = finite_difference(
        &mut graph,
        &[x.clone()],
        &[y.clone()],
        &FiniteDifferenceOptions::default(),
    )?;

    assert_eq!(report.comparisons.len(), 3);
    assert!(report.passed());
    assert_relative_eq!(report.comparisons[2].analytic, 12.);
    assert_relative_eq!(report.comparisons[2].numeric, 12., max_relative = 1e-6);

    // inputs are restored
    assert_eq!(
        x.value().unwrap().dense_real(),
        arr1(&[0.5, -1., 2.]).into_dyn()
    );
    assert_relative_eq!(y.value().unwrap().item().unwrap(), 7.125);
    Ok(())
}

#[test]
fn wrong_sensitivities_are_reported() -> std::result::Result<(), Box<dyn StdError>> {
    let mut graph = Graph::new();
    let x = graph.state("x", arr1(&[1., 2.]));
    let y = graph.append(Cubes::new(&x, 1.01))?.into_single()?;

    let report = finite_difference(&mut graph, &[x], &[y], &FiniteDifferenceOptions::default())?;

    assert!(!report.passed());
    assert_eq!(report.failures().count(), 2);
    Ok(())
}

#[test]
fn responses_must_be_scalar() -> std::result::Result<(), Box<dyn StdError>> {
    let mut graph = Graph::new();
    let x = graph.state("x", arr1(&[1., 2.]));

    let result = finite_difference(
        &mut graph,
        &[x.clone()],
        &[x],
        &FiniteDifferenceOptions::default(),
    );
    assert!(result.is_err());
    Ok(())
}
