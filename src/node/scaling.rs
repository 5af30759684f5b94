use adjoin_core::{c64, Error, Result, Scalar, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// How [`Scaling`] normalizes its input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Bound {
    /// `y = scaling · x`.
    None,
    /// Constraint `x ≤ max`, as `y = scaling · (x / max - 1)`.
    Max(f64),
    /// Constraint `x ≥ min`, as `y = scaling · (1 - x / min)`.
    Min(f64),
}

/// Scales a response, optionally turning it into a normalized constraint
/// that is negative when satisfied.
pub struct Scaling {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
    scaling: f64,
    bound: Bound,
}

impl Scaling {
    pub fn new(input: &DataNode, scaling: f64) -> Self {
        Self {
            inputs: vec![input.clone()],
            outputs: vec![DataNode::new("scaled")],
            scaling,
            bound: Bound::None,
        }
    }

    pub fn with_maxval(self, maxval: f64) -> Self {
        Self {
            bound: Bound::Max(maxval),
            ..self
        }
    }

    pub fn with_minval(self, minval: f64) -> Self {
        Self {
            bound: Bound::Min(minval),
            ..self
        }
    }

    pub fn tagged(self, tag: impl Into<String>) -> Self {
        Self {
            outputs: vec![DataNode::new(tag)],
            ..self
        }
    }

    // `y = slope · x + offset`
    fn affine(&self) -> Result<(f64, f64)> {
        let s = self.scaling;
        match self.bound {
            Bound::None => Ok((s, 0.)),
            Bound::Max(bound) | Bound::Min(bound) if bound == 0. => Err(Error::configuration(
                "constraint bound must be non-zero",
            )),
            Bound::Max(max) => Ok((s / max, -s)),
            Bound::Min(min) => Ok((-s / min, s)),
        }
    }
}

impl Forward for Scaling {
    fn forward(&mut self) -> Result<()> {
        let (slope, offset) = self.affine()?;
        let value = self.inputs[0].require_value()?.clone();
        let scaled = match &value {
            Value::Real(x) => Value::Real(x.mapv(|v| slope * v + offset)),
            Value::Complex(x) => {
                Value::Complex(x.mapv(|v| v * slope + c64::from_real(offset)))
            }
            other => {
                return Err(Error::configuration(format!(
                    "cannot scale a {}",
                    other.kind()
                )))
            }
        };
        self.outputs[0].set_value(scaled);
        Ok(())
    }
}

impl Backward for Scaling {
    fn backward(&mut self) -> Result<()> {
        let gradient = match self.outputs[0].gradient() {
            Some(gradient) => gradient.clone(),
            None => return Ok(()),
        };
        let (slope, _) = self.affine()?;
        let gradient = if self.inputs[0].require_value()?.is_complex() {
            gradient.scaled(slope)
        } else {
            gradient.real_part().scaled(slope)
        };
        self.inputs[0].add_gradient(gradient)
    }
}

impl Transformation for Scaling {
    fn name(&self) -> &str {
        "scaling"
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

#[cfg(test)]
mod test;
