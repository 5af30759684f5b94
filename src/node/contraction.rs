//! Full contractions to a scalar.

use adjoin_core::{c64, Error, Result, Scalar, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use ndarray::{arr0, ArrayD};

/// `y = Σ_i a_i b_i`, for arrays of equal shape.
///
/// No conjugation takes place, so complex operands give the bilinear product.
pub struct InnerProduct {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
}

impl InnerProduct {
    pub fn new(lhs: &DataNode, rhs: &DataNode) -> Self {
        Self {
            inputs: vec![lhs.clone(), rhs.clone()],
            outputs: vec![DataNode::new("inner_product")],
        }
    }

    pub fn tagged(self, tag: impl Into<String>) -> Self {
        Self {
            outputs: vec![DataNode::new(tag)],
            ..self
        }
    }

    fn operands<T>(&self) -> Result<(ArrayD<T>, ArrayD<T>)>
    where
        T: Scalar,
    {
        let lhs = dense::<T>(&self.inputs[0])?;
        let rhs = dense::<T>(&self.inputs[1])?;
        if lhs.shape() != rhs.shape() {
            return Err(Error::configuration(format!(
                "inner product of shapes {:?} and {:?}",
                lhs.shape(),
                rhs.shape()
            )));
        }
        Ok((lhs, rhs))
    }

    fn is_complex(&self) -> Result<bool> {
        Ok(self.inputs[0].require_value()?.is_complex()
            || self.inputs[1].require_value()?.is_complex())
    }
}

impl Forward for InnerProduct {
    fn forward(&mut self) -> Result<()> {
        let value = if self.is_complex()? {
            let (lhs, rhs) = self.operands::<c64>()?;
            Value::from(arr0((lhs * rhs).sum()))
        } else {
            let (lhs, rhs) = self.operands::<f64>()?;
            Value::scalar((lhs * rhs).sum())
        };
        self.outputs[0].set_value(value);
        Ok(())
    }
}

impl Backward for InnerProduct {
    fn backward(&mut self) -> Result<()> {
        let gradient = match scalar_gradient(&self.outputs[0]) {
            Some(gradient) => gradient,
            None => return Ok(()),
        };

        let (lhs, rhs) = self.operands::<c64>()?;
        let lhs_gradient = rhs.mapv(|v| gradient * v.conj());
        let rhs_gradient = lhs.mapv(|v| gradient * v.conj());
        self.inputs[0].add_gradient(restrict(&self.inputs[0], lhs_gradient)?)?;
        self.inputs[1].add_gradient(restrict(&self.inputs[1], rhs_gradient)?)
    }
}

impl Transformation for InnerProduct {
    fn name(&self) -> &str {
        "inner_product"
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

/// `y = Σ_i x_i`.
pub struct Sum {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
}

impl Sum {
    pub fn new(input: &DataNode) -> Self {
        Self {
            inputs: vec![input.clone()],
            outputs: vec![DataNode::new("sum")],
        }
    }

    pub fn tagged(self, tag: impl Into<String>) -> Self {
        Self {
            outputs: vec![DataNode::new(tag)],
            ..self
        }
    }
}

impl Forward for Sum {
    fn forward(&mut self) -> Result<()> {
        let value = if self.inputs[0].require_value()?.is_complex() {
            Value::from(arr0(dense::<c64>(&self.inputs[0])?.sum()))
        } else {
            Value::scalar(dense::<f64>(&self.inputs[0])?.sum())
        };
        self.outputs[0].set_value(value);
        Ok(())
    }
}

impl Backward for Sum {
    fn backward(&mut self) -> Result<()> {
        let gradient = match scalar_gradient(&self.outputs[0]) {
            Some(gradient) => gradient,
            None => return Ok(()),
        };
        let shape = self.inputs[0].require_value()?.shape();
        let broadcast = ArrayD::from_elem(shape, gradient);
        self.inputs[0].add_gradient(restrict(&self.inputs[0], broadcast)?)
    }
}

impl Transformation for Sum {
    fn name(&self) -> &str {
        "sum"
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

fn dense<T>(node: &DataNode) -> Result<ArrayD<T>>
where
    T: Scalar,
{
    let value = node.require_value()?;
    T::array_from_value(&value).ok_or_else(|| {
        Error::configuration(format!(
            "`{}` must be a dense array, got a {}",
            node.tag(),
            value.kind()
        ))
    })
}

fn scalar_gradient(output: &DataNode) -> Option<c64> {
    let gradient = output.gradient()?;
    gradient.dense_complex().iter().next().copied()
}

// Real inputs only receive the real part.
fn restrict(input: &DataNode, gradient: ArrayD<c64>) -> Result<Value> {
    if input.require_value()?.is_complex() {
        Ok(Value::Complex(gradient))
    } else {
        Ok(Value::Real(gradient.mapv(|z| z.re)))
    }
}

#[cfg(test)]
mod test;
