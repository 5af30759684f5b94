use adjoin_core::{Error, Matrix, Result, Value};
use adjoin_graph::{Backward, DataNode, Forward, Transformation};
use ndarray::{Array1, Array2, Ix2};
use sprs::{CsMat, TriMat};
use tracing::trace;

/// Assembles `A(x) = A₀ + Σ_e x_e M_e` from real weights `x`.
///
/// The terms `M_e` share the shape of `A` and may be dense or sparse. The
/// output is sparse when any term is, unless [`AssembleMatrix::dense`] is
/// requested.
pub struct AssembleMatrix {
    inputs: Vec<DataNode>,
    outputs: Vec<DataNode>,
    shape: (usize, usize),
    base: Option<Matrix<f64>>,
    terms: Vec<Matrix<f64>>,
    sparse: bool,
}

impl AssembleMatrix {
    pub fn new(weights: &DataNode, terms: Vec<Matrix<f64>>) -> Result<Self> {
        let shape = match terms.first() {
            Some(term) => term.shape(),
            None => return Err(Error::configuration("assembly needs at least one term")),
        };
        if let Some(position) = terms.iter().position(|term| term.shape() != shape) {
            return Err(Error::configuration(format!(
                "term {} has shape {:?}, expected {:?}",
                position,
                terms[position].shape(),
                shape
            )));
        }

        Ok(Self {
            inputs: vec![weights.clone()],
            outputs: vec![DataNode::new("assembled")],
            shape,
            sparse: terms.iter().any(Matrix::is_sparse),
            base: None,
            terms,
        })
    }

    /// Adds the constant part `A₀`.
    pub fn with_base(self, base: Matrix<f64>) -> Result<Self> {
        if base.shape() != self.shape {
            return Err(Error::configuration(format!(
                "base has shape {:?}, expected {:?}",
                base.shape(),
                self.shape
            )));
        }
        Ok(Self {
            base: Some(base),
            ..self
        })
    }

    /// Produces a dense matrix regardless of the terms' storage.
    pub fn dense(self) -> Self {
        Self {
            sparse: false,
            ..self
        }
    }

    pub fn tagged(self, tag: impl Into<String>) -> Self {
        Self {
            outputs: vec![DataNode::new(tag)],
            ..self
        }
    }

    fn weights(&self) -> Result<Vec<f64>> {
        let value = self.inputs[0].require_value()?;
        let weights = value.as_real().ok_or_else(|| {
            Error::configuration(format!("weights must be a real array, got a {}", value.kind()))
        })?;
        if weights.len() != self.terms.len() {
            return Err(Error::configuration(format!(
                "{} weights for {} terms",
                weights.len(),
                self.terms.len()
            )));
        }
        Ok(weights.iter().copied().collect())
    }
}

impl Forward for AssembleMatrix {
    fn forward(&mut self) -> Result<()> {
        let weights = self.weights()?;
        let weighted = self
            .base
            .iter()
            .map(|base| (1., base))
            .chain(weights.iter().copied().zip(self.terms.iter()));

        let assembled = if self.sparse {
            let mut triplets = TriMat::new(self.shape);
            for (weight, term) in weighted {
                for (row, col, value) in term.entries() {
                    triplets.add_triplet(row, col, weight * value);
                }
            }
            let matrix: CsMat<f64> = triplets.to_csc();
            trace!(nnz = matrix.nnz(), "assembled sparse matrix");
            Value::SparseReal(matrix)
        } else {
            let mut matrix = Array2::zeros(self.shape);
            for (weight, term) in weighted {
                match term {
                    Matrix::Dense(array) => matrix.scaled_add(weight, array),
                    Matrix::Sparse(_) => {
                        for (row, col, value) in term.entries() {
                            matrix[[row, col]] += weight * value;
                        }
                    }
                }
            }
            Value::Real(matrix.into_dyn())
        };
        self.outputs[0].set_value(assembled);
        Ok(())
    }
}

impl Backward for AssembleMatrix {
    fn backward(&mut self) -> Result<()> {
        let gradient = match self.outputs[0].gradient() {
            // real weights see the real part only
            Some(gradient) => gradient.real_part(),
            None => return Ok(()),
        };

        let contractions = match &gradient {
            Value::Dyad(dyad) => self
                .terms
                .iter()
                .map(|term| dyad.contract(term))
                .collect::<Result<Vec<_>>>()?,
            other => {
                let dense = other
                    .dense_real()
                    .into_dimensionality::<Ix2>()
                    .map_err(|error| Error::configuration(error.to_string()))?;
                self.terms
                    .iter()
                    .map(|term| {
                        term.entries()
                            .into_iter()
                            .map(|(row, col, value)| dense[[row, col]] * value)
                            .sum::<f64>()
                    })
                    .collect()
            }
        };

        let shape = self.inputs[0].require_value()?.shape();
        let gradient = Array1::from(contractions)
            .into_shape(shape)
            .map_err(|error| Error::configuration(error.to_string()))?;
        self.inputs[0].add_gradient(Value::Real(gradient))
    }
}

impl Transformation for AssembleMatrix {
    fn name(&self) -> &str {
        "assemble_matrix"
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
