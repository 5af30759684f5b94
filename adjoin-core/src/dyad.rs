use ndarray::{Array1, Array2, ArrayView2};
use num_traits::Zero;

use crate::{c64, Error, Matrix, Result, Scalar};

/// A sum of outer products `Σ u_k ⊗ v_k`.
///
/// Used as the gradient of sparse matrices: the adjoint of a linear solve is
/// rank one per load case, so storing the factors avoids a dense `n × n`
/// gradient.
#[derive(Clone, Debug)]
pub struct DyadCarrier<T> {
    shape: (usize, usize),
    u: Vec<Array1<T>>,
    v: Vec<Array1<T>>,
}

impl<T> DyadCarrier<T>
where
    T: Scalar,
{
    /// Creates an empty carrier, i.e. a zero matrix of the given shape.
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            u: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Creates the single dyad `u ⊗ v`.
    pub fn from_pair(u: Array1<T>, v: Array1<T>) -> Self {
        Self {
            shape: (u.len(), v.len()),
            u: vec![u],
            v: vec![v],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of stored dyads.
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// Iterates over the `(u, v)` pairs.
    pub fn terms(&self) -> impl Iterator<Item = (&Array1<T>, &Array1<T>)> {
        self.u.iter().zip(self.v.iter())
    }

    /// Adds the dyad `u ⊗ v`.
    pub fn push(&mut self, u: Array1<T>, v: Array1<T>) -> Result<()> {
        if (u.len(), v.len()) != self.shape {
            return Err(Error::configuration(format!(
                "dyad of shape {}x{} does not fit a {}x{} carrier",
                u.len(),
                v.len(),
                self.shape.0,
                self.shape.1
            )));
        }
        self.u.push(u);
        self.v.push(v);
        Ok(())
    }

    /// Moves every dyad of `other` into `self`.
    pub fn extend(&mut self, other: DyadCarrier<T>) -> Result<()> {
        if other.shape != self.shape {
            return Err(Error::configuration(format!(
                "cannot add a {}x{} dyad carrier to a {}x{} one",
                other.shape.0, other.shape.1, self.shape.0, self.shape.1
            )));
        }
        self.u.extend(other.u);
        self.v.extend(other.v);
        Ok(())
    }

    /// Entry `(i, j)` of the represented matrix.
    pub fn get(&self, i: usize, j: usize) -> T {
        self.terms()
            .fold(T::zero(), |acc, (u, v)| acc + u[i] * v[j])
    }

    /// Main diagonal of the represented matrix.
    pub fn diagonal(&self) -> Array1<T> {
        let n = self.shape.0.min(self.shape.1);
        let mut diagonal = Array1::zeros(n);
        for (u, v) in self.terms() {
            diagonal
                .iter_mut()
                .enumerate()
                .for_each(|(i, d)| *d += u[i] * v[i]);
        }
        diagonal
    }

    /// Materializes the represented matrix.
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::zeros(self.shape);
        for (u, v) in self.terms() {
            for (i, &ui) in u.iter().enumerate() {
                if ui.is_zero() {
                    continue;
                }
                dense.row_mut(i).scaled_add(ui, v);
            }
        }
        dense
    }

    /// Computes `Σ_ij D_ij M_ij`, the bilinear contraction with `matrix`.
    pub fn contract(&self, matrix: &Matrix<T>) -> Result<T> {
        if matrix.shape() != self.shape {
            return Err(Error::configuration(
                "contraction operand does not match the dyad shape",
            ));
        }
        let mut total = T::zero();
        for (u, v) in self.terms() {
            let mv = matrix.dot(&v.view().insert_axis(ndarray::Axis(1)))?;
            total += u.iter().zip(mv.iter()).fold(T::zero(), |acc, (&a, &b)| acc + a * b);
        }
        Ok(total)
    }

    /// Contracts with a dense block placed at `rows × cols` of the full matrix.
    ///
    /// This is the element-wise building block of assembled operators:
    /// `Σ_k u_k[rows]ᵀ B v_k[cols]`.
    pub fn contract_block(&self, block: &ArrayView2<T>, rows: &[usize], cols: &[usize]) -> T {
        let mut total = T::zero();
        for (u, v) in self.terms() {
            for (a, &row) in rows.iter().enumerate() {
                let ui = u[row];
                if ui.is_zero() {
                    continue;
                }
                let inner = cols
                    .iter()
                    .enumerate()
                    .fold(T::zero(), |acc, (b, &col)| acc + block[[a, b]] * v[col]);
                total += ui * inner;
            }
        }
        total
    }

    /// Multiplies every dyad by `factor`.
    pub fn scaled(&self, factor: T) -> Self {
        Self {
            shape: self.shape,
            u: self.u.iter().map(|u| u * factor).collect(),
            v: self.v.clone(),
        }
    }

    /// Element-wise conjugate of the represented matrix.
    pub fn conj(&self) -> Self {
        Self {
            shape: self.shape,
            u: self.u.iter().map(|u| u.mapv(Scalar::conj)).collect(),
            v: self.v.iter().map(|v| v.mapv(Scalar::conj)).collect(),
        }
    }

    /// Converts each factor with `f`.
    pub fn map<U, F>(&self, f: F) -> DyadCarrier<U>
    where
        U: Scalar,
        F: Fn(T) -> U,
    {
        DyadCarrier {
            shape: self.shape,
            u: self.u.iter().map(|u| u.mapv(&f)).collect(),
            v: self.v.iter().map(|v| v.mapv(&f)).collect(),
        }
    }
}

impl DyadCarrier<c64> {
    /// Real part of the represented matrix.
    ///
    /// `Re(u vᵀ) = Re u Re vᵀ - Im u Im vᵀ`, so every complex dyad becomes two
    /// real ones.
    pub fn real_part(&self) -> DyadCarrier<f64> {
        let mut real = DyadCarrier::new(self.shape);
        for (u, v) in self.terms() {
            real.u.push(u.mapv(|z| z.re));
            real.v.push(v.mapv(|z| z.re));
            real.u.push(u.mapv(|z| -z.im));
            real.v.push(v.mapv(|z| z.im));
        }
        real
    }
}
