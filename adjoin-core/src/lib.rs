//! Shared value model of the adjoin workspace.
//!
//! Every data node of a sensitivity graph holds a [`Value`]: a dense real or
//! complex array, a sparse matrix, or a [`DyadCarrier`] (the low-rank gradient
//! of a sparse matrix). Numerical code is written once over the [`Scalar`]
//! trait, implemented for `f64` and [`c64`], and operates on [`Matrix`]
//! operators that are either dense or sparse.

mod dyad;
mod error;
mod matrix;
mod scalar;
mod value;

pub use crate::{
    dyad::DyadCarrier,
    error::{Error, Result},
    matrix::Matrix,
    scalar::{c64, Scalar},
    value::{zeros, Value},
};
