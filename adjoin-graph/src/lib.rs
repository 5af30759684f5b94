//! Reverse-mode sensitivity graphs.
//!
//! A [`Graph`] is an ordered list of [`Transformation`]s connected through
//! [`DataNode`]s. [`Graph::evaluate`] runs every node forward in the order it
//! was appended; [`Graph::propagate`] seeds the gradients of some responses
//! and runs the nodes backward in reverse order, accumulating a gradient on
//! every data node the responses depend on.
//!
//! ```
//! use adjoin_core::{Result, Value};
//! use adjoin_graph::{Backward, DataNode, Forward, Graph, Transformation};
//!
//! struct Square {
//!     inputs: Vec<DataNode>,
//!     outputs: Vec<DataNode>,
//! }
//!
//! impl Forward for Square {
//!     fn forward(&mut self) -> Result<()> {
//!         let x = self.inputs[0].require_value()?.dense_real();
//!         self.outputs[0].set_value(&x * &x);
//!         Ok(())
//!     }
//! }
//!
//! impl Backward for Square {
//!     fn backward(&mut self) -> Result<()> {
//!         if let Some(g) = self.outputs[0].gradient().map(|g| g.dense_real()) {
//!             let x = self.inputs[0].require_value()?.dense_real();
//!             self.inputs[0].add_gradient(Value::from(g * x * 2.))?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Transformation for Square {
//!     fn name(&self) -> &str {
//!         "square"
//!     }
//!
//!     fn inputs(&self) -> &[DataNode] {
//!         &self.inputs
//!     }
//!
//!     fn outputs(&self) -> &[DataNode] {
//!         &self.outputs
//!     }
//!
//!     fn as_backward(&mut self) -> Option<&mut dyn Backward> {
//!         Some(self)
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let mut graph = Graph::new();
//! let x = graph.state("x", 3.);
//! let y = graph
//!     .append(Square {
//!         inputs: vec![x.clone()],
//!         outputs: vec![DataNode::new("y")],
//!     })?
//!     .into_single()?;
//!
//! graph.evaluate()?;
//! graph.propagate(&[(y.clone(), Value::scalar(1.))])?;
//!
//! assert_eq!(y.value().unwrap().item(), Some(9.));
//! assert_eq!(x.gradient().unwrap().item(), Some(6.));
//! # Ok(())
//! # }
//! ```
mod data;
pub mod finite_difference;
mod graph;
mod observer;
mod transform;
mod utils;

pub use crate::{
    data::DataNode,
    finite_difference::{finite_difference, FiniteDifferenceOptions},
    graph::{Graph, Outputs},
    observer::{NodeView, Observer, TracingObserver},
    transform::{Backward, Forward, Transformation},
};
