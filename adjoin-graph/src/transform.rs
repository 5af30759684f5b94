use adjoin_core::Result;

use crate::DataNode;

/// Forward-propagation behavior.
///
/// Computes the outputs of a node from the current values of its inputs.
pub trait Forward {
    /// Populates every output of the node.
    fn forward(&mut self) -> Result<()>;
}

/// Back-propagation behavior.
///
/// Reads the gradients accumulated on the outputs and adds the resulting
/// contributions to the gradients of the inputs.
pub trait Backward {
    /// Adds this node's contribution to its inputs' gradients.
    ///
    /// Inputs may be skipped, which counts as a zero contribution. Outputs
    /// whose gradient is neutral contribute nothing.
    fn backward(&mut self) -> Result<()>;
}

/// A unit of computation registered in a [`Graph`](crate::Graph).
pub trait Transformation: Forward {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    fn inputs(&self) -> &[DataNode];

    /// Outputs, created together with the node.
    fn outputs(&self) -> &[DataNode];

    /// The backward behavior, if the node has one.
    fn as_backward(&mut self) -> Option<&mut dyn Backward> {
        None
    }
}
