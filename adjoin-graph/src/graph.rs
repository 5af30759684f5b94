use std::{collections::HashMap, ops::Deref};

use adjoin_core::{Error, Result, Value};
use tracing::{debug, trace};

use crate::{DataNode, NodeView, Observer, Transformation};

/// The outputs of an appended node, in declaration order.
#[derive(Clone, Debug)]
pub struct Outputs(Vec<DataNode>);

impl Outputs {
    /// Returns the only output, failing if there are more or none.
    pub fn into_single(self) -> Result<DataNode> {
        let count = self.0.len();
        let mut outputs = self.0.into_iter();
        match (outputs.next(), outputs.next()) {
            (Some(output), None) => Ok(output),
            _ => Err(Error::configuration(format!(
                "expected a single output, found {}",
                count
            ))),
        }
    }

    pub fn into_vec(self) -> Vec<DataNode> {
        self.0
    }
}

impl Deref for Outputs {
    type Target = [DataNode];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An ordered sequence of transformation nodes.
///
/// Nodes run forward in registration order and backward in reverse order.
/// Since a node can only consume data nodes that are already registered, the
/// registration order is a topological order.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Box<dyn Transformation>>,
    data: Vec<DataNode>,
    // Producing node of each registered data node, `None` for states.
    producers: HashMap<usize, Option<usize>>,
    observers: Vec<Box<dyn Observer>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a root data node holding `value`.
    pub fn state(&mut self, tag: impl Into<String>, value: impl Into<Value>) -> DataNode {
        let node = DataNode::with_value(tag, value);
        self.register(&node);
        node
    }

    /// Registers an externally created data node as a root.
    ///
    /// Registering the same node twice has no effect.
    pub fn register(&mut self, node: &DataNode) {
        if self.producers.contains_key(&node.id()) {
            return;
        }
        self.producers.insert(node.id(), None);
        self.data.push(node.clone());
    }

    /// Whether `node` is known to the graph.
    pub fn contains(&self, node: &DataNode) -> bool {
        self.producers.contains_key(&node.id())
    }

    /// Appends a transformation and registers its outputs.
    ///
    /// Every input must already be registered and no output may have been
    /// registered before.
    pub fn append<N>(&mut self, node: N) -> Result<Outputs>
    where
        N: Transformation + 'static,
    {
        let index = self.nodes.len();
        let name = node.name().to_string();

        for input in node.inputs() {
            if !self.contains(input) {
                return Err(Error::configuration(format!(
                    "input `{}` is not registered in the graph",
                    input.tag()
                ))
                .in_node(name, index));
            }
        }
        for (position, output) in node.outputs().iter().enumerate() {
            let duplicate = node.outputs()[..position].contains(output);
            if duplicate || self.contains(output) {
                return Err(Error::configuration(format!(
                    "output `{}` already has a producer",
                    output.tag()
                ))
                .in_node(name, index));
            }
        }

        for output in node.outputs() {
            self.producers.insert(output.id(), Some(index));
            self.data.push(output.clone());
        }
        let outputs = Outputs(node.outputs().to_vec());
        debug!(node = %name, index, outputs = outputs.len(), "appended node");
        self.nodes.push(Box::new(node));
        Ok(outputs)
    }

    /// Number of transformation nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every registered data node, in registration order.
    pub fn data_nodes(&self) -> &[DataNode] {
        &self.data
    }

    /// The node producing `data`, by name and position.
    pub fn producer(&self, data: &DataNode) -> Option<(&str, usize)> {
        let index = (*self.producers.get(&data.id())?)?;
        Some((self.nodes[index].name(), index))
    }

    /// Adds an observer, invoked after every successful evaluation.
    pub fn observe<O>(&mut self, observer: O)
    where
        O: Observer + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Runs every node forward in registration order.
    pub fn evaluate(&mut self) -> Result<()> {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let name = node.name().to_string();
            debug!(node = %name, index, "forward");
            node.forward().map_err(|error| error.in_node(&name, index))?;

            for output in node.outputs() {
                check_output(output).map_err(|error| error.in_node(&name, index))?;
            }
        }

        let views: Vec<NodeView> = self.data.iter().map(NodeView::new).collect();
        for observer in self.observers.iter_mut() {
            observer.observe(&views)?;
        }
        Ok(())
    }

    /// Back-propagates from `seeds` to every ancestor.
    ///
    /// All gradients are cleared first, then each seed is added to the
    /// gradient of its node, so a node seeded twice receives the sum. Nodes
    /// whose outputs carry no gradient are skipped.
    pub fn propagate(&mut self, seeds: &[(DataNode, Value)]) -> Result<()> {
        self.data.iter().for_each(DataNode::reset_gradient);

        for (node, seed) in seeds {
            if !self.contains(node) {
                return Err(Error::configuration(format!(
                    "seeded node `{}` is not registered in the graph",
                    node.tag()
                )));
            }
            node.add_gradient(seed.clone())?;
        }

        for (index, node) in self.nodes.iter_mut().enumerate().rev() {
            if !node.outputs().iter().any(DataNode::has_gradient) {
                trace!(node = node.name(), index, "skipped, no output gradient");
                continue;
            }

            let name = node.name().to_string();
            debug!(node = %name, index, "backward");
            match node.as_backward() {
                Some(backward) => backward
                    .backward()
                    .map_err(|error| error.in_node(&name, index))?,
                None => {
                    return Err(
                        Error::SensitivityNotImplemented { node: name.clone() }.in_node(name, index)
                    )
                }
            }
        }
        Ok(())
    }
}

fn check_output(output: &DataNode) -> Result<()> {
    let value = output.value().ok_or_else(|| {
        Error::configuration(format!("output `{}` was not populated", output.tag()))
    })?;
    if let Some(shape) = output.declared_shape() {
        if value.shape() != shape {
            return Err(Error::configuration(format!(
                "output `{}` has shape {:?}, declared {:?}",
                output.tag(),
                value.shape(),
                shape
            )));
        }
    }
    Ok(())
}
