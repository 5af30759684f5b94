use std::cell::Ref;

use adjoin_core::{Result, Value};
use tracing::info;

use crate::DataNode;

/// Read access to a data node, handed to observers.
#[derive(Clone, Copy)]
pub struct NodeView<'a>(&'a DataNode);

impl<'a> NodeView<'a> {
    pub(crate) fn new(node: &'a DataNode) -> Self {
        Self(node)
    }

    pub fn tag(&self) -> Ref<'a, str> {
        self.0.tag()
    }

    pub fn value(&self) -> Option<Ref<'a, Value>> {
        self.0.value()
    }

    pub fn has_value(&self) -> bool {
        self.0.has_value()
    }
}

/// Callback invoked after every successful
/// [`evaluate`](crate::Graph::evaluate).
pub trait Observer {
    /// Receives every data node known to the graph, in registration order.
    fn observe(&mut self, nodes: &[NodeView<'_>]) -> Result<()>;
}

impl<F> Observer for F
where
    F: FnMut(&[NodeView<'_>]) -> Result<()>,
{
    fn observe(&mut self, nodes: &[NodeView<'_>]) -> Result<()> {
        self(nodes)
    }
}

/// Logs the value of scalar data nodes at `info` level.
///
/// With no tags every scalar node is reported.
#[derive(Clone, Debug, Default)]
pub struct TracingObserver {
    tags: Vec<String>,
    evaluations: usize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports only the nodes carrying one of `tags`.
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            evaluations: 0,
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl Observer for TracingObserver {
    fn observe(&mut self, nodes: &[NodeView<'_>]) -> Result<()> {
        self.evaluations += 1;
        for node in nodes {
            let tag = node.tag();
            if !self.tags.is_empty() && !self.tags.iter().any(|t| t == &*tag) {
                continue;
            }
            if let Some(value) = node.value().and_then(|value| value.item()) {
                info!(evaluation = self.evaluations, node = &*tag, value, "response");
            }
        }
        Ok(())
    }
}
