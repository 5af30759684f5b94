//! Error types shared by every adjoin crate.

use thiserror::Error;

/// Errors raised while building, evaluating or differentiating a graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed graph construction or incompatible values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No solver can handle a matrix of this shape.
    #[error("unsupported matrix shape {rows}x{cols}: {reason}")]
    UnsupportedMatrixShape {
        rows: usize,
        cols: usize,
        reason: String,
    },

    /// Caller-provided structural hints contradict each other.
    #[error("inconsistent override: {0}")]
    InconsistentOverride(String),

    /// The matrix has no unique solution.
    #[error("singular matrix: zero pivot at index {index}")]
    SingularMatrix { index: usize },

    /// The solve produced non-finite values or an excessive residual.
    #[error("numerical solve error: {0}")]
    NumericalSolve(String),

    /// Backward was requested through a node that has no sensitivity.
    #[error("sensitivity not implemented for node `{node}`")]
    SensitivityNotImplemented { node: String },

    /// An error raised inside a registered transformation node.
    #[error("in node `{node}` (position {index}): {source}")]
    InNode {
        node: String,
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a [`Error::Configuration`] from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a [`Error::NumericalSolve`] from any message.
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::NumericalSolve(message.into())
    }

    /// Attaches the name and position of the node that raised `self`.
    pub fn in_node(self, node: impl Into<String>, index: usize) -> Self {
        Self::InNode {
            node: node.into(),
            index,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping node context wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::InNode { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<sprs::errors::LinalgError> for Error {
    fn from(error: sprs::errors::LinalgError) -> Self {
        match error {
            sprs::errors::LinalgError::SingularMatrix(info) => {
                Self::SingularMatrix { index: info.index }
            }
            other => Self::NumericalSolve(other.to_string()),
        }
    }
}
