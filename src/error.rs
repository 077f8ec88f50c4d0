use thiserror::Error;

/// Result type alias used across the graph engine.
pub type Result<T> = std::result::Result<T, GraphBoltError>;

/// Error kinds raised by construction, queries and archive I/O.
///
/// Every error is raised synchronously: a graph either exists with all of its
/// invariants holding, or the operation fails and nothing is produced.
#[derive(Error, Debug)]
pub enum GraphBoltError {
    /// Malformed metadata, inconsistent heterogeneous bundle or bad array shape.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A queried node id is outside `[0, num_nodes)`.
    #[error("node {node} is out of range for a graph with {num_nodes} nodes")]
    Index { node: u64, num_nodes: u64 },

    /// A queried edge id is outside `[0, num_edges)`.
    #[error("edge {edge} is out of range for a graph with {num_edges} edges")]
    EdgeIndex { edge: u64, num_edges: u64 },

    /// The archive is missing sections or its sections disagree with each other.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GraphBoltError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GraphBoltError::Validation(message.into())
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        GraphBoltError::CorruptArchive(message.into())
    }
}
