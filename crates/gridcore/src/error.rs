use thiserror::Error;

/// Errors that abort a graph run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("required input '{param}' on node '{node_id}' must not be empty")]
    MissingRequired { node_id: String, param: String },

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("node '{0}' is referenced but not present in the graph")]
    NodeNotFound(String),

    #[error("dependency cycle detected at node '{0}'")]
    CyclicGraph(String),

    #[error("node '{node_id}' ({node_type}) failed: {message}")]
    HandlerFailed {
        node_id: String,
        node_type: String,
        message: String,
    },
}

/// Errors raised inside node handlers
///
/// The dispatch bridge wraps these into `EngineError::HandlerFailed`
/// together with the node's identity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid input '{field}': expected {expected}")]
    InvalidInput { field: String, expected: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::Io(err.to_string())
    }
}
