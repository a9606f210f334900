use flow_core::{CoreError, EdgeId, NodeId};
use thiserror::Error;

/// Usage errors raised by the engine. A middleware cancelling a command is
/// not an error; see `EmitOutcome::Cancelled`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid payload for '{command}': {message}")]
    InvalidPayload { command: String, message: String },

    #[error("Unknown savepoint '{0}'")]
    UnknownSavepoint(String),

    #[error("Transaction '{0}' was rolled back or has ended")]
    TransactionRolledBack(String),

    #[error("Node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(EdgeId),

    #[error("Duplicate node id '{0}'")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge id '{0}'")]
    DuplicateEdge(EdgeId),

    #[error("Node '{node}' cannot join '{group}': not a group")]
    InvalidGroup { node: NodeId, group: NodeId },

    #[error("Middleware '{name}' failed: {message}")]
    Middleware { name: String, message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
