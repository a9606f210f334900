use crate::id::{EdgeId, NodeId};
use thiserror::Error;

/// Errors raised while loading or serializing a flow state.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge id '{0}'")]
    DuplicateEdge(EdgeId),

    #[error("Node '{node}' references '{group}' as its group, but that node is not a group")]
    InvalidGroup { node: NodeId, group: NodeId },

    #[error("Failed to (de)serialize flow state: {0}")]
    Serialization(#[from] serde_json::Error),
}
