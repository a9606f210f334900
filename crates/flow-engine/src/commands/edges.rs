//! Edge commands and interactive linking.
//!
//! A link in progress lives in `Metadata::temporary_edge`: its source is
//! the node the drag started from and its target is the empty id, with the
//! free end in `target_position`.

use super::{Resolution, resolved};
use crate::error::{EngineError, Result};
use flow_core::{
    ActionType, Edge, EdgeId, EdgeUpdate, FlowState, FlowStateUpdate, MetadataUpdate, NodeId,
    Point, PortId, PortSide,
};
use std::collections::HashSet;

pub const TEMPORARY_EDGE_ID: &str = "temporary-edge";

pub(super) fn add_edges(state: &FlowState, edges: Vec<Edge>) -> Result<Resolution> {
    let mut ids: HashSet<EdgeId> = state.edges.iter().map(|e| e.id).collect();
    for e in &edges {
        if !ids.insert(e.id) {
            return Err(EngineError::DuplicateEdge(e.id));
        }
    }
    Ok(resolved(
        FlowStateUpdate {
            edges_to_add: edges,
            ..Default::default()
        },
        ActionType::AddEdges,
    ))
}

pub(super) fn delete_edges(state: &FlowState, ids: &[EdgeId]) -> Resolution {
    let ids: HashSet<EdgeId> = ids.iter().copied().collect();
    let update = FlowStateUpdate {
        edges_to_remove: state
            .edges
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(|e| e.id)
            .collect(),
        ..Default::default()
    };
    resolved(update, ActionType::DeleteEdges)
}

pub(super) fn update_edges(state: &FlowState, patches: Vec<EdgeUpdate>) -> Result<Resolution> {
    if let Some(missing) = patches.iter().find(|p| state.edge(p.id).is_none()) {
        return Err(EngineError::EdgeNotFound(missing.id));
    }
    Ok(resolved(
        FlowStateUpdate {
            edges_to_update: patches,
            ..Default::default()
        },
        ActionType::UpdateEdge,
    ))
}

fn temporary_edge_update(edge: Option<Edge>) -> FlowStateUpdate {
    FlowStateUpdate::with_metadata(MetadataUpdate {
        temporary_edge: Some(edge),
        ..Default::default()
    })
}

pub(super) fn start_linking(
    state: &FlowState,
    source: NodeId,
    source_port: Option<PortId>,
) -> Result<Resolution> {
    let node = state.node(source).ok_or(EngineError::NodeNotFound(source))?;
    let anchor = node.port_location(source_port, PortSide::Right);
    let mut temp = Edge::new(TEMPORARY_EDGE_ID, source.as_str(), "");
    temp.source_port = source_port;
    temp.target_position = Some(anchor.point);
    Ok(resolved(temporary_edge_update(Some(temp)), ActionType::StartLinking))
}

pub(super) fn move_temporary_edge(state: &FlowState, position: Point) -> Resolution {
    let temp = state.metadata.temporary_edge.as_ref()?;
    let moved = Edge {
        target_position: Some(position),
        ..temp.clone()
    };
    resolved(temporary_edge_update(Some(moved)), ActionType::MoveTemporaryEdge)
}

/// Turn the temporary edge into a real one when dropped on an existing
/// node; otherwise just discard it.
pub(super) fn finish_linking(
    state: &FlowState,
    target: Option<NodeId>,
    target_port: Option<PortId>,
) -> Resolution {
    let temp = state.metadata.temporary_edge.as_ref()?;
    let mut update = temporary_edge_update(None);
    if let Some(target) = target.filter(|t| state.node(*t).is_some()) {
        update.edges_to_add.push(Edge {
            id: EdgeId::unused_with_prefix("edge", |id| state.edge(id).is_some()),
            target,
            target_port,
            target_position: None,
            points: Vec::new(),
            ..temp.clone()
        });
    }
    resolved(update, ActionType::FinishLinking)
}
