//! Selection and group highlighting. Selection lives in the `selected`
//! flags of nodes and edges; unknown ids are ignored.

use super::{Resolution, resolved};
use crate::error::{EngineError, Result};
use flow_core::{ActionType, EdgeId, EdgeUpdate, FlowState, FlowStateUpdate, NodeId, NodeUpdate};
use std::collections::HashSet;

/// Patch every item whose flag differs from `wanted`.
fn selection_update(
    state: &FlowState,
    wanted_node: impl Fn(NodeId, bool) -> bool,
    wanted_edge: impl Fn(EdgeId, bool) -> bool,
) -> Resolution {
    let mut update = FlowStateUpdate::default();
    for n in &state.nodes {
        let selected = wanted_node(n.id, n.selected);
        if selected != n.selected {
            update.nodes_to_update.push(NodeUpdate::selected(n.id, selected));
        }
    }
    for e in &state.edges {
        let selected = wanted_edge(e.id, e.selected);
        if selected != e.selected {
            update.edges_to_update.push(EdgeUpdate::selected(e.id, selected));
        }
    }
    resolved(update, ActionType::ChangeSelection)
}

pub(super) fn set_selected(
    state: &FlowState,
    nodes: &[NodeId],
    edges: &[EdgeId],
    selected: bool,
) -> Resolution {
    let nodes: HashSet<NodeId> = nodes.iter().copied().collect();
    let edges: HashSet<EdgeId> = edges.iter().copied().collect();
    selection_update(
        state,
        |id, current| if nodes.contains(&id) { selected } else { current },
        |id, current| if edges.contains(&id) { selected } else { current },
    )
}

pub(super) fn deselect_all(state: &FlowState) -> Resolution {
    selection_update(state, |_, _| false, |_, _| false)
}

pub(super) fn change_selection(
    state: &FlowState,
    nodes: &[NodeId],
    edges: &[EdgeId],
) -> Resolution {
    let nodes: HashSet<NodeId> = nodes.iter().copied().collect();
    let edges: HashSet<EdgeId> = edges.iter().copied().collect();
    selection_update(
        state,
        |id, _| nodes.contains(&id),
        |id, _| edges.contains(&id),
    )
}

fn highlight(state: &FlowState, target: Option<NodeId>) -> Resolution {
    let mut update = FlowStateUpdate::default();
    for n in &state.nodes {
        let wanted = Some(n.id) == target;
        if wanted != n.highlighted {
            update.nodes_to_update.push(NodeUpdate {
                highlighted: Some(wanted),
                ..NodeUpdate::new(n.id)
            });
        }
    }
    resolved(update, ActionType::HighlightGroup)
}

/// Highlight one group, typically the drop target under a dragged node.
pub(super) fn highlight_group(state: &FlowState, id: NodeId) -> Result<Resolution> {
    let group = state.node(id).ok_or(EngineError::NodeNotFound(id))?;
    if !group.is_group {
        return Err(EngineError::InvalidGroup { node: id, group: id });
    }
    Ok(highlight(state, Some(id)))
}

pub(super) fn highlight_group_clear(state: &FlowState) -> Resolution {
    highlight(state, None)
}
