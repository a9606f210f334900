//! Tree layout and viewport commands.

use super::{Resolution, resolved};
use crate::config::{TreeLayoutConfig, ZoomConfig};
use flow_core::geometry::{Rect, clamp};
use flow_core::{
    ActionType, FlowState, FlowStateUpdate, MetadataUpdate, NodeId, NodeUpdate, Point, Viewport,
};
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Arrange top-level, non-group nodes in rows by their breadth-first depth
/// from the roots (nodes without incoming edges). Nodes only reachable
/// through cycles start a tree of their own. Rows keep model order and
/// start at the current top-left of the arranged nodes.
pub(super) fn tree_layout(state: &FlowState, config: &TreeLayoutConfig) -> Resolution {
    let laid: Vec<_> = state
        .nodes
        .iter()
        .filter(|n| n.group_id.is_none() && !n.is_group)
        .collect();
    let origin = Rect::bounding(laid.iter().map(|n| n.position))?;

    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let index: HashMap<NodeId, NodeIndex> =
        laid.iter().map(|n| (n.id, graph.add_node(n.id))).collect();
    for e in &state.edges {
        if let (Some(&s), Some(&t)) = (index.get(&e.source), index.get(&e.target))
            && s != t
        {
            graph.update_edge(s, t, ());
        }
    }

    let mut levels: HashMap<NodeIndex, usize> = HashMap::new();
    let roots = laid.iter().filter_map(|n| index.get(&n.id).copied()).filter(|&i| {
        graph
            .neighbors_directed(i, petgraph::Direction::Incoming)
            .next()
            .is_none()
    });
    for root in roots {
        for (node, depth) in dijkstra(&graph, root, None, |_| 1usize) {
            levels
                .entry(node)
                .and_modify(|level| *level = (*level).min(depth))
                .or_insert(depth);
        }
    }
    for n in &laid {
        let Some(&i) = index.get(&n.id) else {
            continue;
        };
        if levels.contains_key(&i) {
            continue;
        }
        for (node, depth) in dijkstra(&graph, i, None, |_| 1usize) {
            levels.entry(node).or_insert(depth);
        }
    }

    let depth = levels.values().copied().max().unwrap_or(0);
    let mut rows: Vec<Vec<NodeId>> = vec![Vec::new(); depth + 1];
    for n in &laid {
        if let Some(level) = index.get(&n.id).and_then(|i| levels.get(i)) {
            rows[*level].push(n.id);
        }
    }

    let mut update = FlowStateUpdate::default();
    let mut y = origin.y;
    for row in rows {
        let mut x = origin.x;
        let mut row_height: f64 = 0.0;
        for id in row {
            let Some(node) = state.node(id) else {
                continue;
            };
            let size = node.size.unwrap_or_default();
            let position = Point::new(x, y);
            if position != node.position {
                update.nodes_to_update.push(NodeUpdate::position(id, position));
            }
            x += size.width + config.sibling_gap;
            row_height = row_height.max(size.height);
        }
        y += row_height + config.level_gap;
    }
    log::debug!("tree layout over {} nodes, {} levels", laid.len(), depth + 1);
    resolved(update, ActionType::TreeLayout)
}

fn viewport_update(viewport: Viewport, action: ActionType) -> Resolution {
    resolved(
        FlowStateUpdate::with_metadata(MetadataUpdate {
            viewport: Some(viewport),
            ..Default::default()
        }),
        action,
    )
}

pub(super) fn move_viewport_by(state: &FlowState, delta: Point) -> Resolution {
    if delta == Point::ZERO {
        return None;
    }
    let current = state.metadata.viewport;
    let viewport = Viewport {
        x: current.x + delta.x,
        y: current.y + delta.y,
        ..current
    };
    viewport_update(viewport, ActionType::MoveViewport)
}

/// Set the scale, clamped to the configured range. A `center` in screen
/// coordinates stays put.
pub(super) fn zoom(
    state: &FlowState,
    scale: f64,
    center: Option<Point>,
    config: &ZoomConfig,
) -> Resolution {
    let current = state.metadata.viewport;
    let scale = clamp(scale, config.min, config.max);
    if scale == current.scale {
        return None;
    }
    let (x, y) = match center {
        Some(c) if current.scale != 0.0 => {
            let ratio = scale / current.scale;
            (c.x - (c.x - current.x) * ratio, c.y - (c.y - current.y) * ratio)
        }
        _ => (current.x, current.y),
    };
    viewport_update(
        Viewport {
            x,
            y,
            scale,
            ..current
        },
        ActionType::Zoom,
    )
}
