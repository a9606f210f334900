//! Node commands: add, delete, patch, move, resize, rotate, z-order.

use super::{NodePosition, Resolution, ZOrderDirection, resolved};
use crate::error::{EngineError, Result};
use flow_core::geometry::{angle_between_points, normalize_angle};
use flow_core::{
    ActionType, EdgeId, FlowState, FlowStateUpdate, Node, NodeId, NodeUpdate, Point, Size,
};
use std::collections::HashSet;

fn node(state: &FlowState, id: NodeId) -> Result<&Node> {
    state.node(id).ok_or(EngineError::NodeNotFound(id))
}

/// `group` must be a group node, and not `node` itself or nested in it.
fn validate_group(state: &FlowState, node: NodeId, group: NodeId) -> Result<()> {
    let invalid = || EngineError::InvalidGroup { node, group };
    if group == node || !state.node(group).is_some_and(|g| g.is_group) {
        return Err(invalid());
    }
    if state.descendants_of(node).contains(&group) {
        return Err(invalid());
    }
    Ok(())
}

pub(super) fn add_nodes(state: &FlowState, nodes: Vec<Node>) -> Result<Resolution> {
    let mut ids: HashSet<NodeId> = state.nodes.iter().map(|n| n.id).collect();
    for n in &nodes {
        if !ids.insert(n.id) {
            return Err(EngineError::DuplicateNode(n.id));
        }
    }
    for n in &nodes {
        let Some(group) = n.group_id else {
            continue;
        };
        let is_group = state
            .node(group)
            .or_else(|| nodes.iter().find(|other| other.id == group))
            .is_some_and(|g| g.is_group);
        if group == n.id || !is_group {
            return Err(EngineError::InvalidGroup { node: n.id, group });
        }
    }
    Ok(resolved(
        FlowStateUpdate {
            nodes_to_add: nodes,
            ..Default::default()
        },
        ActionType::AddNodes,
    ))
}

/// Remove `node_ids` and `edge_ids` plus every edge attached to a removed
/// node. Children of removed groups are detached rather than removed.
pub(super) fn delete_items(
    state: &FlowState,
    node_ids: &HashSet<NodeId>,
    edge_ids: &HashSet<EdgeId>,
) -> FlowStateUpdate {
    let mut update = FlowStateUpdate::default();
    for n in &state.nodes {
        if node_ids.contains(&n.id) {
            update.nodes_to_remove.push(n.id);
        } else if n.group_id.is_some_and(|g| node_ids.contains(&g)) {
            update.nodes_to_update.push(NodeUpdate {
                group_id: Some(None),
                ..NodeUpdate::new(n.id)
            });
        }
    }
    update.edges_to_remove = state
        .edges
        .iter()
        .filter(|e| {
            edge_ids.contains(&e.id) || node_ids.contains(&e.source) || node_ids.contains(&e.target)
        })
        .map(|e| e.id)
        .collect();
    update
}

pub(super) fn delete_nodes(state: &FlowState, ids: &[NodeId], action: ActionType) -> Resolution {
    let ids: HashSet<NodeId> = ids.iter().copied().collect();
    resolved(delete_items(state, &ids, &HashSet::new()), action)
}

pub(super) fn update_nodes(state: &FlowState, patches: Vec<NodeUpdate>) -> Result<Resolution> {
    for patch in &patches {
        node(state, patch.id)?;
        if let Some(Some(group)) = patch.group_id {
            validate_group(state, patch.id, group)?;
        }
    }
    Ok(resolved(
        FlowStateUpdate {
            nodes_to_update: patches,
            ..Default::default()
        },
        ActionType::UpdateNode,
    ))
}

pub(super) fn move_nodes(state: &FlowState, moves: &[NodePosition]) -> Result<Resolution> {
    let mut update = FlowStateUpdate::default();
    for m in moves {
        node(state, m.id)?;
        update.nodes_to_update.push(NodeUpdate::position(m.id, m.position));
    }
    Ok(resolved(update, ActionType::MoveNodes))
}

pub(super) fn move_nodes_by(state: &FlowState, ids: &[NodeId], delta: Point) -> Result<Resolution> {
    if delta == Point::ZERO {
        return Ok(None);
    }
    let mut seen = HashSet::new();
    let mut update = FlowStateUpdate::default();
    for &id in ids {
        let n = node(state, id)?;
        if seen.insert(id) {
            update
                .nodes_to_update
                .push(NodeUpdate::position(id, n.position + delta));
        }
    }
    Ok(resolved(update, ActionType::MoveNodes))
}

/// Each dropped node joins the smallest group containing its center, or
/// leaves its group when dropped outside every group.
pub(super) fn move_nodes_stop(state: &FlowState, ids: &[NodeId]) -> Resolution {
    let mut update = FlowStateUpdate::default();
    for &id in ids {
        let Some(dropped) = state.node(id) else {
            continue;
        };
        let center = dropped.center();
        let mut excluded: HashSet<NodeId> = state.descendants_of(id).into_iter().collect();
        excluded.insert(id);

        let target = state
            .nodes
            .iter()
            .filter(|g| g.is_group && !excluded.contains(&g.id))
            .filter(|g| g.bounds().contains_point(center))
            .min_by(|a, b| a.bounds().area().total_cmp(&b.bounds().area()))
            .map(|g| g.id);

        if target != dropped.group_id {
            log::debug!("node '{id}' moves from {:?} to {:?}", dropped.group_id, target);
            update.nodes_to_update.push(NodeUpdate {
                group_id: Some(target),
                ..NodeUpdate::new(id)
            });
        }
    }
    resolved(update, ActionType::MoveNodesStop)
}

pub(super) fn resize_node(
    state: &FlowState,
    id: NodeId,
    size: Size,
    position: Option<Point>,
) -> Result<Resolution> {
    if !node(state, id)?.is_resizable() {
        return Ok(None);
    }
    let patch = NodeUpdate {
        size: Some(size),
        position,
        ..NodeUpdate::new(id)
    };
    Ok(resolved(
        FlowStateUpdate {
            nodes_to_update: vec![patch],
            ..Default::default()
        },
        ActionType::Resize,
    ))
}

fn rotate(n: &Node, by: f64) -> Resolution {
    if !n.is_rotatable() {
        return None;
    }
    let patch = NodeUpdate {
        angle: Some(normalize_angle(n.angle() + by)),
        ..NodeUpdate::new(n.id)
    };
    resolved(
        FlowStateUpdate {
            nodes_to_update: vec![patch],
            ..Default::default()
        },
        ActionType::Rotate,
    )
}

pub(super) fn rotate_node_by(state: &FlowState, id: NodeId, angle: f64) -> Result<Resolution> {
    Ok(rotate(node(state, id)?, angle))
}

pub(super) fn rotate_node_to(
    state: &FlowState,
    id: NodeId,
    handle: Point,
    pointer: Point,
) -> Result<Resolution> {
    let n = node(state, id)?;
    let swept = angle_between_points(handle, n.center(), pointer);
    Ok(rotate(n, swept))
}

pub(super) fn change_z_order(
    state: &FlowState,
    ids: &[NodeId],
    direction: ZOrderDirection,
) -> Resolution {
    let moving: HashSet<NodeId> = ids.iter().copied().collect();
    let ordered: Vec<NodeId> = state
        .nodes
        .iter()
        .filter(|n| moving.contains(&n.id))
        .map(|n| n.id)
        .collect();
    let others = state
        .nodes
        .iter()
        .filter(|n| !moving.contains(&n.id))
        .map(|n| n.z_order.unwrap_or(0));
    let count = ordered.len() as i32;
    let first = match direction {
        ZOrderDirection::BringToFront => others.max().unwrap_or(0) + 1,
        ZOrderDirection::SendToBack => others.min().unwrap_or(0) - count,
    };

    let mut update = FlowStateUpdate::default();
    for (i, id) in ordered.into_iter().enumerate() {
        update.nodes_to_update.push(NodeUpdate {
            z_order: Some(first + i as i32),
            ..NodeUpdate::new(id)
        });
    }
    resolved(update, ActionType::ChangeZOrder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{Edge, Metadata};
    use pretty_assertions::assert_eq;

    fn state() -> FlowState {
        FlowState::new(
            vec![
                Node::new("g", Point::new(0.0, 0.0)).with_size(400.0, 400.0).group(),
                Node::new("small", Point::new(50.0, 50.0))
                    .with_size(100.0, 100.0)
                    .group()
                    .in_group("g"),
                Node::new("a", Point::new(60.0, 60.0)).with_size(20.0, 20.0).in_group("small"),
                Node::new("b", Point::new(500.0, 0.0)).with_size(20.0, 20.0),
            ],
            vec![Edge::new("ab", "a", "b")],
            Metadata::default(),
        )
    }

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    #[test]
    fn add_rejects_duplicates_and_bad_groups() {
        let s = state();
        assert!(matches!(
            add_nodes(&s, vec![Node::new("a", Point::ZERO)]),
            Err(EngineError::DuplicateNode(_))
        ));
        assert!(matches!(
            add_nodes(&s, vec![Node::new("x", Point::ZERO).in_group("b")]),
            Err(EngineError::InvalidGroup { .. })
        ));
        let ok = add_nodes(
            &s,
            vec![
                Node::new("child", Point::ZERO).in_group("newGroup"),
                Node::new("newGroup", Point::ZERO).group(),
            ],
        )
        .unwrap();
        assert!(ok.is_some());
    }

    #[test]
    fn deleting_a_group_detaches_children_and_drops_edges() {
        let s = state();
        let (update, action) =
            delete_nodes(&s, &[id("small"), id("missing")], ActionType::DeleteNodes).unwrap();
        assert_eq!(action, ActionType::DeleteNodes);
        assert_eq!(update.nodes_to_remove, vec![id("small")]);
        assert_eq!(update.nodes_to_update[0].id, id("a"));
        assert_eq!(update.nodes_to_update[0].group_id, Some(None));
        assert!(update.edges_to_remove.is_empty());

        let (update, _) = delete_nodes(&s, &[id("a")], ActionType::DeleteNodes).unwrap();
        assert_eq!(update.edges_to_remove, vec![EdgeId::intern("ab")]);
        assert!(delete_nodes(&s, &[id("missing")], ActionType::DeleteNodes).is_none());
    }

    #[test]
    fn group_cycles_are_rejected() {
        let s = state();
        let patch = NodeUpdate {
            group_id: Some(Some(id("small"))),
            ..NodeUpdate::new(id("g"))
        };
        assert!(matches!(
            update_nodes(&s, vec![patch]),
            Err(EngineError::InvalidGroup { .. })
        ));
        assert!(matches!(
            update_nodes(&s, vec![NodeUpdate::new(id("nope"))]),
            Err(EngineError::NodeNotFound(_))
        ));
    }

    #[test]
    fn move_by_offsets_each_node_once() {
        let s = state();
        let (update, _) = move_nodes_by(&s, &[id("b"), id("b")], Point::new(5.0, -5.0))
            .unwrap()
            .unwrap();
        assert_eq!(
            update.nodes_to_update,
            vec![NodeUpdate::position(id("b"), Point::new(505.0, -5.0))]
        );
        assert!(move_nodes_by(&s, &[id("b")], Point::ZERO).unwrap().is_none());
    }

    #[test]
    fn drop_joins_smallest_group_or_leaves() {
        let mut s = state();
        // b dropped inside `small`.
        s.nodes[3].position = Point::new(90.0, 90.0);
        let (update, _) = move_nodes_stop(&s, &[id("b")]).unwrap();
        assert_eq!(update.nodes_to_update[0].group_id, Some(Some(id("small"))));

        // a dragged out of everything.
        s.nodes[2].position = Point::new(900.0, 900.0);
        let (update, _) = move_nodes_stop(&s, &[id("a")]).unwrap();
        assert_eq!(update.nodes_to_update[0].group_id, Some(None));

        // A group never joins itself or its children.
        assert!(move_nodes_stop(&s, &[id("g")]).is_none());
    }

    #[test]
    fn resize_and_rotate_respect_flags() {
        let mut s = state();
        s.nodes[3].resizable = Some(false);
        s.nodes[3].rotatable = Some(false);
        assert!(resize_node(&s, id("b"), Size::new(1.0, 1.0), None).unwrap().is_none());
        assert!(rotate_node_by(&s, id("b"), 45.0).unwrap().is_none());

        let (update, action) = rotate_node_by(&s, id("a"), -30.0).unwrap().unwrap();
        assert_eq!(action, ActionType::Rotate);
        assert_eq!(update.nodes_to_update[0].angle, Some(330.0));
    }

    #[test]
    fn rotate_to_uses_swept_angle_around_center() {
        let s = state();
        // a's center is (70, 70); dragging the handle from the right side
        // down to below the center is a quarter turn clockwise.
        let (update, _) =
            rotate_node_to(&s, id("a"), Point::new(80.0, 70.0), Point::new(70.0, 90.0))
                .unwrap()
                .unwrap();
        let angle = update.nodes_to_update[0].angle.unwrap();
        assert!((angle - 90.0).abs() < 1e-9);
        assert!(matches!(
            rotate_node_to(&s, id("ghost"), Point::ZERO, Point::ZERO),
            Err(EngineError::NodeNotFound(_))
        ));
    }

    #[test]
    fn z_order_goes_past_the_others() {
        let mut s = state();
        s.nodes[0].z_order = Some(3);
        let (update, _) =
            change_z_order(&s, &[id("b"), id("a")], ZOrderDirection::BringToFront).unwrap();
        let z: Vec<_> = update.nodes_to_update.iter().map(|u| (u.id, u.z_order)).collect();
        assert_eq!(z, vec![(id("a"), Some(4)), (id("b"), Some(5))]);

        let (update, _) = change_z_order(&s, &[id("b")], ZOrderDirection::SendToBack).unwrap();
        assert_eq!(update.nodes_to_update[0].z_order, Some(-1));
    }
}
