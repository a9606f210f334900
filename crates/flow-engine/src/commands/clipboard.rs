//! Copy/paste and bulk removal.

use super::nodes::delete_items;
use super::{Resolution, resolved};
use flow_core::geometry::Rect;
use flow_core::{
    ActionType, Edge, EdgeId, EdgeUpdate, FlowState, FlowStateUpdate, MetadataUpdate, Node,
    NodeId, NodeUpdate, Point,
};
use std::collections::{HashMap, HashSet};

/// Nodes and edges captured by `copy`.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Clipboard {
    /// The selected nodes with everything nested in them, and the edges
    /// running between captured nodes.
    pub fn capture(state: &FlowState) -> Self {
        let mut ids: HashSet<NodeId> = HashSet::new();
        for n in state.selected_nodes() {
            ids.insert(n.id);
            ids.extend(state.descendants_of(n.id));
        }
        let nodes: Vec<Node> = state
            .nodes
            .iter()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect();
        let edges = state
            .edges
            .iter()
            .filter(|e| ids.contains(&e.source) && ids.contains(&e.target))
            .cloned()
            .collect();
        log::debug!("copied {} nodes", nodes.len());
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Fresh copies of the clipboard, selected in place of the current
    /// selection. With a `position` the copies' top-left lands there.
    /// Otherwise they are shifted by `offset` steps, one more step for every
    /// earlier copy already sitting on the cascade, so repeated pastes fan
    /// out and a paste that never committed leaves no gap.
    pub fn paste(&self, state: &FlowState, position: Option<Point>, offset: f64) -> Resolution {
        let origin = Rect::bounding(self.nodes.iter().map(|n| n.position))?;
        let shift = match position {
            Some(p) => p - Point::new(origin.x, origin.y),
            None => cascade_shift(state, &self.nodes, offset),
        };

        let ids: HashMap<NodeId, NodeId> = self
            .nodes
            .iter()
            .map(|n| {
                let taken = |id: NodeId| state.node(id).is_some();
                (n.id, NodeId::unused_with_prefix(n.id.as_str(), taken))
            })
            .collect();

        let mut update = FlowStateUpdate::default();
        for n in state.selected_nodes() {
            update.nodes_to_update.push(NodeUpdate::selected(n.id, false));
        }
        for e in state.selected_edges() {
            update.edges_to_update.push(EdgeUpdate::selected(e.id, false));
        }

        for n in &self.nodes {
            let Some(&id) = ids.get(&n.id) else {
                continue;
            };
            // Copied groups are remapped; groups left behind are kept if they still exist.
            let group_id = n.group_id.and_then(|g| {
                ids.get(&g)
                    .copied()
                    .or_else(|| state.node(g).filter(|x| x.is_group).map(|x| x.id))
            });
            update.nodes_to_add.push(Node {
                id,
                position: n.position + shift,
                group_id,
                selected: true,
                highlighted: false,
                ..n.clone()
            });
        }
        for e in &self.edges {
            let (Some(&source), Some(&target)) = (ids.get(&e.source), ids.get(&e.target)) else {
                continue;
            };
            update.edges_to_add.push(Edge {
                id: EdgeId::unused_with_prefix(e.id.as_str(), |id| state.edge(id).is_some()),
                source,
                target,
                points: e.points.iter().map(|p| *p + shift).collect(),
                selected: true,
                ..e.clone()
            });
        }

        resolved(update, ActionType::Paste)
    }
}

/// The first cascade step not already covered by an earlier copy, i.e. one
/// where some copied node would land on an empty spot.
fn cascade_shift(state: &FlowState, copied: &[Node], offset: f64) -> Point {
    let step = Point::new(offset, offset);
    let occupied = |k: usize| {
        let shift = step * k as f64;
        copied.iter().all(|c| {
            let at = c.position + shift;
            state.nodes.iter().any(|n| n.position == at)
        })
    };
    let k = (1..=state.nodes.len() + 1).find(|k| !occupied(*k)).unwrap_or(1);
    step * k as f64
}

pub(super) fn delete_selection(state: &FlowState) -> Resolution {
    let nodes: HashSet<NodeId> = state.selected_nodes().map(|n| n.id).collect();
    let edges: HashSet<EdgeId> = state.selected_edges().map(|e| e.id).collect();
    resolved(delete_items(state, &nodes, &edges), ActionType::DeleteSelection)
}

pub(super) fn clear_model(state: &FlowState) -> Resolution {
    let mut update = FlowStateUpdate {
        nodes_to_remove: state.nodes.iter().map(|n| n.id).collect(),
        edges_to_remove: state.edges.iter().map(|e| e.id).collect(),
        ..Default::default()
    };
    if state.metadata.temporary_edge.is_some() {
        update.metadata_update = Some(MetadataUpdate {
            temporary_edge: Some(None),
            ..Default::default()
        });
    }
    resolved(update, ActionType::ClearModel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::Metadata;

    fn state() -> FlowState {
        let mut g = Node::new("g", Point::new(100.0, 100.0)).group();
        g.selected = true;
        let mut loose = Edge::new("out", "child", "outside");
        loose.selected = true;
        FlowState::new(
            vec![
                g,
                Node::new("child", Point::new(120.0, 120.0)).in_group("g"),
                Node::new("outside", Point::new(0.0, 0.0)),
            ],
            vec![Edge::new("inner", "g", "child"), loose],
            Metadata::default(),
        )
    }

    #[test]
    fn copy_takes_descendants_and_internal_edges() {
        let clip = Clipboard::capture(&state());
        let ids: Vec<_> = clip.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["g", "child"]);
        assert_eq!(clip.edges.len(), 1);
    }

    #[test]
    fn paste_remaps_ids_groups_and_selection() {
        let s = state();
        let clip = Clipboard::capture(&s);
        let (update, action) = clip.paste(&s, None, 20.0).unwrap();
        assert_eq!(action, ActionType::Paste);

        let pasted = s.applied(&update);
        pasted.validate().unwrap();
        assert_eq!(pasted.nodes.len(), 5);
        let selected: Vec<_> = pasted.selected_nodes().collect();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].position, Point::new(120.0, 120.0));
        assert_eq!(selected[1].group_id, Some(selected[0].id));
        assert_ne!(selected[0].id, NodeId::intern("g"));

        let new_edge = &update.edges_to_add[0];
        assert_eq!((new_edge.source, new_edge.target), (selected[0].id, selected[1].id));
        assert_eq!(pasted.selected_edges().count(), 1);

        // The second paste cascades.
        let (again, _) = clip.paste(&pasted, None, 20.0).unwrap();
        assert_eq!(again.nodes_to_add[0].position, Point::new(140.0, 140.0));
    }

    #[test]
    fn uncommitted_paste_does_not_advance_the_cascade() {
        let s = state();
        let clip = Clipboard::capture(&s);
        let (first, _) = clip.paste(&s, None, 20.0).unwrap();
        // Discarded: the next paste against the same state lands in the same spot.
        let (second, _) = clip.paste(&s, None, 20.0).unwrap();
        assert_eq!(
            first.nodes_to_add[0].position,
            second.nodes_to_add[0].position
        );
    }

    #[test]
    fn pasted_ids_avoid_existing_ones() {
        let mut s = state();
        let next = NodeId::with_prefix("g");
        let n: u64 = next.as_str()["g_".len()..].parse().unwrap();
        for i in n + 1..n + 65 {
            s.nodes.push(Node::new(&format!("g_{i}"), Point::new(-500.0, -500.0)));
        }
        let clip = Clipboard::capture(&s);
        let (update, _) = clip.paste(&s, None, 20.0).unwrap();
        s.applied(&update).validate().unwrap();
    }

    #[test]
    fn paste_at_position_aligns_top_left() {
        let s = state();
        let clip = Clipboard::capture(&s);
        let (update, _) = clip.paste(&s, Some(Point::new(0.0, 500.0)), 20.0).unwrap();
        assert_eq!(update.nodes_to_add[0].position, Point::new(0.0, 500.0));
        assert_eq!(update.nodes_to_add[1].position, Point::new(20.0, 520.0));
        assert!(Clipboard::default().paste(&s, None, 20.0).is_none());
    }

    #[test]
    fn delete_selection_and_clear() {
        let s = state();
        let (update, _) = delete_selection(&s).unwrap();
        let after = s.applied(&update);
        let ids: Vec<_> = after.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["child", "outside"]);
        assert_eq!(after.nodes[0].group_id, None);
        assert!(after.edges.is_empty());

        let (update, _) = clear_model(&s).unwrap();
        let empty = s.applied(&update);
        assert!(empty.nodes.is_empty() && empty.edges.is_empty());
        assert!(clear_model(&empty).is_none());
    }
}
