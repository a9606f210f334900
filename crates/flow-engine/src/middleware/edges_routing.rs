//! Recomputes edge geometry whenever the proposal moves what an edge is
//! attached to.

use super::{Flow, Middleware, MiddlewareContext};
use crate::error::Result;
use flow_core::routing::EdgeRoutingManager;
use flow_core::{
    ActionType, Edge, EdgeId, EdgeUpdate, FlowState, FlowStateUpdate, MetadataUpdate, NodeId,
    NodeUpdate,
};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Re-routes auto edges whose endpoints changed, and edges that were added
/// or re-attached. Manual edges keep their points. Label positions are
/// recomputed along the final points when `edgesRouting.placeLabels` is set.
/// On `init` every edge is routed.
pub struct EdgesRoutingMiddleware;

impl EdgesRoutingMiddleware {
    pub const NAME: &'static str = "edgesRouting";
}

fn moves_geometry(patch: &NodeUpdate) -> bool {
    patch.position.is_some()
        || patch.size.is_some()
        || patch.angle.is_some()
        || patch.ports.is_some()
}

fn reshapes_edge(patch: &EdgeUpdate) -> bool {
    patch.source.is_some()
        || patch.target.is_some()
        || patch.source_port.is_some()
        || patch.target_port.is_some()
        || patch.routing.is_some()
        || patch.routing_mode.is_some()
        || patch.points.is_some()
        || patch.labels.is_some()
}

impl Middleware for EdgesRoutingMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        let config = &ctx.config.edges_routing;
        if !config.enabled {
            return Ok(Flow::Proceed);
        }
        let place_labels = config.place_labels;
        let route_all = ctx.is_action(ActionType::Init);

        let moved_nodes: HashSet<NodeId> = ctx
            .update
            .nodes_to_add
            .iter()
            .map(|n| n.id)
            .chain(
                ctx.update
                    .nodes_to_update
                    .iter()
                    .filter(|p| moves_geometry(p))
                    .map(|p| p.id),
            )
            .collect();
        let reshaped_edges: HashSet<EdgeId> = ctx
            .update
            .edges_to_add
            .iter()
            .map(|e| e.id)
            .chain(
                ctx.update
                    .edges_to_update
                    .iter()
                    .filter(|p| reshapes_edge(p))
                    .map(|p| p.id),
            )
            .collect();

        let mut extra = FlowStateUpdate::default();
        for edge in &ctx.state.edges {
            let affected = route_all
                || reshaped_edges.contains(&edge.id)
                || moved_nodes.contains(&edge.source)
                || moved_nodes.contains(&edge.target);
            if !affected {
                continue;
            }
            if let Some(patch) = route_edge(edge, &ctx.state, ctx.routing, place_labels) {
                log::trace!("re-routed edge '{}'", edge.id);
                extra.edges_to_update.push(patch);
            }
        }

        let temporary_touched = ctx
            .update
            .metadata_update
            .as_ref()
            .is_some_and(|m| matches!(m.temporary_edge, Some(Some(_))));
        if temporary_touched
            && let Some(temp) = &ctx.state.metadata.temporary_edge
            && let Some(points) = ctx.routing.compute_points(temp, &ctx.state)
        {
            let routed = Edge {
                points,
                ..temp.clone()
            };
            extra.merge(FlowStateUpdate::with_metadata(MetadataUpdate {
                temporary_edge: Some(Some(routed)),
                ..Default::default()
            }));
        }

        ctx.merge_update(extra);
        Ok(Flow::Proceed)
    }
}

/// The patch bringing `edge` in line with `state`, or `None` if nothing
/// would change or its endpoints cannot be resolved.
fn route_edge(
    edge: &Edge,
    state: &FlowState,
    routing: &EdgeRoutingManager,
    place_labels: bool,
) -> Option<EdgeUpdate> {
    let points = if edge.is_manual() {
        edge.points.clone()
    } else {
        routing.compute_points(edge, state)?
    };

    let labels: SmallVec<[_; 2]> = if place_labels {
        let strategy = routing.routing(edge.routing.as_deref());
        edge.labels
            .iter()
            .map(|label| {
                let mut placed = label.clone();
                placed.position = Some(strategy.point_on_path(&points, label.position_on_edge));
                placed
            })
            .collect()
    } else {
        edge.labels.clone()
    };

    let points_changed = points != edge.points;
    let labels_changed = labels != edge.labels;
    if !points_changed && !labels_changed {
        return None;
    }
    Some(EdgeUpdate {
        points: points_changed.then_some(points),
        labels: labels_changed.then_some(labels),
        ..EdgeUpdate::new(edge.id)
    })
}
