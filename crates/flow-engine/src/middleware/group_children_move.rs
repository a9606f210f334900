use super::{Flow, Middleware, MiddlewareContext};
use crate::error::Result;
use flow_core::{ActionType, FlowStateUpdate, NodeId, NodeUpdate};
use std::collections::HashSet;

/// Moving a group moves everything nested in it by the same delta.
pub struct GroupChildrenMoveMiddleware;

impl GroupChildrenMoveMiddleware {
    pub const NAME: &'static str = "groupChildrenMove";
}

impl Middleware for GroupChildrenMoveMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        if !ctx.config.group_children_move.enabled || !ctx.is_action(ActionType::MoveNodes) {
            return Ok(Flow::Proceed);
        }

        // Nodes the proposal already places explicitly.
        let mut covered: HashSet<NodeId> = ctx
            .update
            .nodes_to_update
            .iter()
            .filter(|patch| patch.position.is_some())
            .map(|patch| patch.id)
            .collect();

        // One entry per moved group, in first-patched order. A merged
        // transaction may patch the same group several times; only its
        // final position counts.
        let mut groups: Vec<NodeId> = Vec::new();
        for patch in &ctx.update.nodes_to_update {
            if patch.position.is_some() && !groups.contains(&patch.id) {
                groups.push(patch.id);
            }
        }

        let mut extra = FlowStateUpdate::default();
        for group_id in groups {
            let Some(group) = ctx.initial_state.node(group_id).filter(|n| n.is_group) else {
                continue;
            };
            let Some(moved) = ctx.state.node(group_id) else {
                continue;
            };
            let delta = moved.position - group.position;
            if delta.x == 0.0 && delta.y == 0.0 {
                continue;
            }
            for child_id in ctx.initial_state.descendants_of(group_id) {
                if !covered.insert(child_id) {
                    continue;
                }
                if let Some(child) = ctx.initial_state.node(child_id) {
                    extra
                        .nodes_to_update
                        .push(NodeUpdate::position(child_id, child.position + delta));
                }
            }
        }
        ctx.merge_update(extra);
        Ok(Flow::Proceed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::routing::EdgeRoutingManager;
    use flow_core::{FlowState, Metadata, MiddlewaresConfig, Node, Point};

    fn state() -> FlowState {
        FlowState::new(
            vec![
                Node::new("g", Point::new(0.0, 0.0)).group(),
                Node::new("inner", Point::new(10.0, 10.0)).group().in_group("g"),
                Node::new("leaf", Point::new(20.0, 20.0)).in_group("inner"),
                Node::new("picked", Point::new(30.0, 30.0)).in_group("g"),
                Node::new("free", Point::new(99.0, 99.0)),
            ],
            vec![],
            Metadata::default(),
        )
    }

    #[test]
    fn descendants_follow_group_except_those_already_moved() {
        let state = state();
        let update = FlowStateUpdate {
            nodes_to_update: vec![
                NodeUpdate::position(NodeId::intern("g"), Point::new(5.0, 0.0)),
                NodeUpdate::position(NodeId::intern("picked"), Point::new(35.0, 30.0)),
            ],
            ..Default::default()
        };
        let config = MiddlewaresConfig::default();
        let routing = EdgeRoutingManager::default();
        let mut ctx = MiddlewareContext::new(
            &state,
            &update,
            &[],
            &[ActionType::MoveNodes],
            &config,
            &routing,
        );
        GroupChildrenMoveMiddleware.execute(&mut ctx).unwrap();

        let pos = |id: &str| ctx.state.node(NodeId::intern(id)).map(|n| n.position);
        assert_eq!(pos("inner"), Some(Point::new(15.0, 10.0)));
        assert_eq!(pos("leaf"), Some(Point::new(25.0, 20.0)));
        assert_eq!(pos("picked"), Some(Point::new(35.0, 30.0)));
        assert_eq!(pos("free"), Some(Point::new(99.0, 99.0)));
        assert_eq!(ctx.update.nodes_to_update.len(), 4);
    }

    #[test]
    fn repeated_group_patches_use_the_final_position() {
        let state = state();
        let g = NodeId::intern("g");
        let update = FlowStateUpdate {
            nodes_to_update: vec![
                NodeUpdate::position(g, Point::new(50.0, 0.0)),
                NodeUpdate::position(g, Point::new(100.0, 0.0)),
            ],
            ..Default::default()
        };
        let config = MiddlewaresConfig::default();
        let routing = EdgeRoutingManager::default();
        let mut ctx = MiddlewareContext::new(
            &state,
            &update,
            &[],
            &[ActionType::MoveNodes],
            &config,
            &routing,
        );
        GroupChildrenMoveMiddleware.execute(&mut ctx).unwrap();

        let pos = |id: &str| ctx.state.node(NodeId::intern(id)).map(|n| n.position);
        assert_eq!(pos("g"), Some(Point::new(100.0, 0.0)));
        assert_eq!(pos("inner"), Some(Point::new(110.0, 10.0)));
        assert_eq!(pos("leaf"), Some(Point::new(120.0, 20.0)));
        assert_eq!(pos("picked"), Some(Point::new(130.0, 30.0)));
    }

    #[test]
    fn other_actions_are_ignored() {
        let state = state();
        let update = FlowStateUpdate {
            nodes_to_update: vec![NodeUpdate::position(NodeId::intern("g"), Point::new(5.0, 0.0))],
            ..Default::default()
        };
        let config = MiddlewaresConfig::default();
        let routing = EdgeRoutingManager::default();
        let mut ctx =
            MiddlewareContext::new(&state, &update, &[], &[ActionType::Paste], &config, &routing);
        GroupChildrenMoveMiddleware.execute(&mut ctx).unwrap();
        assert_eq!(ctx.update, update);
    }
}
