//! Grid and angle snapping of proposed node geometry.

use super::{Flow, Middleware, MiddlewareContext};
use crate::error::Result;
use flow_core::geometry::{normalize_angle, snap_angle, snap_point};

/// Snaps every proposed node position to `nodePositionSnap.step`.
///
/// Relative moves smaller than half a step are absorbed; interactive drags
/// should emit absolute `moveNodes` positions.
pub struct NodePositionSnapMiddleware;

impl NodePositionSnapMiddleware {
    pub const NAME: &'static str = "nodePositionSnap";
}

impl Middleware for NodePositionSnapMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        let config = &ctx.config.node_position_snap;
        if !config.enabled {
            return Ok(Flow::Proceed);
        }
        let step = config.step;
        for node in &mut ctx.update.nodes_to_add {
            node.position = snap_point(node.position, step);
        }
        for patch in &mut ctx.update.nodes_to_update {
            if let Some(position) = patch.position.as_mut() {
                *position = snap_point(*position, step);
            }
        }
        Ok(Flow::Proceed)
    }
}

/// Snaps proposed node angles to multiples of `nodeRotationSnap.step` degrees.
pub struct NodeRotationSnapMiddleware;

impl NodeRotationSnapMiddleware {
    pub const NAME: &'static str = "nodeRotationSnap";
}

impl Middleware for NodeRotationSnapMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        let config = &ctx.config.node_rotation_snap;
        if !config.enabled {
            return Ok(Flow::Proceed);
        }
        let step = config.step;
        for patch in &mut ctx.update.nodes_to_update {
            if let Some(angle) = patch.angle.as_mut() {
                *angle = normalize_angle(snap_angle(*angle, step));
            }
        }
        Ok(Flow::Proceed)
    }
}
