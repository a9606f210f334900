use super::{Flow, Middleware, MiddlewareContext};
use crate::error::Result;

/// Cancels mutating actions while `readOnly.enabled` is set, unless every
/// one of them is allow-listed.
pub struct ReadOnlyMiddleware;

impl ReadOnlyMiddleware {
    pub const NAME: &'static str = "readOnly";
}

impl Middleware for ReadOnlyMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        let config = &ctx.config.read_only;
        if !config.enabled {
            return Ok(Flow::Proceed);
        }
        let blocked = ctx
            .action_types
            .iter()
            .any(|action| action.is_mutating() && !config.allowed_actions.contains(action));
        Ok(if blocked { Flow::Cancel } else { Flow::Proceed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::routing::EdgeRoutingManager;
    use flow_core::{ActionType, FlowState, FlowStateUpdate, MiddlewaresConfig};

    fn decide(config: &MiddlewaresConfig, actions: &[ActionType]) -> Flow {
        let state = FlowState::default();
        let update = FlowStateUpdate::default();
        let routing = EdgeRoutingManager::default();
        let mut ctx = MiddlewareContext::new(&state, &update, &[], actions, config, &routing);
        ReadOnlyMiddleware.execute(&mut ctx).unwrap()
    }

    #[test]
    fn blocks_mutations_only_when_enabled() {
        let mut config = MiddlewaresConfig::default();
        assert_eq!(decide(&config, &[ActionType::AddNodes]), Flow::Proceed);

        config.read_only.enabled = true;
        assert_eq!(decide(&config, &[ActionType::AddNodes]), Flow::Cancel);
        assert_eq!(decide(&config, &[ActionType::ChangeSelection]), Flow::Proceed);
        assert_eq!(decide(&config, &[ActionType::Zoom]), Flow::Proceed);
    }

    #[test]
    fn allow_list_must_cover_every_action() {
        let mut config = MiddlewaresConfig::default();
        config.read_only.enabled = true;
        config.read_only.allowed_actions = vec![ActionType::MoveNodes];
        assert_eq!(decide(&config, &[ActionType::MoveNodes]), Flow::Proceed);
        assert_eq!(
            decide(&config, &[ActionType::MoveNodes, ActionType::DeleteNodes]),
            Flow::Cancel
        );
    }
}
