use super::{Flow, Middleware, MiddlewareContext};
use crate::error::Result;

/// One `info!` line per command that reaches it.
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    pub const NAME: &'static str = "logger";
}

impl Middleware for LoggerMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow> {
        if ctx.config.logger.enabled {
            log::info!("{}", summary(ctx));
        }
        Ok(Flow::Proceed)
    }
}

fn summary(ctx: &MiddlewareContext<'_>) -> String {
    let u = &ctx.update;
    format!(
        "{:?}: nodes +{} -{} ~{}, edges +{} -{} ~{}{}",
        ctx.action_types,
        u.nodes_to_add.len(),
        u.nodes_to_remove.len(),
        u.nodes_to_update.len(),
        u.edges_to_add.len(),
        u.edges_to_remove.len(),
        u.edges_to_update.len(),
        if u.metadata_update.is_some() { ", metadata" } else { "" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::routing::EdgeRoutingManager;
    use flow_core::{
        ActionType, EdgeId, FlowState, FlowStateUpdate, MetadataUpdate, MiddlewaresConfig, Node,
        Point,
    };
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn add_two_nodes() -> FlowStateUpdate {
        FlowStateUpdate {
            nodes_to_add: vec![
                Node::new("a", Point::new(0.0, 0.0)),
                Node::new("b", Point::new(200.0, 0.0)),
            ],
            edges_to_remove: vec![EdgeId::intern("old")],
            ..Default::default()
        }
    }

    #[test]
    fn summary_counts_every_bucket() {
        let state = FlowState::default();
        let routing = EdgeRoutingManager::default();
        let config = MiddlewaresConfig::default();
        let update = add_two_nodes();
        let actions = [ActionType::AddNodes, ActionType::DeleteEdges];
        let ctx = MiddlewareContext::new(&state, &update, &[], &actions, &config, &routing);

        assert_eq!(summary(&ctx), "[AddNodes, DeleteEdges]: nodes +2 -0 ~0, edges +0 -1 ~0");
    }

    #[test]
    fn summary_flags_metadata_changes() {
        let state = FlowState::default();
        let routing = EdgeRoutingManager::default();
        let config = MiddlewaresConfig::default();
        let update = FlowStateUpdate {
            metadata_update: Some(MetadataUpdate::default()),
            ..Default::default()
        };
        let actions = [ActionType::MoveViewport];
        let ctx = MiddlewareContext::new(&state, &update, &[], &actions, &config, &routing);

        assert!(summary(&ctx).ends_with("edges +0 -0 ~0, metadata"));
    }

    #[test]
    fn info_line_reaches_the_logger() {
        let sink = Captured::default();
        let installed = env_logger::Builder::new()
            .filter_module("flow_engine::middleware::logger", log::LevelFilter::Info)
            .target(env_logger::Target::Pipe(Box::new(sink.clone())))
            .try_init()
            .is_ok();

        let state = FlowState::default();
        let routing = EdgeRoutingManager::default();
        let update = add_two_nodes();
        let actions = [ActionType::AddNodes];

        let config = MiddlewaresConfig::default();
        let mut ctx = MiddlewareContext::new(&state, &update, &[], &actions, &config, &routing);
        assert_eq!(LoggerMiddleware.execute(&mut ctx).unwrap(), Flow::Proceed);
        if installed {
            let text = sink.text();
            assert!(text.contains("[AddNodes]"), "captured: {text}");
            assert!(text.contains("nodes +2 -0 ~0"), "captured: {text}");
        }

        let mut quiet = MiddlewaresConfig::default();
        quiet.logger.enabled = false;
        let mut ctx = MiddlewareContext::new(&state, &update, &[], &actions, &quiet, &routing);
        assert_eq!(LoggerMiddleware.execute(&mut ctx).unwrap(), Flow::Proceed);
    }
}
