//! Helpers shared by the integration test binaries.

#![allow(dead_code)]

use flow_engine::flow_core::{FlowState, Metadata, MiddlewaresConfig, Node, NodeId, Point};
use flow_engine::{FlowConfig, FlowCore, InMemoryModel};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The review pipeline fixture, owned by flow-core's integration tests.
pub const FIXTURE: &str = include_str!("../../flow-core/tests/fixtures/pipeline.json");

/// Engine over the review-pipeline fixture, initialized.
pub fn fixture_core() -> FlowCore {
    init_logging();
    let model = InMemoryModel::from_json(FIXTURE, 50).expect("fixture should load");
    let mut core = FlowCore::with_model(FlowConfig::default(), model);
    core.init().expect("init should succeed");
    core
}

/// Empty engine whose metadata carries `middlewares`.
pub fn core_with(middlewares: MiddlewaresConfig) -> FlowCore {
    init_logging();
    let config = FlowConfig {
        initial_metadata: Some(Metadata {
            middlewares_config: middlewares,
            ..Default::default()
        }),
        ..Default::default()
    };
    FlowCore::new(config)
}

pub fn node(id: &str, x: f64, y: f64) -> Node {
    Node::new(id, Point::new(x, y)).with_size(100.0, 50.0)
}

pub fn position_of(state: &FlowState, id: &str) -> Point {
    state
        .node(NodeId::intern(id))
        .map(|n| n.position)
        .unwrap_or_else(|| panic!("node {id} missing"))
}
