//! Edge routing: turning an edge's endpoints into a path.
//!
//! A routing is a named strategy that computes the points of an edge, draws
//! an SVG path through them, and locates a point at a fraction of that path.
//! The `EdgeRoutingManager` owns the registry and resolves an edge's routing
//! name, falling back to the default and finally to a straight polyline.

pub mod arc;
pub mod bezier;
pub mod orthogonal;
pub mod path;
pub mod polyline;

pub use arc::ArcRouting;
pub use bezier::{BezierRouting, bezier_point_on_path};
pub use orthogonal::{OrthogonalRouting, compute_orthogonal_bends, rounded_orthogonal_path};
pub use polyline::PolylineRouting;

use crate::geometry::Point;
use crate::id::EdgeId;
use crate::model::{Edge, FlowState, PortLocation, PortSide};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ─── Configuration ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrthogonalConfig {
    /// Straight run out of each port before the first bend.
    pub first_last_segment_length: f64,
    pub max_corner_radius: f64,
}

impl Default for OrthogonalConfig {
    fn default() -> Self {
        Self {
            first_last_segment_length: 20.0,
            max_corner_radius: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BezierConfig {
    /// Distance of each control point from its port, along the port side.
    pub control_offset: f64,
}

impl Default for BezierConfig {
    fn default() -> Self {
        Self {
            control_offset: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    pub default_routing: String,
    pub orthogonal: OrthogonalConfig,
    pub bezier: BezierConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_routing: OrthogonalRouting::NAME.to_string(),
            orthogonal: OrthogonalConfig::default(),
            bezier: BezierConfig::default(),
        }
    }
}

// ─── Routing trait ───────────────────────────────────────────────────────

/// Inputs to a routing: the edge and its resolved endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext<'a> {
    pub edge: &'a Edge,
    pub source: PortLocation,
    pub target: PortLocation,
}

impl<'a> RoutingContext<'a> {
    pub fn new(edge: &'a Edge, source: PortLocation, target: PortLocation) -> Self {
        Self {
            edge,
            source,
            target,
        }
    }

    /// Resolve both endpoints of `edge` against `state`. `None` when either
    /// end has neither a node nor a free position.
    pub fn for_edge(edge: &'a Edge, state: &FlowState) -> Option<Self> {
        let (source, target) = resolve_endpoints(edge, state)?;
        Some(Self::new(edge, source, target))
    }
}

pub trait EdgeRouting: Send + Sync {
    fn name(&self) -> &str;

    fn compute_points(&self, ctx: &RoutingContext<'_>) -> Vec<Point>;

    fn compute_svg_path(&self, points: &[Point]) -> String;

    /// Point at `percentage` (0..1) of the rendered path.
    fn point_on_path(&self, points: &[Point], percentage: f64) -> Point {
        path::point_at_percentage(points, percentage)
    }
}

/// Where an edge starts and ends.
///
/// The source is its node's port (or the right side midpoint) and otherwise
/// `source_position`. The target is its node's port (or left side midpoint);
/// a dangling link uses `target_position`, facing back towards the source.
pub fn resolve_endpoints(edge: &Edge, state: &FlowState) -> Option<(PortLocation, PortLocation)> {
    let source = match state.node(edge.source) {
        Some(node) => node.port_location(edge.source_port, PortSide::Right),
        None => PortLocation::new(edge.source_position?, PortSide::Right),
    };
    let target_node = if edge.target.is_empty() {
        None
    } else {
        state.node(edge.target)
    };
    let target = match target_node {
        Some(node) => node.port_location(edge.target_port, PortSide::Left),
        None => PortLocation::new(edge.target_position?, source.side.opposite()),
    };
    Some((source, target))
}

// ─── Manager ─────────────────────────────────────────────────────────────

/// Registry of routings keyed by name.
pub struct EdgeRoutingManager {
    routings: HashMap<String, Arc<dyn EdgeRouting>>,
    default_routing: String,
    fallback: Arc<dyn EdgeRouting>,
}

impl EdgeRoutingManager {
    /// A manager with the built-in routings registered.
    pub fn new(config: &RoutingConfig) -> Self {
        let mut manager = Self {
            routings: HashMap::new(),
            default_routing: OrthogonalRouting::NAME.to_string(),
            fallback: Arc::new(PolylineRouting::new()),
        };
        manager.register_routing(OrthogonalRouting::new(config.orthogonal.clone()));
        manager.register_routing(BezierRouting::new(config.bezier.clone()));
        manager.register_routing(PolylineRouting::new());
        manager.register_routing(PolylineRouting::named(PolylineRouting::STRAIGHT));
        manager.register_routing(ArcRouting);
        if !manager.set_default_routing(&config.default_routing) {
            log::warn!(
                "default routing '{}' is not registered; keeping '{}'",
                config.default_routing,
                manager.default_routing
            );
        }
        manager
    }

    /// Register a routing, replacing any routing with the same name.
    pub fn register_routing(&mut self, routing: impl EdgeRouting + 'static) {
        let name = routing.name().to_string();
        if self.routings.insert(name.clone(), Arc::new(routing)).is_some() {
            log::debug!("routing '{name}' replaced");
        }
    }

    pub fn has_routing(&self, name: &str) -> bool {
        self.routings.contains_key(name)
    }

    pub fn registered_routings(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn default_routing(&self) -> &str {
        &self.default_routing
    }

    /// Switch the default. Returns `false` and leaves it unchanged when
    /// `name` is not registered.
    pub fn set_default_routing(&mut self, name: &str) -> bool {
        if !self.has_routing(name) {
            return false;
        }
        self.default_routing = name.to_string();
        true
    }

    /// The routing for `name`, else the default, else a straight polyline.
    pub fn routing(&self, name: Option<&str>) -> &dyn EdgeRouting {
        if let Some(name) = name {
            if let Some(routing) = self.routings.get(name) {
                return routing.as_ref();
            }
            log::warn!("unknown routing '{name}', using '{}'", self.default_routing);
        }
        match self.routings.get(&self.default_routing) {
            Some(routing) => routing.as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    /// Route `edge`, or `None` when its endpoints cannot be resolved.
    pub fn compute_points(&self, edge: &Edge, state: &FlowState) -> Option<Vec<Point>> {
        let ctx = RoutingContext::for_edge(edge, state)?;
        Some(self.routing(edge.routing.as_deref()).compute_points(&ctx))
    }

    /// SVG path for `edge` through its stored points.
    pub fn compute_path(&self, edge: &Edge) -> String {
        self.routing(edge.routing.as_deref())
            .compute_svg_path(&edge.points)
    }

    /// The point at `percentage` along `edge`'s stored points.
    pub fn compute_point_on_path(&self, edge: &Edge, percentage: f64) -> Point {
        self.routing(edge.routing.as_deref())
            .point_on_path(&edge.points, percentage)
    }

    /// Path for the edge with `id` in `state`.
    pub fn path_for(&self, state: &FlowState, id: EdgeId) -> Option<String> {
        state.edge(id).map(|edge| self.compute_path(edge))
    }
}

impl Default for EdgeRoutingManager {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

// ─── Path formatting ─────────────────────────────────────────────────────

/// Numbers in paths: at most three decimals, no trailing zeros, no `-0`.
pub fn fmt_num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

pub fn fmt_point(p: Point) -> String {
    format!("{},{}", fmt_num(p.x), fmt_num(p.y))
}

/// `p` pushed `distance` units out of a node through `side`.
pub fn offset_point(p: Point, side: PortSide, distance: f64) -> Point {
    match side {
        PortSide::Right => Point::new(p.x + distance, p.y),
        PortSide::Left => Point::new(p.x - distance, p.y),
        PortSide::Top => Point::new(p.x, p.y - distance),
        PortSide::Bottom => Point::new(p.x, p.y + distance),
    }
}

/// `M x,y L x,y …` through every point.
pub fn polyline_path(points: &[Point]) -> String {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut d = format!("M {}", fmt_point(*first));
    for p in iter {
        d.push_str(" L ");
        d.push_str(&fmt_point(*p));
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Node};
    use pretty_assertions::assert_eq;

    struct Fixed;

    impl EdgeRouting for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compute_points(&self, _ctx: &RoutingContext<'_>) -> Vec<Point> {
            vec![Point::new(1.0, 1.0)]
        }

        fn compute_svg_path(&self, _points: &[Point]) -> String {
            "fixed".into()
        }
    }

    fn two_nodes() -> FlowState {
        FlowState::new(
            vec![
                Node::new("a", Point::new(0.0, 0.0)).with_size(100.0, 50.0),
                Node::new("b", Point::new(300.0, 0.0)).with_size(100.0, 50.0),
            ],
            vec![],
            Metadata::default(),
        )
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(1.23456), "1.235");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(polyline_path(&[]), "");
        assert_eq!(polyline_path(&[Point::new(1.0, 2.0)]), "M 1,2");
    }

    #[test]
    fn endpoints_default_to_facing_sides() {
        let state = two_nodes();
        let edge = Edge::new("e", "a", "b");
        let (s, t) = resolve_endpoints(&edge, &state).unwrap();
        assert_eq!(s, PortLocation::new(Point::new(100.0, 25.0), PortSide::Right));
        assert_eq!(t, PortLocation::new(Point::new(300.0, 25.0), PortSide::Left));
    }

    #[test]
    fn dangling_target_uses_free_position() {
        let state = two_nodes();
        let mut edge = Edge::new("tmp", "a", "");
        assert!(resolve_endpoints(&edge, &state).is_none());
        edge.target_position = Some(Point::new(200.0, 200.0));
        let (_, t) = resolve_endpoints(&edge, &state).unwrap();
        assert_eq!(t, PortLocation::new(Point::new(200.0, 200.0), PortSide::Left));
    }

    #[test]
    fn unknown_routing_falls_back_to_default() {
        let manager = EdgeRoutingManager::default();
        assert_eq!(manager.routing(Some("nope")).name(), "orthogonal");
        assert_eq!(manager.routing(None).name(), "orthogonal");
        assert_eq!(manager.routing(Some("straight")).name(), "straight");
    }

    #[test]
    fn registering_overrides_by_name() {
        let mut manager = EdgeRoutingManager::default();
        manager.register_routing(Fixed);
        assert!(manager.set_default_routing("fixed"));
        assert!(!manager.set_default_routing("missing"));
        assert_eq!(manager.default_routing(), "fixed");

        let state = two_nodes();
        let edge = Edge::new("e", "a", "b");
        assert_eq!(
            manager.compute_points(&edge, &state),
            Some(vec![Point::new(1.0, 1.0)])
        );
        assert_eq!(
            manager.registered_routings(),
            vec!["arc", "bezier", "fixed", "orthogonal", "polyline", "straight"]
        );
    }

    #[test]
    fn manager_routes_aligned_nodes_straight_through() {
        let manager = EdgeRoutingManager::default();
        let state = two_nodes();
        let mut edge = Edge::new("e", "a", "b");
        edge.points = manager.compute_points(&edge, &state).unwrap();
        assert_eq!(edge.points.first(), Some(&Point::new(100.0, 25.0)));
        assert_eq!(edge.points.last(), Some(&Point::new(300.0, 25.0)));
        assert_eq!(manager.compute_path(&edge), "M 100,25 L 300,25");
        assert_eq!(
            manager.compute_point_on_path(&edge, 0.5),
            Point::new(200.0, 25.0)
        );
    }
}
