//! Straight segments through every point.

use super::{EdgeRouting, RoutingContext, polyline_path};
use crate::geometry::Point;

pub struct PolylineRouting {
    name: &'static str,
}

impl PolylineRouting {
    pub const NAME: &'static str = "polyline";
    pub const STRAIGHT: &'static str = "straight";

    pub fn new() -> Self {
        Self { name: Self::NAME }
    }

    /// The same routing registered under another name.
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for PolylineRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeRouting for PolylineRouting {
    fn name(&self) -> &str {
        self.name
    }

    fn compute_points(&self, ctx: &RoutingContext<'_>) -> Vec<Point> {
        vec![ctx.source.point, ctx.target.point]
    }

    fn compute_svg_path(&self, points: &[Point]) -> String {
        polyline_path(points)
    }
}
