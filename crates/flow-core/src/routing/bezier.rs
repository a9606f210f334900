//! Cubic Bézier routing with control points pushed out of each port.

use super::{BezierConfig, EdgeRouting, RoutingContext, fmt_point, offset_point, polyline_path};
use crate::geometry::Point;

pub struct BezierRouting {
    config: BezierConfig,
}

impl BezierRouting {
    pub const NAME: &'static str = "bezier";

    pub fn new(config: BezierConfig) -> Self {
        Self { config }
    }
}

impl EdgeRouting for BezierRouting {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute_points(&self, ctx: &RoutingContext<'_>) -> Vec<Point> {
        let offset = self.config.control_offset;
        vec![
            ctx.source.point,
            offset_point(ctx.source.point, ctx.source.side, offset),
            offset_point(ctx.target.point, ctx.target.side, offset),
            ctx.target.point,
        ]
    }

    fn compute_svg_path(&self, points: &[Point]) -> String {
        if points.len() != 4 {
            return polyline_path(points);
        }
        format!(
            "M {} C {} {} {}",
            fmt_point(points[0]),
            fmt_point(points[1]),
            fmt_point(points[2]),
            fmt_point(points[3]),
        )
    }

    fn point_on_path(&self, points: &[Point], percentage: f64) -> Point {
        bezier_point_on_path(points, percentage)
    }
}

/// Point at parameter `t` (clamped to 0..1) on the curve described by
/// `points`: cubic for four or more points (first, two controls, last),
/// quadratic for three, linear for two.
pub fn bezier_point_on_path(points: &[Point], t: f64) -> Point {
    let t = t.clamp(0.0, 1.0);
    let u = 1.0 - t;
    match points {
        [] => Point::ZERO,
        [p] => *p,
        [p0, p1] => p0.lerp(*p1, t),
        [p0, p1, p2] => *p0 * (u * u) + *p1 * (2.0 * u * t) + *p2 * (t * t),
        [p0, p1, .., p2, p3] => {
            *p0 * (u * u * u)
                + *p1 * (3.0 * u * u * t)
                + *p2 * (3.0 * u * t * t)
                + *p3 * (t * t * t)
        }
    }
}
