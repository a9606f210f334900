//! A single circular arc between the endpoints.

use super::{EdgeRouting, RoutingContext, fmt_num, fmt_point, polyline_path};
use crate::geometry::{Point, distance_between_points};
use std::f64::consts::PI;

/// Arc radius as a multiple of the chord length.
const RADIUS_FACTOR: f64 = 1.0;

#[derive(Default)]
pub struct ArcRouting;

impl ArcRouting {
    pub const NAME: &'static str = "arc";
}

impl EdgeRouting for ArcRouting {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute_points(&self, ctx: &RoutingContext<'_>) -> Vec<Point> {
        vec![ctx.source.point, ctx.target.point]
    }

    fn compute_svg_path(&self, points: &[Point]) -> String {
        let (Some(&start), Some(&end)) = (points.first(), points.last()) else {
            return String::new();
        };
        let radius = distance_between_points(start, end) * RADIUS_FACTOR;
        if points.len() < 2 || radius == 0.0 {
            return polyline_path(points);
        }
        format!(
            "M {} A {r},{r},0,0,1,{}",
            fmt_point(start),
            fmt_point(end),
            r = fmt_num(radius),
        )
    }

    fn point_on_path(&self, points: &[Point], percentage: f64) -> Point {
        match (points.first(), points.last()) {
            (Some(&start), Some(&end)) if points.len() >= 2 => {
                arc_point(start, end, percentage.clamp(0.0, 1.0))
            }
            _ => Point::ZERO,
        }
    }
}

/// Wrap an angle in radians into `(-π, π]`.
fn wrap_pi(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

/// Point at `t` along the small, positive-sweep arc drawn by `compute_svg_path`.
fn arc_point(start: Point, end: Point, t: f64) -> Point {
    let chord = distance_between_points(start, end);
    if chord == 0.0 {
        return start;
    }
    let radius = chord * RADIUS_FACTOR;
    let half = chord / 2.0;
    let h = (radius * radius - half * half).max(0.0).sqrt();
    let mid = start.lerp(end, 0.5);
    let normal = Point::new(-(end.y - start.y) / chord, (end.x - start.x) / chord);

    let sweep_from = |center: Point| {
        let a0 = (start.y - center.y).atan2(start.x - center.x);
        let a1 = (end.y - center.y).atan2(end.x - center.x);
        (a0, wrap_pi(a1 - a0))
    };

    let mut center = mid + normal * h;
    let (mut a0, mut delta) = sweep_from(center);
    if delta < 0.0 {
        center = mid - normal * h;
        (a0, delta) = sweep_from(center);
    }
    let angle = a0 + delta * t;
    Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn svg_is_single_arc() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert_eq!(ArcRouting.compute_svg_path(&pts), "M 0,0 A 10,10,0,0,1,10,0");
    }

    #[test]
    fn arc_endpoints_and_bulge() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(close(ArcRouting.point_on_path(&pts, 0.0), pts[0]));
        assert!(close(ArcRouting.point_on_path(&pts, 1.0), pts[1]));
        let mid = ArcRouting.point_on_path(&pts, 0.5);
        assert!((mid.x - 5.0).abs() < 1e-9);
        // Positive sweep on a y-down screen bulges upward.
        assert!(mid.y < 0.0);
    }
}
