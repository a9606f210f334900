//! Orthogonal routing: axis-aligned segments with rounded corners.
//!
//! Bends are generated for a source leaving to the right and mapped onto the
//! other three source sides by mirroring (left) and transposing (top,
//! bottom) the coordinates. Every generator dispatches on the target side
//! as seen in its own frame.

use super::{EdgeRouting, OrthogonalConfig, RoutingContext, fmt_point, offset_point, polyline_path};
use crate::geometry::Point;
use crate::model::{PortLocation, PortSide};

/// Points closer than this on an axis are treated as aligned.
const COLLINEAR_TOLERANCE: f64 = 1.0;

pub struct OrthogonalRouting {
    config: OrthogonalConfig,
}

impl OrthogonalRouting {
    pub const NAME: &'static str = "orthogonal";

    pub fn new(config: OrthogonalConfig) -> Self {
        Self { config }
    }
}

impl EdgeRouting for OrthogonalRouting {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute_points(&self, ctx: &RoutingContext<'_>) -> Vec<Point> {
        let bends =
            compute_orthogonal_bends(ctx.source, ctx.target, self.config.first_last_segment_length);
        let mut points = Vec::with_capacity(bends.len() + 2);
        points.push(ctx.source.point);
        points.extend(bends);
        points.push(ctx.target.point);
        points
    }

    fn compute_svg_path(&self, points: &[Point]) -> String {
        rounded_orthogonal_path(points, self.config.max_corner_radius)
    }
}

/// The 1–4 intermediate points of an orthogonal route between two ports.
/// `first_last` is how far the path runs straight out of each port before
/// its first bend.
pub fn compute_orthogonal_bends(
    source: PortLocation,
    target: PortLocation,
    first_last: f64,
) -> Vec<Point> {
    match source.side {
        PortSide::Right => right_source_bends(source, target, first_last),
        PortSide::Left => left_source_bends(source, target, first_last),
        PortSide::Bottom => bottom_source_bends(source, target, first_last),
        PortSide::Top => top_source_bends(source, target, first_last),
    }
}

fn right_source_bends(source: PortLocation, target: PortLocation, first_last: f64) -> Vec<Point> {
    let s = source.point;
    let t = target.point;
    let s_out = offset_point(s, source.side, first_last);
    let t_out = offset_point(t, target.side, first_last);
    let center = s.lerp(t, 0.5);

    match target.side {
        PortSide::Right => {
            let x = s_out.x.max(t_out.x);
            vec![Point::new(x, s.y), Point::new(x, t.y)]
        }
        PortSide::Left => {
            if t_out.x >= s_out.x {
                vec![Point::new(center.x, s.y), Point::new(center.x, t.y)]
            } else {
                // Target is behind the source: loop around through the middle.
                vec![
                    Point::new(s_out.x, s.y),
                    Point::new(s_out.x, center.y),
                    Point::new(t_out.x, center.y),
                    Point::new(t_out.x, t.y),
                ]
            }
        }
        PortSide::Top => {
            if t.x >= s_out.x && t_out.y >= s.y {
                vec![Point::new(t.x, s.y)]
            } else {
                let y = if t_out.y > s.y {
                    (s.y + t_out.y) / 2.0
                } else {
                    t_out.y
                };
                vec![
                    Point::new(s_out.x, s.y),
                    Point::new(s_out.x, y),
                    Point::new(t.x, y),
                ]
            }
        }
        PortSide::Bottom => {
            if t.x >= s_out.x && t_out.y <= s.y {
                vec![Point::new(t.x, s.y)]
            } else {
                let y = if t_out.y < s.y {
                    (s.y + t_out.y) / 2.0
                } else {
                    t_out.y
                };
                vec![
                    Point::new(s_out.x, s.y),
                    Point::new(s_out.x, y),
                    Point::new(t.x, y),
                ]
            }
        }
    }
}

fn left_source_bends(source: PortLocation, target: PortLocation, first_last: f64) -> Vec<Point> {
    right_source_bends(mirror(source), mirror(target), first_last)
        .into_iter()
        .map(mirror_point)
        .collect()
}

fn bottom_source_bends(source: PortLocation, target: PortLocation, first_last: f64) -> Vec<Point> {
    right_source_bends(transpose(source), transpose(target), first_last)
        .into_iter()
        .map(transpose_point)
        .collect()
}

fn top_source_bends(source: PortLocation, target: PortLocation, first_last: f64) -> Vec<Point> {
    left_source_bends(transpose(source), transpose(target), first_last)
        .into_iter()
        .map(transpose_point)
        .collect()
}

fn mirror_point(p: Point) -> Point {
    Point::new(-p.x, p.y)
}

fn mirror(loc: PortLocation) -> PortLocation {
    let side = match loc.side {
        PortSide::Left => PortSide::Right,
        PortSide::Right => PortSide::Left,
        other => other,
    };
    PortLocation::new(mirror_point(loc.point), side)
}

fn transpose_point(p: Point) -> Point {
    Point::new(p.y, p.x)
}

fn transpose(loc: PortLocation) -> PortLocation {
    let side = match loc.side {
        PortSide::Right => PortSide::Bottom,
        PortSide::Bottom => PortSide::Right,
        PortSide::Left => PortSide::Top,
        PortSide::Top => PortSide::Left,
    };
    PortLocation::new(transpose_point(loc.point), side)
}

/// Drop repeated points and interior points that do not bend the path.
fn collapse_collinear(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if let Some(last) = out.last()
            && (last.x - p.x).abs() < f64::EPSILON
            && (last.y - p.y).abs() < f64::EPSILON
        {
            continue;
        }
        if out.len() >= 2 {
            let prev = out[out.len() - 2];
            let cur = out[out.len() - 1];
            let same_x = (prev.x - cur.x).abs() < COLLINEAR_TOLERANCE
                && (cur.x - p.x).abs() < COLLINEAR_TOLERANCE;
            let same_y = (prev.y - cur.y).abs() < COLLINEAR_TOLERANCE
                && (cur.y - p.y).abs() < COLLINEAR_TOLERANCE;
            if same_x || same_y {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// `M … L …` with an `A` arc at every interior bend.
///
/// Corner radius is `min(|Δx|/2, |Δy|/2, max_radius)` over the neighbours of
/// the bend; the sweep flag follows the turn direction.
pub fn rounded_orthogonal_path(points: &[Point], max_radius: f64) -> String {
    let pts = collapse_collinear(points);
    if pts.len() < 3 {
        return polyline_path(&pts);
    }

    let mut d = format!("M {}", fmt_point(pts[0]));
    for i in 1..pts.len() - 1 {
        let (prev, cur, next) = (pts[i - 1], pts[i], pts[i + 1]);
        let dx = (next.x - prev.x).abs();
        let dy = (next.y - prev.y).abs();
        let radius = (dx / 2.0).min(dy / 2.0).min(max_radius);
        if radius <= 0.0 {
            d.push_str(&format!(" L {}", fmt_point(cur)));
            continue;
        }

        let before = towards(cur, prev, radius);
        let after = towards(cur, next, radius);
        let cross = (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x);
        let sweep = u8::from(cross > 0.0);
        d.push_str(&format!(
            " L {} A {r},{r},0,0,{sweep},{}",
            fmt_point(before),
            fmt_point(after),
            r = super::fmt_num(radius),
        ));
    }
    d.push_str(&format!(" L {}", fmt_point(pts[pts.len() - 1])));
    d
}

/// `from` moved `distance` units towards `to`.
fn towards(from: Point, to: Point, distance: f64) -> Point {
    let len = crate::geometry::distance_between_points(from, to);
    if len == 0.0 {
        return from;
    }
    from.lerp(to, distance / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(x: f64, y: f64, side: PortSide) -> PortLocation {
        PortLocation::new(Point::new(x, y), side)
    }

    #[test]
    fn right_to_right_with_source_above_drops_at_target_offset() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 0.0, PortSide::Right),
            loc(50.0, 100.0, PortSide::Right),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(70.0, 0.0), Point::new(70.0, 100.0)]);
    }

    #[test]
    fn right_to_left_forward_bends_at_center() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 0.0, PortSide::Right),
            loc(100.0, 50.0, PortSide::Left),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(50.0, 0.0), Point::new(50.0, 50.0)]);
    }

    #[test]
    fn right_to_left_backward_loops_around() {
        let bends = compute_orthogonal_bends(
            loc(100.0, 0.0, PortSide::Right),
            loc(0.0, 60.0, PortSide::Left),
            20.0,
        );
        assert_eq!(
            bends,
            vec![
                Point::new(120.0, 0.0),
                Point::new(120.0, 30.0),
                Point::new(-20.0, 30.0),
                Point::new(-20.0, 60.0),
            ]
        );
    }

    #[test]
    fn right_to_top_single_corner() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 0.0, PortSide::Right),
            loc(100.0, 100.0, PortSide::Top),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(100.0, 0.0)]);
    }

    #[test]
    fn left_source_mirrors_right_source() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 0.0, PortSide::Left),
            loc(-100.0, 50.0, PortSide::Right),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(-50.0, 0.0), Point::new(-50.0, 50.0)]);
    }

    #[test]
    fn bottom_to_top_bends_at_vertical_center() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 0.0, PortSide::Bottom),
            loc(40.0, 100.0, PortSide::Top),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(0.0, 50.0), Point::new(40.0, 50.0)]);
    }

    #[test]
    fn top_to_bottom_goes_up() {
        let bends = compute_orthogonal_bends(
            loc(0.0, 100.0, PortSide::Top),
            loc(40.0, 0.0, PortSide::Bottom),
            20.0,
        );
        assert_eq!(bends, vec![Point::new(0.0, 50.0), Point::new(40.0, 50.0)]);
    }

    #[test]
    fn every_side_pair_stays_orthogonal() {
        let sides = [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left];
        let routing = OrthogonalRouting::new(OrthogonalConfig::default());
        let edge = crate::model::Edge::new("e", "a", "b");
        for s in sides {
            for t in sides {
                for (tx, ty) in [(200.0, 150.0), (-200.0, -150.0), (30.0, -300.0)] {
                    let ctx = RoutingContext::new(&edge, loc(0.0, 0.0, s), loc(tx, ty, t));
                    let pts = routing.compute_points(&ctx);
                    assert!((3..=6).contains(&pts.len()), "{s:?}->{t:?}: {pts:?}");
                    for w in pts.windows(2) {
                        assert!(
                            w[0].x == w[1].x || w[0].y == w[1].y,
                            "{s:?}->{t:?} diagonal segment {w:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn svg_rounds_corners_with_turn_direction() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 100.0),
            Point::new(100.0, 100.0),
        ];
        let d = rounded_orthogonal_path(&points, 16.0);
        assert_eq!(
            d,
            "M 0,0 L 34,0 A 16,16,0,0,1,50,16 L 50,84 A 16,16,0,0,0,66,100 L 100,100"
        );
    }

    #[test]
    fn svg_radius_is_limited_by_short_segments() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 6.0),
        ];
        let d = rounded_orthogonal_path(&points, 16.0);
        assert_eq!(d, "M 0,0 L 7,0 A 3,3,0,0,1,10,3 L 10,6");
    }

    #[test]
    fn collinear_points_are_collapsed() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.5),
            Point::new(100.0, 0.0),
        ];
        assert_eq!(rounded_orthogonal_path(&points, 16.0), "M 0,0 L 100,0");
    }
}
