//! Geometry and math helpers shared by every layer of the engine.
//!
//! All functions are pure. Angles are in degrees and follow screen
//! coordinates (y grows downward), so a positive angle is clockwise.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Lower bound applied to distances before dividing by them.
const MIN_DISTANCE: f64 = 0.001;

// ─── Primitives ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`, `t` in 0..1.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// AABB overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Smallest rectangle containing every point.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }
}

// ─── Scalars ─────────────────────────────────────────────────────────────

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn distance_between_points(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Round half up, matching the rounding used for snapping everywhere else.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round `value` to the nearest multiple of `step`. A non-positive step
/// leaves the value untouched.
pub fn snap_number(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    round_half_up(value / step) * step
}

pub fn snap_point(point: Point, step: Size) -> Point {
    Point::new(
        snap_number(point.x, step.width),
        snap_number(point.y, step.height),
    )
}

pub fn snap_angle(angle: f64, step: f64) -> f64 {
    snap_number(angle, step)
}

// ─── Rotation ────────────────────────────────────────────────────────────

/// Signed angle in degrees between `center→start` and `center→end`, in
/// `[-180, 180]`. Positive means the pointer moved clockwise.
///
/// The magnitude comes from the law of cosines over the three pairwise
/// distances; the sign from the cross product of the normalized vectors.
pub fn angle_between_points(start: Point, center: Point, end: Point) -> f64 {
    let a = distance_between_points(center, start).max(MIN_DISTANCE);
    let b = distance_between_points(center, end).max(MIN_DISTANCE);
    let c = distance_between_points(start, end).max(MIN_DISTANCE);

    let cos = clamp((a * a + b * b - c * c) / (2.0 * a * b), -1.0, 1.0);
    let magnitude = cos.acos().to_degrees();

    let v1 = (start - center) * (1.0 / a);
    let v2 = (end - center) * (1.0 / b);
    let cross = v1.x * v2.y - v1.y * v2.x;

    if cross < 0.0 { -magnitude } else { magnitude }
}

/// Rotate `point` around `center` by `angle` degrees (clockwise on screen).
pub fn rotate_point(point: Point, center: Point, angle: f64) -> Point {
    if angle == 0.0 {
        return point;
    }
    let (sin, cos) = angle.to_radians().sin_cos();
    let d = point - center;
    Point::new(
        center.x + d.x * cos - d.y * sin,
        center.y + d.x * sin + d.y * cos,
    )
}

// ─── Edge panning ────────────────────────────────────────────────────────

/// Linear ramp from `max_force` at the edge down to 0 at `threshold`.
pub fn calculate_gradual_force(distance_from_edge: f64, max_force: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 || distance_from_edge >= threshold {
        return 0.0;
    }
    max_force * (1.0 - distance_from_edge.max(0.0) / threshold)
}

/// A container edge or corner, as seen from a point inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEdge {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Distance from `point` to one side of `container`. Corners use the
/// Manhattan distance to the corner.
pub fn calculate_distance_from_edge(container: &Rect, point: Point, edge: ScreenEdge) -> f64 {
    let left = point.x - container.x;
    let right = container.right() - point.x;
    let top = point.y - container.y;
    let bottom = container.bottom() - point.y;
    match edge {
        ScreenEdge::Left => left,
        ScreenEdge::Right => right,
        ScreenEdge::Top => top,
        ScreenEdge::Bottom => bottom,
        ScreenEdge::TopLeft => top + left,
        ScreenEdge::TopRight => top + right,
        ScreenEdge::BottomLeft => bottom + left,
        ScreenEdge::BottomRight => bottom + right,
    }
}

/// Which edge or corner of `container` the point is within `threshold` of.
pub fn detect_screen_edge(container: &Rect, point: Point, threshold: f64) -> Option<ScreenEdge> {
    let near_left = point.x - container.x < threshold;
    let near_right = container.right() - point.x < threshold;
    let near_top = point.y - container.y < threshold;
    let near_bottom = container.bottom() - point.y < threshold;

    match (near_left, near_right, near_top, near_bottom) {
        (true, _, true, _) => Some(ScreenEdge::TopLeft),
        (_, true, true, _) => Some(ScreenEdge::TopRight),
        (true, _, _, true) => Some(ScreenEdge::BottomLeft),
        (_, true, _, true) => Some(ScreenEdge::BottomRight),
        (true, ..) => Some(ScreenEdge::Left),
        (_, true, ..) => Some(ScreenEdge::Right),
        (_, _, true, _) => Some(ScreenEdge::Top),
        (.., true) => Some(ScreenEdge::Bottom),
        _ => None,
    }
}

/// Panning velocity for a pointer near the border of `container`.
/// Points towards the edge being approached; zero away from the edges.
pub fn edge_panning_force(container: &Rect, point: Point, max_force: f64, threshold: f64) -> Point {
    let force = |edge| {
        calculate_gradual_force(
            calculate_distance_from_edge(container, point, edge),
            max_force,
            threshold,
        )
    };
    let x = force(ScreenEdge::Right) - force(ScreenEdge::Left);
    let y = force(ScreenEdge::Bottom) - force(ScreenEdge::Top);
    Point::new(x, y)
}

// ─── Rectangles ──────────────────────────────────────────────────────────

/// Gap between two rectangles: 0 when they intersect, the axis gap when they
/// overlap on one axis, otherwise the corner-to-corner Euclidean distance.
pub fn distance_between_rects(a: &Rect, b: &Rect) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    let dx = (b.x - a.right()).max(a.x - b.right()).max(0.0);
    let dy = (b.y - a.bottom()).max(a.y - b.bottom()).max(0.0);
    if dx == 0.0 {
        dy
    } else if dy == 0.0 {
        dx
    } else {
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn clamp_and_distance() {
        assert_eq!(clamp(5.0, 0.0, 3.0), 3.0);
        assert_eq!(clamp(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(distance_between_points(Point::ZERO, Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn normalize_wraps_negative_and_large() {
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(360.0), 0.0);
        assert_eq!(normalize_angle(725.0), 5.0);
    }

    #[test]
    fn snapping_rounds_to_step() {
        assert_eq!(snap_number(14.0, 10.0), 10.0);
        assert_eq!(snap_number(15.0, 10.0), 20.0);
        assert_eq!(snap_number(-15.0, 10.0), -10.0);
        assert_eq!(snap_number(7.3, 0.0), 7.3);
        assert_eq!(
            snap_point(Point::new(12.0, 27.0), Size::new(10.0, 25.0)),
            Point::new(10.0, 25.0)
        );
        assert_eq!(snap_angle(44.0, 15.0), 45.0);
    }

    #[test]
    fn rotation_angle_sign_follows_pointer_direction() {
        let center = Point::ZERO;
        let handle = Point::new(1.0, 0.0);
        let up = angle_between_points(handle, center, Point::new(0.0, -10.0));
        let down = angle_between_points(handle, center, Point::new(0.0, 10.0));
        assert!(approx(up, -90.0), "got {up}");
        assert!(approx(down, 90.0), "got {down}");
        assert!(approx(up, -down));
    }

    #[test]
    fn rotation_angle_with_coincident_points_is_finite() {
        let a = angle_between_points(Point::ZERO, Point::ZERO, Point::ZERO);
        assert!(a.is_finite());
    }

    #[test]
    fn rotate_point_quarter_turn() {
        let p = rotate_point(Point::new(10.0, 0.0), Point::ZERO, 90.0);
        assert!(approx(p.x, 0.0) && approx(p.y, 10.0));
    }

    #[test]
    fn gradual_force_ramps_linearly() {
        assert_eq!(calculate_gradual_force(0.0, 10.0, 50.0), 10.0);
        assert_eq!(calculate_gradual_force(25.0, 10.0, 50.0), 5.0);
        assert_eq!(calculate_gradual_force(50.0, 10.0, 50.0), 0.0);
        assert_eq!(calculate_gradual_force(80.0, 10.0, 50.0), 0.0);
    }

    #[test]
    fn distance_from_edges_and_corners() {
        let container = Rect::new(0.0, 0.0, 100.0, 100.0);
        let p = Point::new(10.0, 20.0);
        assert_eq!(calculate_distance_from_edge(&container, p, ScreenEdge::Left), 10.0);
        assert_eq!(calculate_distance_from_edge(&container, p, ScreenEdge::Bottom), 80.0);
        assert_eq!(calculate_distance_from_edge(&container, p, ScreenEdge::TopLeft), 30.0);
        assert_eq!(detect_screen_edge(&container, p, 25.0), Some(ScreenEdge::TopLeft));
        assert_eq!(detect_screen_edge(&container, Point::new(50.0, 50.0), 25.0), None);
    }

    #[test]
    fn panning_force_points_towards_edge() {
        let container = Rect::new(0.0, 0.0, 100.0, 100.0);
        let f = edge_panning_force(&container, Point::new(95.0, 50.0), 10.0, 10.0);
        assert!(f.x > 0.0);
        assert_eq!(f.y, 0.0);
    }

    #[test]
    fn rect_distances() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(distance_between_rects(&a, &Rect::new(5.0, 5.0, 10.0, 10.0)), 0.0);
        assert_eq!(distance_between_rects(&a, &Rect::new(20.0, 0.0, 10.0, 10.0)), 10.0);
        assert_eq!(distance_between_rects(&a, &Rect::new(0.0, 15.0, 10.0, 10.0)), 5.0);
        assert_eq!(distance_between_rects(&a, &Rect::new(13.0, 14.0, 5.0, 5.0)), 5.0);
    }

    #[test]
    fn bounding_rect() {
        let r = Rect::bounding([Point::new(1.0, 5.0), Point::new(-2.0, 3.0)]).unwrap();
        assert_eq!(r, Rect::new(-2.0, 3.0, 3.0, 2.0));
        assert!(Rect::bounding(std::iter::empty()).is_none());
    }
}
