//! Point queries along a polyline path.

use crate::geometry::{Point, distance_between_points};

/// Total length of the polyline through `points`.
pub fn path_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| distance_between_points(w[0], w[1]))
        .sum()
}

/// The point `distance` units along the path. Negative distances are
/// measured back from the end; the result is clamped to the path.
///
/// Paths with fewer than two points have no direction, so they yield the
/// `{0, 0}` sentinel instead of an error.
pub fn point_at_distance(points: &[Point], distance: f64) -> Point {
    if points.len() < 2 {
        return Point::ZERO;
    }
    let total = path_length(points);
    if total == 0.0 {
        return points[0];
    }
    let wanted = if distance < 0.0 {
        total + distance
    } else {
        distance
    }
    .clamp(0.0, total);

    let mut walked = 0.0;
    for w in points.windows(2) {
        let segment = distance_between_points(w[0], w[1]);
        if segment == 0.0 {
            continue;
        }
        if walked + segment >= wanted {
            return w[0].lerp(w[1], (wanted - walked) / segment);
        }
        walked += segment;
    }
    points[points.len() - 1]
}

/// The point at `percentage` (0..1, clamped) of the path length.
pub fn point_at_percentage(points: &[Point], percentage: f64) -> Point {
    if points.len() < 2 {
        return Point::ZERO;
    }
    point_at_distance(points, path_length(points) * percentage.clamp(0.0, 1.0))
}
