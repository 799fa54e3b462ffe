//! Planar geometry for site layouts: points, distances and the segment crossing filter
use serde::{Deserialize, Serialize};

/// Orientation values smaller than this are treated as collinear
const COLLINEAR_EPSILON: f64 = 1e-9;

/// A point in a planar projected coordinate system (e.g. metres east / north)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Euclidean distance between two points
pub fn distance(a: &Point, b: &Point) -> f64 {
    a.distance(b)
}

/// A straight segment between two named nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub start: Point,
    pub end: Point,
}

impl<'a> Segment<'a> {
    pub fn new(from: &'a str, start: Point, to: &'a str, end: Point) -> Self {
        Self {
            from,
            to,
            start,
            end,
        }
    }

    fn shares_endpoint(&self, other: &Segment<'_>) -> bool {
        self.from == other.from
            || self.from == other.to
            || self.to == other.from
            || self.to == other.to
    }
}

/// Sign of the turn a -> b -> c: 1 for counter-clockwise, -1 for clockwise, 0 when collinear
fn orientation(a: &Point, b: &Point, c: &Point) -> i8 {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if cross > COLLINEAR_EPSILON {
        1
    } else if cross < -COLLINEAR_EPSILON {
        -1
    } else {
        0
    }
}

/// Whether the interiors of two segments intersect in a single point
///
/// Segments sharing an endpoint name never cross. Touching at an endpoint
/// (a T-junction) and collinear overlap are not crossings either.
pub fn segments_cross(first: &Segment<'_>, second: &Segment<'_>) -> bool {
    if first.shares_endpoint(second) {
        return false;
    }
    let o1 = orientation(&first.start, &first.end, &second.start);
    let o2 = orientation(&first.start, &first.end, &second.end);
    let o3 = orientation(&second.start, &second.end, &first.start);
    let o4 = orientation(&second.start, &second.end, &first.end);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// Index pairs `(i, j)`, `i < j`, of every crossing pair of segments
pub fn crossing_pairs(segments: &[Segment<'_>]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, first) in segments.iter().enumerate() {
        for (j, second) in segments.iter().enumerate().skip(i + 1) {
            if segments_cross(first, second) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg<'a>(from: &'a str, a: (f64, f64), to: &'a str, b: (f64, f64)) -> Segment<'a> {
        Segment::new(from, Point::new(a.0, a.1), to, Point::new(b.0, b.1))
    }

    #[test]
    fn distance_is_euclidean() {
        assert!((distance(&Point::new(0., 0.), &Point::new(3000., 4000.)) - 5000.).abs() < 1e-9);
    }

    #[test]
    fn x_shape_crosses() {
        let a = seg("A", (0., 0.), "B", (2., 2.));
        let b = seg("C", (0., 2.), "D", (2., 0.));
        assert!(segments_cross(&a, &b));
        assert!(segments_cross(&b, &a));
    }

    #[test]
    fn shared_endpoint_does_not_cross() {
        let a = seg("A", (0., 0.), "B", (2., 2.));
        let b = seg("B", (2., 2.), "C", (4., 0.));
        assert!(!segments_cross(&a, &b));
        // Shared names count even if the geometry would cross
        let c = seg("A", (0., 2.), "D", (2., 0.));
        assert!(!segments_cross(&a, &c));
    }

    #[test]
    fn t_junction_does_not_cross() {
        let a = seg("A", (0., 0.), "B", (4., 0.));
        let b = seg("C", (2., 0.), "D", (2., 3.));
        assert!(!segments_cross(&a, &b));
    }

    #[test]
    fn parallel_and_collinear_do_not_cross() {
        let a = seg("A", (0., 0.), "B", (4., 0.));
        let parallel = seg("C", (0., 1.), "D", (4., 1.));
        let overlapping = seg("E", (2., 0.), "F", (6., 0.));
        assert!(!segments_cross(&a, &parallel));
        assert!(!segments_cross(&a, &overlapping));
    }

    #[test]
    fn crossing_pairs_lists_each_pair_once() {
        let segments = vec![
            seg("A", (0., 0.), "B", (2., 2.)),
            seg("C", (0., 2.), "D", (2., 0.)),
            seg("E", (5., 5.), "F", (6., 6.)),
        ];
        assert_eq!(crossing_pairs(&segments), vec![(0, 1)]);
    }
}
