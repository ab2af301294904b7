//! Edge curve geometry.
//!
//! Edges are drawn as horizontal-biased cubic beziers. The same curve is used
//! for painting and for hit testing so a click lands where the edge is drawn.

use crate::geometry::Point;

/// Below this endpoint distance an edge is drawn as a straight line.
const STRAIGHT_LINE_THRESHOLD: f64 = 10.0;

/// Cubic bezier curve for distance calculations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicBezier {
    /// Curve from an output port center to an input port center.
    ///
    /// Control points extend horizontally by half the horizontal distance,
    /// but never less than `min_offset`. Very short edges collapse to a line.
    pub fn between(start: Point, end: Point, min_offset: f64) -> Self {
        if start.distance(end) < STRAIGHT_LINE_THRESHOLD {
            return CubicBezier {
                p0: start,
                p1: start,
                p2: end,
                p3: end,
            };
        }

        let offset = ((end.x - start.x).abs() * 0.5).max(min_offset);
        CubicBezier {
            p0: start,
            p1: start.offset(offset, 0.0),
            p2: end.offset(-offset, 0.0),
            p3: end,
        }
    }

    pub fn is_straight(&self) -> bool {
        self.p1 == self.p0 && self.p2 == self.p3
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f64) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x;
        let y = mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y;
        Point::new(x, y)
    }

    /// SVG path commands, e.g. `M 10 20 C 60 20 90 80 140 80`.
    pub fn to_svg(&self) -> String {
        if self.is_straight() {
            return format!("M {} {} L {} {}", self.p0.x, self.p0.y, self.p3.x, self.p3.y);
        }
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.p0.x, self.p0.y, self.p1.x, self.p1.y, self.p2.x, self.p2.y, self.p3.x, self.p3.y
        )
    }
}

/// SVG path commands for an edge between two port centers.
pub fn bezier_path(start: Point, end: Point, min_offset: f64) -> String {
    CubicBezier::between(start, end, min_offset).to_svg()
}

/// Squared distance from a point to a line segment
fn distance_to_line_segment_sq(point: Point, a: Point, b: Point) -> f64 {
    let ab = (b.x - a.x, b.y - a.y);
    let ap = (point.x - a.x, point.y - a.y);

    let ab_len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if ab_len_sq < f64::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }

    // project onto the segment
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len_sq).clamp(0.0, 1.0);
    let dx = point.x - (a.x + t * ab.0);
    let dy = point.y - (a.y + t * ab.1);
    dx * dx + dy * dy
}

/// Minimum distance from a point to a cubic bezier curve
///
/// Samples the curve into `num_samples` segments (20 when zero is passed) and
/// measures against the resulting polyline.
pub fn distance_to_bezier(point: Point, bezier: &CubicBezier, num_samples: usize) -> f64 {
    let num_samples = if num_samples == 0 { 20 } else { num_samples };

    let mut min_dist_sq = f64::MAX;
    let mut prev = bezier.eval(0.0);
    for i in 1..=num_samples {
        let curr = bezier.eval(i as f64 / num_samples as f64);
        min_dist_sq = min_dist_sq.min(distance_to_line_segment_sq(point, prev, curr));
        prev = curr;
    }
    min_dist_sq.sqrt()
}
