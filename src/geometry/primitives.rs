// src/geometry/primitives.rs
//
// Segments and polygons in the ground plane. Everything is f64 and
// pure; no shape carries state between frames.

use glam::DVec2;

/// Length of the "virtual infinite" reference lines (bumper lines, side
/// lines, heading ray). Only used for intersection tests.
pub const VIRTUAL_LINE_LENGTH: f64 = 1000.0;

const EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: DVec2,
    pub end: DVec2,
}

impl Segment {
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        let d = self.end - self.start;
        let len_sq = d.length_squared();
        if len_sq < EPS {
            return self.start;
        }
        let t = ((p - self.start).dot(d) / len_sq).clamp(0.0, 1.0);
        self.start + d * t
    }

    pub fn distance_to_point(&self, p: DVec2) -> f64 {
        self.closest_point(p).distance(p)
    }

    pub fn intersects(&self, other: &Segment) -> bool {
        let (p1, p2, p3, p4) = (self.start, self.end, other.start, other.end);
        let d1 = orient(p3, p4, p1);
        let d2 = orient(p3, p4, p2);
        let d3 = orient(p1, p2, p3);
        let d4 = orient(p1, p2, p4);

        if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
            && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
        {
            return true;
        }

        // Touching and collinear cases
        (d1.abs() <= EPS && on_segment(p3, p4, p1))
            || (d2.abs() <= EPS && on_segment(p3, p4, p2))
            || (d3.abs() <= EPS && on_segment(p1, p2, p3))
            || (d4.abs() <= EPS && on_segment(p1, p2, p4))
    }

    pub fn distance_to_segment(&self, other: &Segment) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(other.start)
            .min(self.distance_to_point(other.end))
            .min(other.distance_to_point(self.start))
            .min(other.distance_to_point(self.end))
    }
}

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn on_segment(a: DVec2, b: DVec2, p: DVec2) -> bool {
    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

/// Closed simple polygon; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<DVec2>,
}

impl Polygon {
    pub fn new(vertices: Vec<DVec2>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn area(&self) -> f64 {
        self.edges()
            .map(|e| e.start.perp_dot(e.end))
            .sum::<f64>()
            .abs()
            * 0.5
    }

    /// Even-odd ray cast; points on the boundary count as inside.
    pub fn contains(&self, p: DVec2) -> bool {
        if self.edges().any(|e| e.distance_to_point(p) <= EPS) {
            return true;
        }
        let mut inside = false;
        for e in self.edges() {
            let (a, b) = (e.start, e.end);
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn distance_to_point(&self, p: DVec2) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        self.edges()
            .map(|e| e.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn intersects_segment(&self, segment: &Segment) -> bool {
        self.contains(segment.start)
            || self.contains(segment.end)
            || self.edges().any(|e| e.intersects(segment))
    }

    pub fn distance_to_segment(&self, segment: &Segment) -> f64 {
        if self.intersects_segment(segment) {
            return 0.0;
        }
        self.edges()
            .map(|e| e.distance_to_segment(segment))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn intersects(&self, other: &Polygon) -> bool {
        self.vertices.iter().any(|&v| other.contains(v))
            || other.vertices.iter().any(|&v| self.contains(v))
            || self
                .edges()
                .any(|a| other.edges().any(|b| a.intersects(&b)))
    }

    pub fn distance_to_polygon(&self, other: &Polygon) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        self.edges()
            .flat_map(|a| other.edges().map(move |b| a.distance_to_segment(&b)))
            .fold(f64::INFINITY, f64::min)
    }
}
