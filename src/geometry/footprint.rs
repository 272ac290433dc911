// src/geometry/footprint.rs
//
// Per-body reference frame: bounding box, bumper/side reference points
// and the long virtual lines hanging off them.

use super::primitives::{Polygon, Segment, VIRTUAL_LINE_LENGTH};
use crate::types::RigidBody;
use glam::DVec2;

/// A reference point on the body outline plus the literal edge it sits on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSide {
    pub point: DVec2,
    pub edge: Segment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub center: DVec2,
    pub heading: f64,
    pub length: f64,
    pub width: f64,
}

impl Footprint {
    pub fn new(center: DVec2, heading: f64, length: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            length,
            width,
        }
    }

    pub fn of(body: &RigidBody) -> Self {
        Self::new(body.center, body.heading, body.length, body.width)
    }

    pub fn forward(&self) -> DVec2 {
        DVec2::from_angle(self.heading)
    }

    /// Unit normal pointing to the body's left.
    pub fn left(&self) -> DVec2 {
        self.forward().perp()
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.length > 0.0 && self.width > 0.0)
            || !self.center.is_finite()
            || !self.heading.is_finite()
    }

    fn half_extents(&self) -> (DVec2, DVec2) {
        (
            self.forward() * (self.length * 0.5),
            self.left() * (self.width * 0.5),
        )
    }

    /// Corners counter-clockwise starting at front-left.
    pub fn bounding_polygon(&self) -> Polygon {
        let (f, l) = self.half_extents();
        let c = self.center;
        Polygon::new(vec![c + f + l, c - f + l, c - f - l, c + f - l])
    }

    pub fn front_bumper(&self) -> ReferenceSide {
        let (f, l) = self.half_extents();
        let point = self.center + f;
        ReferenceSide {
            point,
            edge: Segment::new(point + l, point - l),
        }
    }

    pub fn rear_bumper(&self) -> ReferenceSide {
        let (f, l) = self.half_extents();
        let point = self.center - f;
        ReferenceSide {
            point,
            edge: Segment::new(point + l, point - l),
        }
    }

    pub fn left_side(&self) -> ReferenceSide {
        let (f, l) = self.half_extents();
        let point = self.center + l;
        ReferenceSide {
            point,
            edge: Segment::new(point - f, point + f),
        }
    }

    pub fn right_side(&self) -> ReferenceSide {
        let (f, l) = self.half_extents();
        let point = self.center - l;
        ReferenceSide {
            point,
            edge: Segment::new(point - f, point + f),
        }
    }

    fn bumper_line(&self, point: DVec2) -> Segment {
        let half = self.left() * (VIRTUAL_LINE_LENGTH * 0.5);
        Segment::new(point + half, point - half)
    }

    pub fn front_bumper_line(&self) -> Segment {
        self.bumper_line(self.front_bumper().point)
    }

    pub fn rear_bumper_line(&self) -> Segment {
        self.bumper_line(self.rear_bumper().point)
    }

    fn side_line(&self, point: DVec2) -> Segment {
        let (f, _) = self.half_extents();
        Segment::new(point - f, point + self.forward() * VIRTUAL_LINE_LENGTH)
    }

    pub fn left_side_line(&self) -> Segment {
        self.side_line(self.left_side().point)
    }

    pub fn right_side_line(&self) -> Segment {
        self.side_line(self.right_side().point)
    }

    pub fn heading_ray(&self) -> Segment {
        Segment::new(
            self.center,
            self.center + self.forward() * VIRTUAL_LINE_LENGTH,
        )
    }

    /// Forward travel corridor between the two side lines.
    pub fn path_polygon(&self) -> Polygon {
        let left = self.left_side_line();
        let right = self.right_side_line();
        Polygon::new(vec![left.end, left.start, right.start, right.end])
    }
}

/// Whether two bodies' forward corridors can meet.
pub fn paths_conflict(a: &Footprint, b: &Footprint) -> bool {
    let a_lines = [a.left_side_line(), a.right_side_line()];
    let b_lines = [b.left_side_line(), b.right_side_line()];
    if a_lines
        .iter()
        .any(|la| b_lines.iter().any(|lb| la.intersects(lb)))
    {
        return true;
    }

    let a_path = a.path_polygon();
    let b_path = b.path_polygon();
    a_path.intersects(&b.bounding_polygon())
        || b_path.intersects(&a.bounding_polygon())
        || a_path.intersects(&b_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_reference_points_east_heading() {
        let fp = Footprint::new(DVec2::new(10.0, 5.0), 0.0, 4.0, 2.0);
        assert!(approx(fp.front_bumper().point, DVec2::new(12.0, 5.0)));
        assert!(approx(fp.rear_bumper().point, DVec2::new(8.0, 5.0)));
        assert!(approx(fp.left_side().point, DVec2::new(10.0, 6.0)));
        assert!(approx(fp.right_side().point, DVec2::new(10.0, 4.0)));
        assert!((fp.front_bumper().edge.length() - 2.0).abs() < 1e-9);
        assert!((fp.left_side().edge.length() - 4.0).abs() < 1e-9);
        assert!((fp.bounding_polygon().area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_points_north_heading() {
        let fp = Footprint::new(DVec2::ZERO, FRAC_PI_2, 4.0, 2.0);
        assert!(approx(fp.front_bumper().point, DVec2::new(0.0, 2.0)));
        // left of north is west
        assert!(approx(fp.left_side().point, DVec2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_virtual_lines() {
        let fp = Footprint::new(DVec2::ZERO, 0.0, 4.0, 2.0);
        let bumper = fp.front_bumper_line();
        assert!((bumper.length() - VIRTUAL_LINE_LENGTH).abs() < 1e-9);
        assert!(approx(bumper.closest_point(DVec2::new(2.0, 0.0)), DVec2::new(2.0, 0.0)));

        let side = fp.left_side_line();
        assert!(approx(side.start, DVec2::new(-2.0, 1.0)));
        assert!(approx(side.end, DVec2::new(VIRTUAL_LINE_LENGTH, 1.0)));

        let ray = fp.heading_ray();
        assert!(approx(ray.end, DVec2::new(VIRTUAL_LINE_LENGTH, 0.0)));

        let path = fp.path_polygon();
        assert!(path.contains(DVec2::new(50.0, 0.5)));
        assert!(!path.contains(DVec2::new(50.0, 1.5)));
    }

    #[test]
    fn test_paths_conflict() {
        let a = Footprint::new(DVec2::ZERO, 0.0, 4.0, 2.0);
        let ahead = Footprint::new(DVec2::new(20.0, 0.0), 0.0, 4.0, 2.0);
        let beside = Footprint::new(DVec2::new(0.0, 5.0), 0.0, 4.0, 2.0);
        let crossing = Footprint::new(DVec2::new(30.0, -20.0), FRAC_PI_2, 4.0, 2.0);
        assert!(paths_conflict(&a, &ahead));
        assert!(!paths_conflict(&a, &beside));
        assert!(paths_conflict(&a, &crossing));
    }

    #[test]
    fn test_degenerate() {
        assert!(Footprint::new(DVec2::ZERO, 0.0, 0.0, 2.0).is_degenerate());
        assert!(Footprint::new(DVec2::new(f64::NAN, 0.0), 0.0, 1.0, 1.0).is_degenerate());
        assert!(!Footprint::new(DVec2::ZERO, 0.0, 1.0, 1.0).is_degenerate());
    }
}
