// src/envelope/gap.rs
//
// Measured longitudinal / lateral gaps. The straight-line distance is
// split into legs using the heading difference as the triangle angle.
// That is only exact when both reference points sit on the bodies'
// long axes; it is kept as-is.

use super::orientation::angle_difference;
use crate::geometry::Footprint;
use crate::types::{GapMeasurement, RigidBody};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Which side of the ego body the challenger's center is on. Exactly
/// ahead or behind counts as right.
pub fn challenger_side(ego: &RigidBody, challenger: &RigidBody) -> Side {
    let cross = ego.forward().perp_dot(challenger.center - ego.center);
    if cross > 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Returns `(left, right)`.
pub fn lateral_pair<'a>(
    ego: &'a RigidBody,
    challenger: &'a RigidBody,
) -> (&'a RigidBody, &'a RigidBody) {
    match challenger_side(ego, challenger) {
        Side::Left => (challenger, ego),
        Side::Right => (ego, challenger),
    }
}

/// `(hypotenuse·cos θ, hypotenuse·sin θ)`
pub fn triangle_legs(hypotenuse: f64, angle: f64) -> (f64, f64) {
    (hypotenuse * angle.cos(), hypotenuse * angle.sin())
}

pub fn longitudinal_gap(ego: &RigidBody, challenger: &RigidBody) -> f64 {
    let bumper = Footprint::of(ego).front_bumper().point;
    let distance = Footprint::of(challenger)
        .bounding_polygon()
        .distance_to_point(bumper);
    let angle = angle_difference(ego.heading, challenger.heading);
    let (d_lon, _) = triangle_legs(distance, angle);
    d_lon
}

pub fn lateral_gap(ego: &RigidBody, challenger: &RigidBody) -> f64 {
    let (left, right) = lateral_pair(ego, challenger);
    let side_point = Footprint::of(left).right_side().point;
    let distance = Footprint::of(right)
        .bounding_polygon()
        .distance_to_point(side_point);
    let angle = angle_difference(left.heading, right.heading);
    let (_, d_lat) = triangle_legs(distance, angle);
    d_lat
}

pub fn measure(ego: &RigidBody, challenger: &RigidBody) -> GapMeasurement {
    let d_lon = finite_or_far(longitudinal_gap(ego, challenger));
    let d_lat = finite_or_far(lateral_gap(ego, challenger));
    debug!("Measured gap: d_lon={:.3}, d_lat={:.3}", d_lon, d_lat);
    GapMeasurement { d_lon, d_lat }
}

fn finite_or_far(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::INFINITY
    }
}
