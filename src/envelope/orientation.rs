// src/envelope/orientation.rs

use crate::types::{Orientation, RigidBody};
use std::f64::consts::{PI, TAU};

const ALIGNED_MAX_DEG: f64 = 30.0;
const OPPOSED_MIN_DEG: f64 = 150.0;
const BEARING_CONE_DEG: f64 = 45.0;

/// Smallest absolute difference between two angles, in [0, π].
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let mut diff = (b - a).rem_euclid(TAU);
    if diff > PI {
        diff -= TAU;
    }
    diff.abs()
}

pub fn classify(ego: &RigidBody, challenger: &RigidBody) -> Orientation {
    let delta = angle_difference(ego.heading, challenger.heading);

    if delta < ALIGNED_MAX_DEG.to_radians() {
        return Orientation::Same;
    }
    if delta > OPPOSED_MIN_DEG.to_radians() {
        return Orientation::Opposite;
    }

    // Oblique: crossing if either body points at the other
    let to_challenger = challenger.center - ego.center;
    let bearing = to_challenger.y.atan2(to_challenger.x);
    let back_bearing = (bearing + PI).rem_euclid(TAU);
    let cone = BEARING_CONE_DEG.to_radians();

    if angle_difference(ego.heading, bearing) < cone
        || angle_difference(challenger.heading, back_bearing) < cone
    {
        Orientation::Intersecting
    } else if delta < PI / 2.0 {
        Orientation::Same
    } else {
        Orientation::Opposite
    }
}
