// src/envelope/min_gap.rs
//
// Closed-form minimum safe gaps. A formula that would divide by a
// (near-)zero deceleration yields MinimumGap::UNCONSTRAINED instead of
// a fault value.

use super::gap::lateral_pair;
use crate::types::{MinimumGap, Orientation, RigidBody};

const MIN_DIVISOR: f64 = 1e-9;

fn quotient(numerator: f64, divisor: f64) -> Option<f64> {
    if divisor.abs() < MIN_DIVISOR {
        return None;
    }
    let q = numerator / divisor;
    q.is_finite().then_some(q)
}

/// Distance covered accelerating at `accel` for `rho` seconds, then
/// braking at `decel` to a stop.
fn stopping_distance(v: f64, rho: f64, accel: f64, decel: f64) -> Option<f64> {
    let v_resp = v + rho * accel;
    let reaction = (2.0 * v + rho * accel) / 2.0 * rho;
    Some(reaction + quotient(v_resp * v_resp, 2.0 * decel)?)
}

fn or_unconstrained(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => MinimumGap::UNCONSTRAINED,
    }
}

/// Whether `ego` is the rear body of the pair, judged along the
/// challenger's heading.
pub fn is_following(ego: &RigidBody, challenger: &RigidBody) -> bool {
    (ego.center - challenger.center).dot(challenger.forward()) < 0.0
}

/// Car-following gap, `rear` behind `lead`. Floored at 0.
pub fn same_direction(rear: &RigidBody, lead: &RigidBody) -> f64 {
    let r = &rear.envelope;
    let v1 = rear.kinematics.speed_lon;
    let v2 = lead.kinematics.speed_lon;
    let gap = stopping_distance(v1, r.response_time, r.lon_max_accel, r.lon_min_decel)
        .zip(quotient(v2 * v2, 2.0 * lead.envelope.lon_max_accel))
        .map(|(rear_stop, lead_stop)| (rear_stop - lead_stop).max(0.0));
    or_unconstrained(gap)
}

/// Head-on gap; `second` is taken at its absolute longitudinal speed.
pub fn opposite_direction(first: &RigidBody, second: &RigidBody) -> f64 {
    let a = &first.envelope;
    let b = &second.envelope;
    let gap = stopping_distance(
        first.kinematics.speed_lon,
        a.response_time,
        a.lon_max_accel,
        a.lon_min_decel,
    )
    .zip(stopping_distance(
        second.kinematics.speed_lon.abs(),
        b.response_time,
        b.lon_max_accel,
        b.lon_min_decel,
    ))
    .map(|(x, y)| x + y);
    or_unconstrained(gap)
}

/// Gap the yielding body needs to stop before the conflict point.
pub fn intersecting(yielding: &RigidBody) -> f64 {
    let e = &yielding.envelope;
    or_unconstrained(stopping_distance(
        yielding.kinematics.speed_lon,
        e.response_time,
        e.lon_max_accel,
        e.lon_min_decel,
    ))
}

/// Required longitudinal gap with `subject` in the first role. In a
/// crossing the other body is the one that must yield.
pub fn longitudinal(orientation: Orientation, subject: &RigidBody, other: &RigidBody) -> f64 {
    match orientation {
        Orientation::Same => {
            if is_following(subject, other) {
                same_direction(subject, other)
            } else {
                same_direction(other, subject)
            }
        }
        Orientation::Opposite => opposite_direction(subject, other),
        Orientation::Intersecting => intersecting(other),
    }
}

/// Required lateral gap. The right body's excursion is subtracted and the
/// total is clipped at 0 before the left body's fluctuation margin is added.
pub fn lateral(ego: &RigidBody, challenger: &RigidBody) -> f64 {
    let (left, right) = lateral_pair(ego, challenger);
    let l = &left.envelope;
    let r = &right.envelope;

    let left_excursion = stopping_distance(
        left.kinematics.speed_lat,
        l.response_time,
        l.lat_max_accel,
        l.lat_min_decel,
    );

    let v_r = right.kinematics.speed_lat;
    let v_r_resp = v_r - r.response_time * r.lat_max_accel;
    let right_excursion = quotient(v_r_resp * v_r_resp, 2.0 * r.lat_min_decel).map(|brake| {
        (2.0 * v_r - r.response_time * r.lat_max_accel) / 2.0 * r.response_time + brake
    });

    let gap = left_excursion
        .zip(right_excursion)
        .map(|(lx, rx)| (lx - rx).max(0.0) + l.lateral_fluctuation_margin);
    or_unconstrained(gap)
}

pub fn compute(orientation: Orientation, ego: &RigidBody, challenger: &RigidBody) -> MinimumGap {
    MinimumGap {
        d_lon_min: longitudinal(orientation, ego, challenger),
        d_lat_min: lateral(ego, challenger),
    }
}
