// src/analysis/surrogates.rs
//
// Time-based surrogate safety measures. TTC, MTTC and THW work on the
// per-frame longitudinal closing state and are capped; "never" maps to the
// cap. PET is computed once over a whole scenario track.

use glam::DVec2;

const MIN_DIVISOR: f64 = 1e-9;

/// Two bumper positions closer than this count as the same conflict point.
pub const PET_CONFLICT_RADIUS: f64 = 1.0;

/// Time to collision at constant closing speed.
pub fn ttc(gap: f64, closing_speed: f64, cap: f64) -> f64 {
    if closing_speed <= MIN_DIVISOR || !gap.is_finite() {
        return cap;
    }
    (gap.max(0.0) / closing_speed).min(cap)
}

/// Modified TTC: smallest positive root of `½·a·t² + v·t − d = 0`.
pub fn mttc(gap: f64, closing_speed: f64, closing_accel: f64, cap: f64) -> f64 {
    if closing_accel.abs() < MIN_DIVISOR {
        return ttc(gap, closing_speed, cap);
    }
    if !gap.is_finite() {
        return cap;
    }
    let gap = gap.max(0.0);
    let discriminant = closing_speed * closing_speed + 2.0 * closing_accel * gap;
    if discriminant < 0.0 {
        return cap;
    }
    let root = discriminant.sqrt();
    [
        (-closing_speed - root) / closing_accel,
        (-closing_speed + root) / closing_accel,
    ]
    .into_iter()
    .filter(|t| *t >= 0.0 && t.is_finite())
    .fold(cap, f64::min)
}

/// Time headway: how long the ego body needs to cover the gap.
pub fn thw(gap: f64, ego_speed: f64, cap: f64) -> f64 {
    ttc(gap, ego_speed, cap)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumperSample {
    pub timestamp: f64,
    pub ego_front: DVec2,
    pub other_rear: DVec2,
}

/// Post-encroachment time: the smallest `|t_i − t_j|` over all frame pairs
/// where the ego front bumper at `t_i` lies within `radius` of the other
/// body's rear bumper at `t_j`. `None` when the two never pass the same point.
pub fn pet(track: &[BumperSample], radius: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for ego in track {
        for other in track {
            if ego.ego_front.distance(other.other_rear) >= radius {
                continue;
            }
            let gap = (ego.timestamp - other.timestamp).abs();
            if best.map_or(true, |b| gap < b) {
                best = Some(gap);
            }
        }
    }
    best
}
