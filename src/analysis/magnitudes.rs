// src/analysis/magnitudes.rs
//
// Per-frame severity in [0, 1] for each metric kind.

use crate::envelope::min_gap;
use crate::geometry::Footprint;
use crate::types::{MetricKind, MetricRecord, Orientation, RigidBody, ThresholdConfig};

// ============================================================================
// CONSTANTS
// ============================================================================

/// `(scale, rate)` for `scale · e^(rate · Δv)`
const SIDE_IMPACT: (f64, f64) = (0.1548, 0.1784);
const REAR_IMPACT: (f64, f64) = (0.0137, 0.1733);
const FRONT_IMPACT: (f64, f64) = (0.0458, 0.165);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactZone {
    Side,
    Rear,
    Front,
}

impl ImpactZone {
    fn coefficients(&self) -> (f64, f64) {
        match self {
            ImpactZone::Side => SIDE_IMPACT,
            ImpactZone::Rear => REAR_IMPACT,
            ImpactZone::Front => FRONT_IMPACT,
        }
    }
}

fn clip_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Severity of an envelope infringement, shared by SEI and SEV.
pub fn envelope_magnitude(
    orientation: Orientation,
    ego: &RigidBody,
    challenger: &RigidBody,
    mrd_proportion: f64,
) -> f64 {
    if orientation == Orientation::Opposite {
        return 1.0;
    }

    let d_self = min_gap::longitudinal(orientation, ego, challenger);
    let d_other = min_gap::longitudinal(orientation, challenger, ego);
    let d_min = d_self.max(d_other);
    let self_decel = ego.envelope.lon_max_decel;
    if !(self_decel > 0.0) {
        return 0.0;
    }

    let magnitude = match orientation {
        Orientation::Intersecting => {
            let denom = 2.0 * d_min;
            if !(denom > 0.0) || !denom.is_finite() {
                return 0.0;
            }
            (challenger.kinematics.speed_lon / denom) / self_decel
        }
        _ => {
            let v_self = ego.kinematics.speed_lon;
            let v_other = challenger.kinematics.speed_lon;
            let other_decel = mrd_proportion * challenger.envelope.lon_max_decel;
            if !(other_decel > 0.0) {
                return 0.0;
            }
            let denom = 2.0 * d_min + v_other * v_other / (2.0 * other_decel);
            if !(denom > 0.0) || !denom.is_finite() {
                return 0.0;
            }
            let mrd = v_self * v_self / denom;
            mrd / self_decel
        }
    };
    clip_unit(magnitude)
}

/// Which reference point of the struck body (side, rear or front midpoint)
/// the ego front bumper is closest to. Ties resolve side, then rear, then front.
pub fn impact_zone(ego: &RigidBody, challenger: &RigidBody) -> ImpactZone {
    let bumper = Footprint::of(ego).front_bumper().point;
    let struck = Footprint::of(challenger);
    let candidates = [
        (ImpactZone::Side, struck.left_side()),
        (ImpactZone::Side, struck.right_side()),
        (ImpactZone::Rear, struck.rear_bumper()),
        (ImpactZone::Front, struck.front_bumper()),
    ];

    let mut best = (ImpactZone::Side, f64::INFINITY);
    for (zone, side) in candidates {
        let d = side.point.distance(bumper);
        if d < best.1 {
            best = (zone, d);
        }
    }
    best.0
}

pub fn collision_magnitude(ego: &RigidBody, challenger: &RigidBody) -> f64 {
    let delta_v = (ego.kinematics.speed_lon - challenger.kinematics.speed_lon).abs();
    let (scale, rate) = impact_zone(ego, challenger).coefficients();
    clip_unit(scale * (rate * delta_v).exp())
}

/// `(violation, magnitude)` for the ego body's total acceleration.
pub fn aggressive_acceleration(ego: &RigidBody, thresholds: &ThresholdConfig) -> (bool, f64) {
    let k = &ego.kinematics;
    let ramp = if k.accel_lon >= 0.0 {
        &thresholds.aggressive_accel
    } else {
        &thresholds.aggressive_decel
    };
    let value = k.accel.abs();
    let violation = value > ramp.min;
    (violation, if violation { ramp.ratio(value) } else { 0.0 })
}

/// Record for kinds with no scoring model.
pub fn stub(kind: MetricKind) -> MetricRecord {
    debug_assert!(kind.is_stub());
    MetricRecord::clear(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyKind, Kinematics};
    use glam::DVec2;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn body(x: f64, y: f64, heading: f64, v_lon: f64) -> RigidBody {
        RigidBody {
            center: DVec2::new(x, y),
            heading,
            length: 4.0,
            width: 2.0,
            kinematics: Kinematics {
                speed: v_lon.abs(),
                speed_lon: v_lon,
                ..Kinematics::default()
            },
            envelope: BodyKind::Vehicle.default_envelope(),
        }
    }

    #[test]
    fn test_opposite_is_full_severity() {
        let ego = body(0.0, 0.0, 0.0, 10.0);
        let other = body(20.0, 0.0, PI, -10.0);
        assert_eq!(envelope_magnitude(Orientation::Opposite, &ego, &other, 0.5), 1.0);
    }

    #[test]
    fn test_same_direction_mrd() {
        let ego = body(0.0, 0.0, 0.0, 10.0);
        let lead = body(8.0, 0.0, 0.0, 10.0);
        let d_min = min_gap::longitudinal(Orientation::Same, &ego, &lead);
        let e = BodyKind::Vehicle.default_envelope();
        let expected = 100.0 / (2.0 * d_min + 100.0 / (2.0 * 0.5 * e.lon_max_decel)) / e.lon_max_decel;
        let m = envelope_magnitude(Orientation::Same, &ego, &lead, 0.5);
        assert!((m - expected.clamp(0.0, 1.0)).abs() < 1e-9);
        assert!(m > 0.0);
    }

    #[test]
    fn test_intersecting_magnitude() {
        let ego = body(0.0, 0.0, 0.0, 10.0);
        let crossing = body(8.0, -6.0, FRAC_PI_2, 10.0);
        let e = BodyKind::Vehicle.default_envelope();

        // both bodies share speed and envelope, so either role gives the same gap
        let v_resp = 10.0 + e.response_time * e.lon_max_accel;
        let d_min = (20.0 + e.response_time * e.lon_max_accel) / 2.0 * e.response_time
            + v_resp * v_resp / (2.0 * e.lon_min_decel);
        let expected = (10.0 / (2.0 * d_min)) / e.lon_max_decel;

        let m = envelope_magnitude(Orientation::Intersecting, &ego, &crossing, 0.5);
        assert!((m - expected).abs() < 1e-12);
        assert!((m - 0.039600264).abs() < 1e-8);
    }

    #[test]
    fn test_stationary_ego_has_no_envelope_severity() {
        let ego = body(0.0, 0.0, 0.0, 0.0);
        let lead = body(8.0, 0.0, 0.0, 0.0);
        assert_eq!(envelope_magnitude(Orientation::Same, &ego, &lead, 0.5), 0.0);
    }

    #[test]
    fn test_impact_zones() {
        let ego = body(0.0, 0.0, 0.0, 10.0);
        // bumper at x=2 touching the rear of a lead body
        assert_eq!(impact_zone(&ego, &body(3.5, 0.0, 0.0, 5.0)), ImpactZone::Rear);
        // T-bone into a crossing body's side
        assert_eq!(impact_zone(&ego, &body(2.5, 0.0, FRAC_PI_2, 5.0)), ImpactZone::Side);
        // head-on
        assert_eq!(impact_zone(&ego, &body(3.5, 0.0, PI, -5.0)), ImpactZone::Front);
    }

    #[test]
    fn test_deep_rear_overlap_stays_rear() {
        // bumper at x=2 is 1.1 m past the lead's rear edge at x=0.9
        let ego = body(0.0, 0.0, 0.0, 15.0);
        let lead = body(2.9, 0.0, 0.0, 10.0);
        assert_eq!(impact_zone(&ego, &lead), ImpactZone::Rear);
        let expected = 0.0137 * (0.1733f64 * 5.0).exp();
        assert!((collision_magnitude(&ego, &lead) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_collision_magnitude_grows_with_delta_v() {
        let ego_slow = body(0.0, 0.0, 0.0, 6.0);
        let ego_fast = body(0.0, 0.0, 0.0, 15.0);
        let lead = body(3.5, 0.0, 0.0, 5.0);
        let slow = collision_magnitude(&ego_slow, &lead);
        let fast = collision_magnitude(&ego_fast, &lead);
        assert!((slow - 0.0137 * (0.1733f64).exp()).abs() < 1e-9);
        assert!(fast > slow);
    }

    #[test]
    fn test_aggressive_acceleration() {
        let t = ThresholdConfig::default();
        let mut ego = body(0.0, 0.0, 0.0, 10.0);

        ego.kinematics.accel_lon = 2.75;
        ego.kinematics.accel = 2.75;
        let (violation, m) = aggressive_acceleration(&ego, &t);
        assert!(violation);
        assert!((m - 0.5).abs() < 1e-9);

        ego.kinematics.accel_lon = -3.0;
        ego.kinematics.accel = -3.0;
        assert_eq!(aggressive_acceleration(&ego, &t), (false, 0.0));

        ego.kinematics.accel_lon = -9.0;
        ego.kinematics.accel = -9.0;
        assert_eq!(aggressive_acceleration(&ego, &t), (true, 1.0));
    }

    #[test]
    fn test_stub_kinds_are_clear() {
        for kind in MetricKind::ALL.iter().filter(|k| k.is_stub()) {
            let r = stub(*kind);
            assert!(!r.violation);
            assert_eq!(r.magnitude, 0.0);
        }
    }

    proptest! {
        #[test]
        fn test_magnitudes_bounded(
            x in -50.0f64..50.0,
            y in -50.0f64..50.0,
            h in -7.0f64..7.0,
            v1 in -40.0f64..40.0,
            v2 in -40.0f64..40.0,
            a in -12.0f64..12.0,
        ) {
            let mut ego = body(0.0, 0.0, 0.0, v1);
            ego.kinematics.accel_lon = a;
            ego.kinematics.accel = a;
            let other = body(x, y, h, v2);
            for o in [Orientation::Same, Orientation::Opposite, Orientation::Intersecting] {
                let m = envelope_magnitude(o, &ego, &other, 0.5);
                prop_assert!((0.0..=1.0).contains(&m));
            }
            let c = collision_magnitude(&ego, &other);
            prop_assert!((0.0..=1.0).contains(&c));
            let (_, aav) = aggressive_acceleration(&ego, &ThresholdConfig::default());
            prop_assert!((0.0..=1.0).contains(&aav));
        }
    }
}
