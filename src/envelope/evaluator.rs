// src/envelope/evaluator.rs

use super::{gap, min_gap, orientation};
use crate::types::{GapMeasurement, MinimumGap, Orientation, RigidBody};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeVerdict {
    pub orientation: Orientation,
    pub measured: GapMeasurement,
    pub minimum: MinimumGap,
    /// Measured gap below the required gap on the axes that matter
    pub infringement: bool,
    pub lon_violation: bool,
    pub lat_violation: bool,
    /// Infringement charged to the ego body
    pub violation: bool,
}

impl EnvelopeVerdict {
    /// Verdict for a frame whose geometry cannot be evaluated.
    pub fn unconstrained(orientation: Orientation) -> Self {
        Self {
            orientation,
            measured: GapMeasurement {
                d_lon: f64::INFINITY,
                d_lat: f64::INFINITY,
            },
            minimum: MinimumGap {
                d_lon_min: MinimumGap::UNCONSTRAINED,
                d_lat_min: MinimumGap::UNCONSTRAINED,
            },
            infringement: false,
            lon_violation: false,
            lat_violation: false,
            violation: false,
        }
    }

    /// Measured over required gap per axis, `+∞` when nothing is required.
    pub fn envelope_ratios(&self) -> (f64, f64) {
        (
            envelope_ratio(self.measured.d_lon, self.minimum.d_lon_min),
            envelope_ratio(self.measured.d_lat, self.minimum.d_lat_min),
        )
    }
}

pub fn envelope_ratio(measured: f64, minimum: f64) -> f64 {
    if minimum > 0.0 {
        measured / minimum
    } else {
        f64::INFINITY
    }
}

/// True when the challenger stayed inside its own assumed braking and
/// lateral acceleration bounds.
pub fn challenger_within_assumptions(challenger: &RigidBody) -> bool {
    let k = &challenger.kinematics;
    let e = &challenger.envelope;
    let braking = (-k.accel_lon).max(0.0);
    braking <= e.lon_max_decel && k.accel_lat.abs() <= e.lat_max_accel
}

pub fn evaluate(ego: &RigidBody, challenger: &RigidBody) -> EnvelopeVerdict {
    let orientation = orientation::classify(ego, challenger);
    let measured = gap::measure(ego, challenger);
    let minimum = min_gap::compute(orientation, ego, challenger);

    let lon_violation = measured.d_lon < minimum.d_lon_min;
    let lat_violation =
        orientation != Orientation::Intersecting && measured.d_lat < minimum.d_lat_min;

    let infringement = match orientation {
        Orientation::Intersecting => lon_violation,
        Orientation::Same | Orientation::Opposite => lon_violation && lat_violation,
    };
    let violation = infringement && challenger_within_assumptions(challenger);

    debug!(
        "Envelope: orientation={}, d_lon={:.3}/{:.3}, d_lat={:.3}/{:.3}, infringement={}, violation={}",
        orientation.as_str(),
        measured.d_lon,
        minimum.d_lon_min,
        measured.d_lat,
        minimum.d_lat_min,
        infringement,
        violation
    );

    EnvelopeVerdict {
        orientation,
        measured,
        minimum,
        infringement,
        lon_violation,
        lat_violation,
        violation,
    }
}
