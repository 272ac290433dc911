// src/pipeline/frame_context.rs
//
// Everything known about one timestep: both bodies rebuilt from the
// input row, plus the derived diagnostics written next to the metrics.

use crate::analysis::surrogates;
use crate::config::BodyProfile;
use crate::envelope::EnvelopeVerdict;
use crate::geometry::{paths_conflict, Footprint};
use crate::types::{BodySample, Orientation, RigidBody};
use glam::DVec2;

#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub row: usize,
    pub timestamp: f64,
    pub ego: RigidBody,
    pub challenger: RigidBody,
}

fn rigid_body(sample: &BodySample, profile: &BodyProfile) -> RigidBody {
    RigidBody {
        center: DVec2::new(sample.x, sample.y),
        heading: sample.heading,
        length: profile.length,
        width: profile.width,
        kinematics: sample.kinematics,
        envelope: profile.envelope,
    }
}

impl FrameContext {
    pub fn new(
        row: usize,
        timestamp: f64,
        ego: (&BodySample, &BodyProfile),
        challenger: (&BodySample, &BodyProfile),
    ) -> Self {
        Self {
            row,
            timestamp,
            ego: rigid_body(ego.0, ego.1),
            challenger: rigid_body(challenger.0, challenger.1),
        }
    }

    pub fn ego_footprint(&self) -> Footprint {
        Footprint::of(&self.ego)
    }

    pub fn challenger_footprint(&self) -> Footprint {
        Footprint::of(&self.challenger)
    }

    /// Any zero dimension or non-finite pose.
    pub fn is_degenerate(&self) -> bool {
        self.ego_footprint().is_degenerate() || self.challenger_footprint().is_degenerate()
    }

    pub fn bodies_overlap(&self) -> bool {
        self.ego_footprint()
            .bounding_polygon()
            .intersects(&self.challenger_footprint().bounding_polygon())
    }

    pub fn body_gap(&self) -> f64 {
        let gap = self
            .ego_footprint()
            .bounding_polygon()
            .distance_to_polygon(&self.challenger_footprint().bounding_polygon());
        if gap.is_finite() {
            gap
        } else {
            f64::INFINITY
        }
    }

    pub fn ego_braking(&self) -> bool {
        self.ego.kinematics.accel_lon < 0.0
    }

    pub fn diagnostics(&self, verdict: &EnvelopeVerdict, surrogate_cap: f64) -> FrameDiagnostics {
        let (ser_lon, ser_lat) = verdict.envelope_ratios();
        let body_gap = self.body_gap();
        let closing_speed = self.ego.kinematics.speed_lon - self.challenger.kinematics.speed_lon;
        let closing_accel = self.ego.kinematics.accel_lon - self.challenger.kinematics.accel_lon;

        FrameDiagnostics {
            orientation: verdict.orientation,
            d_lon: verdict.measured.d_lon,
            d_lat: verdict.measured.d_lat,
            d_lon_min: verdict.minimum.d_lon_min,
            d_lat_min: verdict.minimum.d_lat_min,
            ser_lon,
            ser_lat,
            body_gap,
            paths_conflict: paths_conflict(&self.ego_footprint(), &self.challenger_footprint()),
            ttc: surrogates::ttc(body_gap, closing_speed, surrogate_cap),
            mttc: surrogates::mttc(body_gap, closing_speed, closing_accel, surrogate_cap),
            thw: surrogates::thw(body_gap, self.ego.kinematics.speed_lon, surrogate_cap),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDiagnostics {
    pub orientation: Orientation,
    pub d_lon: f64,
    pub d_lat: f64,
    pub d_lon_min: f64,
    pub d_lat_min: f64,
    pub ser_lon: f64,
    pub ser_lat: f64,
    pub body_gap: f64,
    pub paths_conflict: bool,
    pub ttc: f64,
    pub mttc: f64,
    pub thw: f64,
}

impl FrameDiagnostics {
    pub const COLUMNS: [&'static str; 12] = [
        "orientation",
        "d_lon",
        "d_lat",
        "d_lon_min",
        "d_lat_min",
        "SER lon",
        "SER lat",
        "body gap",
        "paths conflict",
        "TTC",
        "MTTC",
        "THW",
    ];

    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.orientation.as_str().to_string(),
            self.d_lon.to_string(),
            self.d_lat.to_string(),
            self.d_lon_min.to_string(),
            self.d_lat_min.to_string(),
            self.ser_lon.to_string(),
            self.ser_lat.to_string(),
            self.body_gap.to_string(),
            u8::from(self.paths_conflict).to_string(),
            self.ttc.to_string(),
            self.mttc.to_string(),
            self.thw.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::evaluate;
    use crate::types::{BodyConfig, BodyKind, Kinematics};

    fn sample(x: f64, speed_lon: f64) -> BodySample {
        BodySample {
            x,
            y: 0.0,
            heading: 0.0,
            kinematics: Kinematics {
                speed: speed_lon,
                speed_lon,
                ..Kinematics::default()
            },
        }
    }

    fn context(ego_x: f64, ego_v: f64, ch_x: f64, ch_v: f64) -> FrameContext {
        let profile = BodyConfig::new(BodyKind::Vehicle).resolve();
        FrameContext::new(
            0,
            0.0,
            (&sample(ego_x, ego_v), &profile),
            (&sample(ch_x, ch_v), &profile),
        )
    }

    #[test]
    fn test_bodies_built_from_profile() {
        let ctx = context(0.0, 10.0, 20.0, 5.0);
        assert_eq!(ctx.ego.length, 5.1816);
        assert_eq!(ctx.challenger.center, DVec2::new(20.0, 0.0));
        assert!(!ctx.is_degenerate());
        assert!(!ctx.bodies_overlap());
    }

    #[test]
    fn test_diagnostics_for_closing_pair() {
        let ctx = context(0.0, 15.0, 20.0, 5.0);
        let verdict = evaluate(&ctx.ego, &ctx.challenger);
        let diag = ctx.diagnostics(&verdict, 10.0);
        let gap = 20.0 - 5.1816;
        assert!((diag.body_gap - gap).abs() < 1e-9);
        assert!((diag.ttc - gap / 10.0).abs() < 1e-9);
        assert!((diag.thw - gap / 15.0).abs() < 1e-9);
        assert!(diag.paths_conflict);
        assert_eq!(diag.orientation, Orientation::Same);
        assert_eq!(diag.to_fields().len(), FrameDiagnostics::COLUMNS.len());
    }

    #[test]
    fn test_overlap_detected() {
        let ctx = context(0.0, 10.0, 3.0, 5.0);
        assert!(ctx.bodies_overlap());
        assert_eq!(ctx.body_gap(), 0.0);
    }
}
