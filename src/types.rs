// src/types.rs

use glam::DVec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ego: BodyConfig,
    pub challenger: BodyConfig,
    pub thresholds: ThresholdConfig,
    pub columns: ColumnConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ego: BodyConfig::new(BodyKind::Vehicle),
            challenger: BodyConfig::new(BodyKind::Vehicle),
            thresholds: ThresholdConfig::default(),
            columns: ColumnConfig::default(),
            io: IoConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Vehicle,
    Pedestrian,
}

impl BodyKind {
    pub const ALL: [BodyKind; 2] = [BodyKind::Vehicle, BodyKind::Pedestrian];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Vehicle => "vehicle",
            BodyKind::Pedestrian => "pedestrian",
        }
    }
}

/// Per-body configuration. Anything left unset falls back to the preset of `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    #[serde(default)]
    pub kind: BodyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<SafetyEnvelopeParams>,
}

impl BodyConfig {
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            length: None,
            width: None,
            envelope: None,
        }
    }
}

/// Kinematic worst-case assumptions for one body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyEnvelopeParams {
    /// ρ, seconds
    pub response_time: f64,
    pub lon_max_accel: f64,
    pub lon_min_decel: f64,
    pub lon_max_decel: f64,
    pub lat_max_accel: f64,
    pub lat_min_decel: f64,
    pub lat_max_decel: f64,
    #[serde(default)]
    pub lateral_fluctuation_margin: f64,
}

/// Linear severity ramp, `min` maps to 0 and `max` to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub min: f64,
    pub max: f64,
}

impl Ramp {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn ratio(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !(span > 0.0) || !value.is_finite() {
            return if value > self.min { 1.0 } else { 0.0 };
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Seconds an infringement may last before SERTV fires
    pub restoration_time: f64,
    pub restoration_ramp: Ramp,
    /// Seconds the ego body may take to start braking before ERTV fires
    pub response_time: f64,
    pub response_ramp: Ramp,
    pub aggressive_accel: Ramp,
    pub aggressive_decel: Ramp,
    /// `n`, share of the other body's max deceleration assumed in the MRD formula
    pub mrd_proportion: f64,
    /// Cap for TTC / MTTC / THW diagnostics, seconds
    pub surrogate_cap: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            restoration_time: 5.0,
            restoration_ramp: Ramp::new(5.0, 7.0),
            response_time: 1.0,
            response_ramp: Ramp::new(1.0, 4.0),
            aggressive_accel: Ramp::new(1.8, 3.7),
            aggressive_decel: Ramp::new(4.51, 7.84532),
            mrd_proportion: 0.5,
            surrogate_cap: 10.0,
        }
    }
}

/// CSV header names for one body's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyColumns {
    pub x: String,
    pub y: String,
    pub heading: String,
    pub speed: String,
    pub speed_lon: String,
    pub speed_lat: String,
    /// Optional in the input; derived from the lon/lat components when absent
    pub accel: String,
    pub accel_lon: String,
    pub accel_lat: String,
}

impl BodyColumns {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            x: format!("{prefix} x"),
            y: format!("{prefix} y"),
            heading: format!("{prefix} heading"),
            speed: format!("{prefix} sp"),
            speed_lon: format!("{prefix} lon sp"),
            speed_lat: format!("{prefix} lat sp"),
            accel: format!("{prefix} acc"),
            accel_lon: format!("{prefix} lon acc"),
            accel_lat: format!("{prefix} lat acc"),
        }
    }

    /// Columns that must be present in every scenario file.
    pub fn required(&self) -> [&str; 8] {
        [
            &self.x,
            &self.y,
            &self.heading,
            &self.speed,
            &self.speed_lon,
            &self.speed_lat,
            &self.accel_lon,
            &self.accel_lat,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub timestamp: String,
    pub ego: BodyColumns,
    pub challenger: BodyColumns,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            ego: BodyColumns::with_prefix("VUT"),
            challenger: BodyColumns::with_prefix("challenger"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub scenario_folders: bool,
    pub parallel: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "data/input".to_string(),
            output_dir: "data/output".to_string(),
            scenario_folders: true,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// BODIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub speed: f64,
    pub speed_lon: f64,
    pub speed_lat: f64,
    pub accel: f64,
    pub accel_lon: f64,
    pub accel_lat: f64,
}

/// One body's columns from one input row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodySample {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub kinematics: Kinematics,
}

/// One body at one timestep. Rebuilt from the input row every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub center: DVec2,
    /// Radians, 0 = +x, counter-clockwise
    pub heading: f64,
    pub length: f64,
    pub width: f64,
    pub kinematics: Kinematics,
    pub envelope: SafetyEnvelopeParams,
}

impl RigidBody {
    pub fn forward(&self) -> DVec2 {
        DVec2::from_angle(self.heading)
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Same,
    Opposite,
    Intersecting,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Same => "same",
            Orientation::Opposite => "opposite",
            Orientation::Intersecting => "intersecting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapMeasurement {
    pub d_lon: f64,
    /// Not meaningful for `Orientation::Intersecting`
    pub d_lat: f64,
}

/// Required gaps. `f64::NEG_INFINITY` marks an axis whose formula was
/// degenerate: nothing can fall below it, so it never infringes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimumGap {
    pub d_lon_min: f64,
    pub d_lat_min: f64,
}

impl MinimumGap {
    pub const UNCONSTRAINED: f64 = f64::NEG_INFINITY;
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    /// Safety Envelope Infringement
    Sei,
    /// Safety Envelope Violation
    Sev,
    /// Safety Envelope Restoration Time Violation
    Sertv,
    /// Collision Incident
    Ci,
    /// Lane Departure Violation
    Ldv,
    /// Traffic Law Violation
    Tlv,
    /// Aggressive Acceleration Violation
    Aav,
    /// Compliance Error Rate to Human Traffic Controller Directions
    Cerhtcd,
    /// Event / OEDR Response Time Violation
    Ertv,
}

impl MetricKind {
    pub const COUNT: usize = 9;

    pub const ALL: [MetricKind; MetricKind::COUNT] = [
        MetricKind::Sei,
        MetricKind::Sev,
        MetricKind::Sertv,
        MetricKind::Ci,
        MetricKind::Ldv,
        MetricKind::Tlv,
        MetricKind::Aav,
        MetricKind::Cerhtcd,
        MetricKind::Ertv,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            MetricKind::Sei => "SEI",
            MetricKind::Sev => "SEV",
            MetricKind::Sertv => "SERTV",
            MetricKind::Ci => "CI",
            MetricKind::Ldv => "LDV",
            MetricKind::Tlv => "TLV",
            MetricKind::Aav => "AAV",
            MetricKind::Cerhtcd => "CERHTCD",
            MetricKind::Ertv => "ERTV",
        }
    }

    pub fn magnitude_column(&self) -> String {
        format!("{}M", self.code())
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Kinds with no scoring model yet; always clear.
    pub fn is_stub(&self) -> bool {
        matches!(
            self,
            MetricKind::Ldv | MetricKind::Tlv | MetricKind::Cerhtcd
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricRecord {
    pub kind: MetricKind,
    pub violation: bool,
    pub magnitude: f64,
}

impl MetricRecord {
    pub fn clear(kind: MetricKind) -> Self {
        Self {
            kind,
            violation: false,
            magnitude: 0.0,
        }
    }

    /// Magnitude is forced to 0 without a violation and clamped to [0, 1] otherwise.
    pub fn scored(kind: MetricKind, violation: bool, magnitude: f64) -> Self {
        let magnitude = if violation && magnitude.is_finite() {
            magnitude.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            kind,
            violation,
            magnitude,
        }
    }
}
