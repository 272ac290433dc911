// src/config.rs
//
// YAML config loading, body presets and validation.

use crate::types::{BodyConfig, BodyKind, Config, Ramp, SafetyEnvelopeParams};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: String, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: f64 },

    #[error("{field} is out of range (0, 1], got {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("{field} ramp must have max > min, got min {min} max {max}")]
    InvertedRamp { field: String, min: f64, max: f64 },

    #[error("{body} envelope: lon_min_decel ({min}) exceeds lon_max_decel ({max})")]
    DecelOrder { body: String, min: f64, max: f64 },

    #[error("column name for {0} is empty")]
    EmptyColumn(String),
}

// ============================================================================
// PRESETS
// ============================================================================

const VEHICLE_LENGTH: f64 = 5.1816;
const VEHICLE_WIDTH: f64 = 2.0066;
const PEDESTRIAN_LENGTH: f64 = 0.4;
const PEDESTRIAN_WIDTH: f64 = 0.7;

impl BodyKind {
    pub fn default_dimensions(&self) -> (f64, f64) {
        match self {
            BodyKind::Vehicle => (VEHICLE_LENGTH, VEHICLE_WIDTH),
            BodyKind::Pedestrian => (PEDESTRIAN_LENGTH, PEDESTRIAN_WIDTH),
        }
    }

    pub fn default_envelope(&self) -> SafetyEnvelopeParams {
        match self {
            BodyKind::Vehicle => SafetyEnvelopeParams {
                response_time: 0.75,
                lon_max_accel: 2.3,
                lon_min_decel: 1.78,
                lon_max_decel: 2.7,
                lat_max_accel: 2.79,
                lat_min_decel: 5.88,
                lat_max_decel: 8.83,
                lateral_fluctuation_margin: 0.0,
            },
            BodyKind::Pedestrian => SafetyEnvelopeParams {
                response_time: 0.75,
                lon_max_accel: 0.7153,
                lon_min_decel: 0.2682,
                lon_max_decel: 1.192,
                lat_max_accel: 0.2682,
                lat_min_decel: 0.134,
                lat_max_decel: 0.2682,
                lateral_fluctuation_margin: 0.0,
            },
        }
    }
}

/// Fully resolved body settings, presets applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProfile {
    pub kind: BodyKind,
    pub length: f64,
    pub width: f64,
    pub envelope: SafetyEnvelopeParams,
}

impl BodyConfig {
    pub fn resolve(&self) -> BodyProfile {
        let (length, width) = self.kind.default_dimensions();
        BodyProfile {
            kind: self.kind,
            length: self.length.unwrap_or(length),
            width: self.width.unwrap_or(width),
            envelope: self.envelope.unwrap_or_else(|| self.kind.default_envelope()),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("loading config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, body) in [("ego", &self.ego), ("challenger", &self.challenger)] {
            validate_body(name, &body.resolve())?;
        }

        let t = &self.thresholds;
        non_negative("thresholds.restoration_time", t.restoration_time)?;
        non_negative("thresholds.response_time", t.response_time)?;
        positive("thresholds.surrogate_cap", t.surrogate_cap)?;
        positive("thresholds.mrd_proportion", t.mrd_proportion)?;
        if t.mrd_proportion > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "thresholds.mrd_proportion".to_string(),
                value: t.mrd_proportion,
            });
        }
        ramp("thresholds.restoration_ramp", &t.restoration_ramp)?;
        ramp("thresholds.response_ramp", &t.response_ramp)?;
        ramp("thresholds.aggressive_accel", &t.aggressive_accel)?;
        ramp("thresholds.aggressive_decel", &t.aggressive_decel)?;

        let columns = std::iter::once(("timestamp", self.columns.timestamp.as_str()))
            .chain(self.columns.ego.required().map(|c| ("ego", c)))
            .chain(self.columns.challenger.required().map(|c| ("challenger", c)));
        for (owner, column) in columns {
            if column.trim().is_empty() {
                return Err(ConfigError::EmptyColumn(owner.to_string()));
            }
        }

        Ok(())
    }
}

fn validate_body(name: &str, body: &BodyProfile) -> Result<(), ConfigError> {
    positive(&format!("{name}.length"), body.length)?;
    positive(&format!("{name}.width"), body.width)?;

    let e = &body.envelope;
    non_negative(&format!("{name}.envelope.response_time"), e.response_time)?;
    non_negative(&format!("{name}.envelope.lon_max_accel"), e.lon_max_accel)?;
    non_negative(&format!("{name}.envelope.lon_min_decel"), e.lon_min_decel)?;
    non_negative(&format!("{name}.envelope.lon_max_decel"), e.lon_max_decel)?;
    non_negative(&format!("{name}.envelope.lat_max_accel"), e.lat_max_accel)?;
    non_negative(&format!("{name}.envelope.lat_min_decel"), e.lat_min_decel)?;
    non_negative(&format!("{name}.envelope.lat_max_decel"), e.lat_max_decel)?;
    non_negative(
        &format!("{name}.envelope.lateral_fluctuation_margin"),
        e.lateral_fluctuation_margin,
    )?;

    if e.lon_min_decel > e.lon_max_decel {
        return Err(ConfigError::DecelOrder {
            body: name.to_string(),
            min: e.lon_min_decel,
            max: e.lon_max_decel,
        });
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field: field.to_string(),
            value,
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative {
            field: field.to_string(),
            value,
        })
    }
}

fn ramp(field: &str, ramp: &Ramp) -> Result<(), ConfigError> {
    if !(ramp.max > ramp.min) || !ramp.min.is_finite() || !ramp.max.is_finite() {
        return Err(ConfigError::InvertedRamp {
            field: field.to_string(),
            min: ramp.min,
            max: ramp.max,
        });
    }
    Ok(())
}
