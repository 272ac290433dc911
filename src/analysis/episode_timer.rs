// src/analysis/episode_timer.rs
//
// Single-episode duration timer. Opens on a rising edge of the trigger
// while idle and closes on the first row its resolve condition holds.
// One instance per timer per scenario.

use crate::types::{MetricKind, Ramp, ThresholdConfig};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerState {
    Idle,
    Active { start: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub start: f64,
    pub end: f64,
    pub elapsed: f64,
    pub violation: bool,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerStep {
    /// Idle and nothing happened
    Quiet,
    Opened { start: f64 },
    Running,
    Resolved(EpisodeOutcome),
}

#[derive(Debug, Clone)]
pub struct EpisodeTimer {
    kind: MetricKind,
    state: TimerState,
    threshold: f64,
    ramp: Ramp,
    last_trigger: bool,
}

impl EpisodeTimer {
    pub fn new(kind: MetricKind, threshold: f64, ramp: Ramp) -> Self {
        Self {
            kind,
            state: TimerState::Idle,
            threshold,
            ramp,
            last_trigger: false,
        }
    }

    /// Infringement duration timer, resolves once the envelope is restored.
    pub fn restoration(thresholds: &ThresholdConfig) -> Self {
        Self::new(
            MetricKind::Sertv,
            thresholds.restoration_time,
            thresholds.restoration_ramp,
        )
    }

    /// Time from infringement onset until the ego body brakes.
    pub fn response(thresholds: &ThresholdConfig) -> Self {
        Self::new(
            MetricKind::Ertv,
            thresholds.response_time,
            thresholds.response_ramp,
        )
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Start of the open episode, if any.
    pub fn pending_since(&self) -> Option<f64> {
        match self.state {
            TimerState::Active { start } => Some(start),
            TimerState::Idle => None,
        }
    }

    pub fn step(&mut self, timestamp: f64, triggered: bool, resolved: bool) -> TimerStep {
        let rising = triggered && !self.last_trigger;
        self.last_trigger = triggered;

        let mut opened = None;
        if self.state == TimerState::Idle {
            if !rising {
                return TimerStep::Quiet;
            }
            debug!("{} timer opened at {:.3}s", self.kind.code(), timestamp);
            self.state = TimerState::Active { start: timestamp };
            opened = Some(timestamp);
        }

        let TimerState::Active { start } = self.state else {
            return TimerStep::Quiet;
        };

        if resolved {
            self.state = TimerState::Idle;
            return TimerStep::Resolved(self.outcome(start, timestamp));
        }

        match opened {
            Some(start) => TimerStep::Opened { start },
            None => TimerStep::Running,
        }
    }

    fn outcome(&self, start: f64, end: f64) -> EpisodeOutcome {
        let elapsed = end - start;
        let violation = elapsed > self.threshold;
        let magnitude = if violation {
            self.ramp.ratio(elapsed)
        } else {
            0.0
        };
        debug!(
            "{} timer resolved: elapsed={:.3}s, violation={}",
            self.kind.code(),
            elapsed,
            violation
        );
        EpisodeOutcome {
            start,
            end,
            elapsed,
            violation,
            magnitude,
        }
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.last_trigger = false;
    }
}
