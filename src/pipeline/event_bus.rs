// src/pipeline/event_bus.rs
//
// In-scenario event log. The fold publishes what happened; the
// processor drains it for logging and counting at the end.

use crate::analysis::episode_timer::EpisodeOutcome;
use crate::types::MetricKind;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEvent {
    InfringementStarted {
        row: usize,
        timestamp: f64,
        charged_to_ego: bool,
    },

    EpisodeResolved {
        timer: MetricKind,
        outcome: EpisodeOutcome,
    },

    Collision {
        row: usize,
        timestamp: f64,
        magnitude: f64,
    },

    /// Episode still open when the rows ran out; contributes no metric
    EpisodeUnresolved {
        timer: MetricKind,
        start: f64,
        last_timestamp: f64,
    },
}

impl ScenarioEvent {
    pub fn log(&self, scenario_id: &str) {
        match self {
            ScenarioEvent::InfringementStarted {
                timestamp,
                charged_to_ego,
                ..
            } => info!(
                "[{}] Envelope infringed at {:.2}s (ego at fault: {})",
                scenario_id, timestamp, charged_to_ego
            ),
            ScenarioEvent::EpisodeResolved { timer, outcome } if outcome.violation => warn!(
                "[{}] ⚠️  {} after {:.2}s (magnitude {:.2})",
                scenario_id,
                timer.code(),
                outcome.elapsed,
                outcome.magnitude
            ),
            ScenarioEvent::EpisodeResolved { timer, outcome } => info!(
                "[{}] {} episode closed in {:.2}s",
                scenario_id,
                timer.code(),
                outcome.elapsed
            ),
            ScenarioEvent::Collision {
                timestamp,
                magnitude,
                ..
            } => warn!(
                "[{}] 💥 Collision at {:.2}s (magnitude {:.2})",
                scenario_id, timestamp, magnitude
            ),
            ScenarioEvent::EpisodeUnresolved {
                timer,
                start,
                last_timestamp,
            } => warn!(
                "[{}] {} episode opened at {:.2}s still open at {:.2}s, not scored",
                scenario_id,
                timer.code(),
                start,
                last_timestamp
            ),
        }
    }
}

pub struct EventBus {
    events: VecDeque<ScenarioEvent>,
    max_pending: usize,
    dropped: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending.min(1024)),
            max_pending,
            dropped: 0,
        }
    }

    pub fn publish(&mut self, event: ScenarioEvent) {
        if self.events.len() >= self.max_pending {
            if self.dropped == 0 {
                warn!(
                    "Event bus full ({} events), dropping oldest",
                    self.max_pending
                );
            }
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<ScenarioEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    /// Events evicted since the bus was created.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}
