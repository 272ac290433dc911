// src/pipeline/scenario.rs
//
// Strict left-to-right fold over one scenario's rows. Timer state is
// carried between frames; everything else is rebuilt per frame.

use super::event_bus::{EventBus, ScenarioEvent};
use super::frame_context::{FrameContext, FrameDiagnostics};
use crate::analysis::magnitudes::{self, aggressive_acceleration, collision_magnitude, envelope_magnitude};
use crate::analysis::surrogates::{self, BumperSample, PET_CONFLICT_RADIUS};
use crate::analysis::{aggregate, EpisodeTimer, FrameMetrics, ScenarioResult, TimerStep};
use crate::config::BodyProfile;
use crate::envelope::{evaluate, orientation, EnvelopeVerdict};
use crate::scenario_io::ScenarioTable;
use crate::types::{Config, MetricKind, MetricRecord, ThresholdConfig};
use tracing::{debug, info, warn};

const MAX_PENDING_EVENTS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub diagnostics: FrameDiagnostics,
    pub metrics: FrameMetrics,
}

#[derive(Debug, Clone)]
pub struct ScenarioOutput {
    pub result: ScenarioResult,
    pub frames: Vec<FrameOutput>,
    pub events: Vec<ScenarioEvent>,
    /// Events evicted from the bus before the scenario finished
    pub dropped_events: usize,
}

pub struct ScenarioProcessor {
    scenario_id: String,
    thresholds: ThresholdConfig,
    ego: BodyProfile,
    challenger: BodyProfile,
    restoration: EpisodeTimer,
    response: EpisodeTimer,
    events: EventBus,
    frames: Vec<FrameOutput>,
    bumpers: Vec<BumperSample>,
    last_infringement: bool,
    last_overlap: bool,
    last_timestamp: Option<f64>,
}

impl ScenarioProcessor {
    pub fn new(scenario_id: &str, config: &Config) -> Self {
        Self::with_event_capacity(scenario_id, config, MAX_PENDING_EVENTS)
    }

    pub fn with_event_capacity(scenario_id: &str, config: &Config, capacity: usize) -> Self {
        Self {
            scenario_id: scenario_id.to_string(),
            thresholds: config.thresholds.clone(),
            ego: config.ego.resolve(),
            challenger: config.challenger.resolve(),
            restoration: EpisodeTimer::restoration(&config.thresholds),
            response: EpisodeTimer::response(&config.thresholds),
            events: EventBus::new(capacity),
            frames: Vec::new(),
            bumpers: Vec::new(),
            last_infringement: false,
            last_overlap: false,
            last_timestamp: None,
        }
    }

    pub fn profiles(&self) -> (&BodyProfile, &BodyProfile) {
        (&self.ego, &self.challenger)
    }

    fn timer_record(&mut self, timer: MetricKind, step: TimerStep) -> MetricRecord {
        match step {
            TimerStep::Resolved(outcome) => {
                self.events
                    .publish(ScenarioEvent::EpisodeResolved { timer, outcome });
                MetricRecord::scored(timer, outcome.violation, outcome.magnitude)
            }
            TimerStep::Quiet | TimerStep::Opened { .. } | TimerStep::Running => {
                MetricRecord::clear(timer)
            }
        }
    }

    pub fn process_frame(&mut self, ctx: &FrameContext) -> &FrameOutput {
        let verdict = if ctx.is_degenerate() {
            warn!(
                "[{}] row {}: degenerate geometry, frame treated as clear",
                self.scenario_id, ctx.row
            );
            EnvelopeVerdict::unconstrained(orientation::classify(&ctx.ego, &ctx.challenger))
        } else {
            evaluate(&ctx.ego, &ctx.challenger)
        };

        let envelope_severity = if verdict.infringement {
            envelope_magnitude(
                verdict.orientation,
                &ctx.ego,
                &ctx.challenger,
                self.thresholds.mrd_proportion,
            )
        } else {
            0.0
        };

        if verdict.infringement && !self.last_infringement {
            self.events.publish(ScenarioEvent::InfringementStarted {
                row: ctx.row,
                timestamp: ctx.timestamp,
                charged_to_ego: verdict.violation,
            });
        }
        self.last_infringement = verdict.infringement;

        let restoration_step =
            self.restoration
                .step(ctx.timestamp, verdict.infringement, !verdict.infringement);
        let response_step =
            self.response
                .step(ctx.timestamp, verdict.infringement, ctx.ego_braking());

        let overlap = !ctx.is_degenerate() && ctx.bodies_overlap();
        let collision = if overlap {
            let magnitude = collision_magnitude(&ctx.ego, &ctx.challenger);
            if !self.last_overlap {
                self.events.publish(ScenarioEvent::Collision {
                    row: ctx.row,
                    timestamp: ctx.timestamp,
                    magnitude,
                });
            }
            MetricRecord::scored(MetricKind::Ci, true, magnitude)
        } else {
            MetricRecord::clear(MetricKind::Ci)
        };
        self.last_overlap = overlap;

        let (aav_violation, aav_magnitude) = aggressive_acceleration(&ctx.ego, &self.thresholds);

        let records = MetricKind::ALL.map(|kind| match kind {
            MetricKind::Sei => {
                MetricRecord::scored(kind, verdict.infringement, envelope_severity)
            }
            MetricKind::Sev => MetricRecord::scored(kind, verdict.violation, envelope_severity),
            MetricKind::Sertv => self.timer_record(kind, restoration_step),
            MetricKind::Ci => collision,
            MetricKind::Aav => MetricRecord::scored(kind, aav_violation, aav_magnitude),
            MetricKind::Ertv => self.timer_record(kind, response_step),
            MetricKind::Ldv | MetricKind::Tlv | MetricKind::Cerhtcd => magnitudes::stub(kind),
        });

        debug!(
            "[{}] row {} t={:.3}: SEI={} SEV={} CI={}",
            self.scenario_id, ctx.row, ctx.timestamp, verdict.infringement, verdict.violation, overlap
        );

        if !ctx.is_degenerate() {
            self.bumpers.push(BumperSample {
                timestamp: ctx.timestamp,
                ego_front: ctx.ego_footprint().front_bumper().point,
                other_rear: ctx.challenger_footprint().rear_bumper().point,
            });
        }

        self.last_timestamp = Some(ctx.timestamp);
        self.frames.push(FrameOutput {
            diagnostics: ctx.diagnostics(&verdict, self.thresholds.surrogate_cap),
            metrics: FrameMetrics {
                timestamp: ctx.timestamp,
                records,
            },
        });
        let last = self.frames.len() - 1;
        &self.frames[last]
    }

    pub fn finish(mut self) -> ScenarioOutput {
        let last_timestamp = self.last_timestamp.unwrap_or(0.0);
        for timer in [&mut self.restoration, &mut self.response] {
            if let Some(start) = timer.pending_since() {
                self.events.publish(ScenarioEvent::EpisodeUnresolved {
                    timer: timer.kind(),
                    start,
                    last_timestamp,
                });
            }
            timer.reset();
        }

        let dropped_events = self.events.dropped_count();
        let events = self.events.drain();
        if dropped_events > 0 {
            warn!(
                "[{}] ⚠️  {} events dropped from a full event bus, log below is incomplete",
                self.scenario_id, dropped_events
            );
        }
        for event in &events {
            event.log(&self.scenario_id);
        }

        let timeline = self.frames.iter().map(|f| f.metrics.clone()).collect();
        let mut result = aggregate(&self.scenario_id, timeline);
        result.pet = surrogates::pet(&self.bumpers, PET_CONFLICT_RADIUS);
        info!(
            "[{}] DA score {:.1} over {} rows",
            self.scenario_id, result.da_score, result.rows
        );

        ScenarioOutput {
            result,
            frames: self.frames,
            events,
            dropped_events,
        }
    }
}

/// Runs the whole fold over an already parsed scenario.
pub fn score_scenario(scenario_id: &str, table: &ScenarioTable, config: &Config) -> ScenarioOutput {
    let mut processor = ScenarioProcessor::new(scenario_id, config);
    let (ego, challenger) = {
        let (e, c) = processor.profiles();
        (*e, *c)
    };
    for (row, sample) in table.rows.iter().enumerate() {
        let ctx = FrameContext::new(
            row + 1,
            sample.timestamp,
            (&sample.ego, &ego),
            (&sample.challenger, &challenger),
        );
        processor.process_frame(&ctx);
    }
    processor.finish()
}
