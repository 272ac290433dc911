// src/analysis/aggregator.rs
//
// Reduces a scenario's per-frame metric stream to per-kind peaks,
// episode counts and the DA score. Pure: the same timeline always
// yields the same result.

use crate::types::{MetricKind, MetricRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMetrics {
    pub timestamp: f64,
    pub records: [MetricRecord; MetricKind::COUNT],
}

impl FrameMetrics {
    pub fn get(&self, kind: MetricKind) -> &MetricRecord {
        &self.records[kind.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakMetric {
    pub kind: MetricKind,
    pub violation: bool,
    pub magnitude: f64,
    /// Timestamp of the peak frame, `None` for an empty timeline
    pub timestamp: Option<f64>,
}

impl PeakMetric {
    fn empty(kind: MetricKind) -> Self {
        Self {
            kind,
            violation: false,
            magnitude: 0.0,
            timestamp: None,
        }
    }

    /// Higher magnitude wins; on a tie a violating record beats a clear one.
    fn outranked_by(&self, record: &MetricRecord) -> bool {
        if self.timestamp.is_none() {
            return true;
        }
        if record.magnitude != self.magnitude {
            return record.magnitude > self.magnitude;
        }
        record.violation && !self.violation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeCounts {
    pub sei_episodes: u32,
    pub sev_episodes: u32,
    pub sertv_firings: u32,
    pub ertv_firings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub rows: usize,
    pub peaks: [PeakMetric; MetricKind::COUNT],
    pub counts: EpisodeCounts,
    pub collision: bool,
    pub da_score: f64,
    /// Post-encroachment time over the whole track; filled in by the row
    /// fold, which owns the positions. `None` when the paths never meet.
    pub pet: Option<f64>,
    #[serde(skip)]
    pub timeline: Vec<FrameMetrics>,
}

impl ScenarioResult {
    pub fn peak(&self, kind: MetricKind) -> &PeakMetric {
        &self.peaks[kind.index()]
    }
}

fn rising_edges(timeline: &[FrameMetrics], kind: MetricKind) -> u32 {
    let mut previous = false;
    let mut count = 0;
    for frame in timeline {
        let current = frame.get(kind).violation;
        if current && !previous {
            count += 1;
        }
        previous = current;
    }
    count
}

fn firings(timeline: &[FrameMetrics], kind: MetricKind) -> u32 {
    timeline.iter().filter(|f| f.get(kind).violation).count() as u32
}

/// `max(1 − Σ violation·magnitude, 0) × 100`, forced to 0 after a collision.
pub fn da_score(peaks: &[PeakMetric], collision: bool) -> f64 {
    if collision {
        return 0.0;
    }
    let deduction: f64 = peaks
        .iter()
        .filter(|p| p.violation)
        .map(|p| p.magnitude)
        .sum();
    (1.0 - deduction).max(0.0) * 100.0
}

pub fn aggregate(scenario_id: &str, timeline: Vec<FrameMetrics>) -> ScenarioResult {
    let mut peaks = MetricKind::ALL.map(PeakMetric::empty);

    for frame in &timeline {
        for (peak, record) in peaks.iter_mut().zip(frame.records.iter()) {
            if peak.outranked_by(record) {
                *peak = PeakMetric {
                    kind: record.kind,
                    violation: record.violation,
                    magnitude: record.magnitude,
                    timestamp: Some(frame.timestamp),
                };
            }
        }
    }

    let collision = timeline.iter().any(|f| f.get(MetricKind::Ci).violation);
    let counts = EpisodeCounts {
        sei_episodes: rising_edges(&timeline, MetricKind::Sei),
        sev_episodes: rising_edges(&timeline, MetricKind::Sev),
        sertv_firings: firings(&timeline, MetricKind::Sertv),
        ertv_firings: firings(&timeline, MetricKind::Ertv),
    };

    ScenarioResult {
        scenario_id: scenario_id.to_string(),
        rows: timeline.len(),
        da_score: da_score(&peaks, collision),
        peaks,
        counts,
        collision,
        pet: None,
        timeline,
    }
}
