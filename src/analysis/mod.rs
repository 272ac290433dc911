// src/analysis/mod.rs
//
// Per-frame scoring and per-scenario aggregation.

pub mod aggregator;
pub mod episode_timer;
pub mod magnitudes;
pub mod surrogates;

pub use aggregator::{aggregate, FrameMetrics, ScenarioResult};
pub use episode_timer::{EpisodeTimer, TimerStep};
