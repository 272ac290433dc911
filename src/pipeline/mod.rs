// src/pipeline/mod.rs

pub mod batch;
pub mod event_bus;
pub mod frame_context;
pub mod metrics;
pub mod scenario;

pub use batch::run_batch;
pub use scenario::score_scenario;
