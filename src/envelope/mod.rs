// src/envelope/mod.rs
//
// Safety envelope: orientation, measured gaps, required gaps and the
// per-frame verdict.

pub mod evaluator;
pub mod gap;
pub mod min_gap;
pub mod orientation;

pub use evaluator::{evaluate, EnvelopeVerdict};
