// src/geometry/mod.rs

pub mod footprint;
pub mod primitives;

pub use footprint::{paths_conflict, Footprint};
