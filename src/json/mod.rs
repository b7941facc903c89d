// src/json/mod.rs
//! Streaming JSON helpers: prefix reconstruction and incremental deltas.

pub mod delta;
pub mod partial;

pub use delta::{delta, delta_from, DeltaResult, LastParam};
pub use partial::{reconstruct, PartialParseResult};
