//! Core data types for the vat-peel adhesion analysis stack.
//!
//! Each printed layer of a DLP resin print is separated from the vat floor
//! by a controlled upward stage motion while a load cell records force.
//! This crate defines the value types flowing through that analysis:
//!
//! - [`Sample`] / [`SampleRecord`]: the `(time, position, force)` stream
//! - [`LayerBoundaries`]: lift/retract index intervals of one layer
//! - [`LayerMetrics`] / [`LayerMetadata`]: the per-layer output record
//! - [`PipelineConfig`]: the single tuning surface for the whole pipeline
//! - [`CoreError`]: structural-invariant failures (caller bugs)
//!
//! The algorithms live in `vatpeel-signal`; file I/O and batch driving in
//! `vatpeel-batch`; the real-time collector in `vatpeel-live`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use types::{
    LayerBoundaries, LayerMetadata, LayerMetrics, MotionPhase, Sample, SampleRecord,
};
