//! Signal-analysis core for vat-peel adhesion measurements.
//!
//! Four cooperating pieces turn a `(time, position, force)` record into
//! per-layer adhesion metrics:
//!
//! - **Smoothing** ([`smoothing`]): median filter then Savitzky-Golay,
//!   preserving peak shape while rejecting spikes.
//! - **Segmentation** ([`segmenter`]): finds lift/retract cycles of
//!   nominal travel and pairs them sequentially.
//! - **Metrics** ([`calculator`]): peak, pre-initiation, propagation end,
//!   work of adhesion, stiffness, SNR per layer.
//! - **Phase annotation** ([`annotator`]): optional Lift/Retract/Pause/
//!   Sandwich labels for live diagnostics.
//!
//! # Example
//!
//! ```rust
//! use vatpeel_core::{LayerBoundaries, LayerMetadata, SampleRecord};
//! use vatpeel_signal::MetricsCalculator;
//!
//! let times: Vec<f64> = (0..200).map(|i| i as f64 / 50.0).collect();
//! let positions: Vec<f64> = (0..200).map(|i| 10.0 - i as f64 * 0.03).collect();
//! let forces: Vec<f64> = (0..200)
//!     .map(|i| 0.2 * (1.0 - ((i as f64 - 100.0) / 60.0).powi(2)).max(0.0))
//!     .collect();
//! let record = SampleRecord::new(times, positions, forces, 50.0).unwrap();
//!
//! let calc = MetricsCalculator::with_defaults();
//! let bounds = LayerBoundaries::whole(record.len()).unwrap();
//! let metrics = calc
//!     .analyze(&record, &bounds, 1, &LayerMetadata::default())
//!     .unwrap();
//! assert!(metrics.peak_force_n > 0.0);
//! ```

pub mod annotator;
pub mod calculator;
pub mod segmenter;
pub mod smoothing;

mod stats;

pub use annotator::PhaseAnnotator;
pub use calculator::MetricsCalculator;
pub use segmenter::{MotionEvent, SegmentationResult, Segmenter};
pub use smoothing::{median_filter, savgol_filter, smooth};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::annotator::PhaseAnnotator;
    pub use crate::calculator::MetricsCalculator;
    pub use crate::segmenter::{SegmentationResult, Segmenter};
    pub use crate::smoothing::smooth;
    pub use vatpeel_core::{
        LayerBoundaries, LayerMetadata, LayerMetrics, MotionPhase, PipelineConfig, Sample,
        SampleRecord,
    };
}
