//! Tabular I/O and batch processing for vat-peel adhesion records.
//!
//! The batch path is thin orchestration: read an acquisition CSV, run the
//! segmenter over it, invoke the metrics calculator per layer, and write
//! the metrics table. File-name conventions of the acquisition tooling
//! (`autolog_L{a}-L{b}.csv`, condition folders) seed layer numbers and
//! experiment metadata.

pub mod error;
pub mod metadata;
pub mod processor;
pub mod reader;
pub mod writer;

pub use error::{BatchError, BatchResult};
pub use metadata::{condition_from_folder, layer_range_from_filename};
pub use processor::BatchProcessor;
pub use reader::{read_sample_csv, ReadReport};
pub use writer::{read_metrics_csv, write_metrics_csv, METRICS_HEADER};
