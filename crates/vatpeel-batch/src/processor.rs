//! Batch driver: segment a full record, analyze each layer, assemble the
//! metrics table.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};
use vatpeel_core::{
    CoreResult, LayerMetadata, LayerMetrics, PipelineConfig, SampleRecord,
};
use vatpeel_signal::{MetricsCalculator, Segmenter};

use crate::error::BatchResult;
use crate::metadata;
use crate::reader;

/// Drives the segmenter and calculator over whole records or files.
#[derive(Debug)]
pub struct BatchProcessor {
    segmenter: Segmenter,
    calculator: MetricsCalculator,
    step_speed_by_layer: HashMap<i64, f64>,
}

impl BatchProcessor {
    /// Creates a processor with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the config is invalid.
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        Ok(Self {
            segmenter: Segmenter::new(config.clone())?,
            calculator: MetricsCalculator::new(config)?,
            step_speed_by_layer: HashMap::new(),
        })
    }

    /// Creates a processor with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            segmenter: Segmenter::with_defaults(),
            calculator: MetricsCalculator::with_defaults(),
            step_speed_by_layer: HashMap::new(),
        }
    }

    /// Installs a per-layer commanded-speed map from a companion
    /// instruction record; matched layers get their step speed filled in.
    pub fn set_step_speeds(&mut self, speeds: HashMap<i64, f64>) {
        self.step_speed_by_layer = speeds;
    }

    /// Processes one record: segments it, analyzes every layer, and
    /// returns metrics in layer order.
    ///
    /// Layer numbers count up from `first_layer_number`. A structural
    /// error in any layer aborts the batch.
    ///
    /// # Errors
    ///
    /// Returns a structural [`vatpeel_core::CoreError`] from the
    /// calculator.
    pub fn process_record(
        &self,
        record: &SampleRecord,
        first_layer_number: i64,
        metadata: &LayerMetadata,
    ) -> CoreResult<Vec<LayerMetrics>> {
        let segmentation = self.segmenter.segment(record);
        if segmentation.boundaries.is_empty() {
            warn!("no layers found in record of {} samples", record.len());
            return Ok(Vec::new());
        }

        let mut table = Vec::with_capacity(segmentation.boundaries.len());
        for (k, bounds) in segmentation.boundaries.iter().enumerate() {
            let layer_number = first_layer_number + k as i64;
            let mut layer_metadata = metadata.clone();
            if let Some(&speed) = self.step_speed_by_layer.get(&layer_number) {
                layer_metadata.step_speed_um_per_s = Some(speed);
            }
            let metrics =
                self.calculator
                    .analyze(record, bounds, layer_number, &layer_metadata)?;
            table.push(metrics);
        }
        info!(layers = table.len(), "batch record processed");
        Ok(table)
    }

    /// Processes one acquisition CSV end to end.
    ///
    /// The first layer number is taken from an `autolog_L{a}-L{b}` file
    /// name when present (1 otherwise), and condition tags from the parent
    /// folder name.
    ///
    /// # Errors
    ///
    /// Returns read errors from the file boundary and structural errors
    /// from the calculator.
    pub fn process_file(
        &self,
        path: &Path,
        nominal_rate_hz: f64,
    ) -> BatchResult<Vec<LayerMetrics>> {
        let report = reader::read_sample_csv(path, nominal_rate_hz)?;
        let first_layer = metadata::layer_range_from_filename(path)
            .map_or(1, |(start, _)| start);
        let condition = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map_or_else(LayerMetadata::default, metadata::condition_from_folder);

        info!(
            path = %path.display(),
            samples = report.record.len(),
            rejected = report.rejected_rows,
            first_layer,
            "processing acquisition file"
        );
        Ok(self.process_record(&report.record, first_layer, &condition)?)
    }
}
