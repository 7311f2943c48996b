//! Pipeline configuration.
//!
//! One plain record with SI-unit thresholds is the sole tuning interface.
//! All values are overridable through the builder; the defaults below are
//! the canonical choices fixed by the offline filter-parameter search and
//! the 6 mm peel protocol.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tunable constants for segmentation, smoothing, and event detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Nominal lift/retract travel per layer (mm)
    pub expected_lift_mm: f64,
    /// Acceptance half-width around the nominal travel (mm)
    pub lift_tolerance_mm: f64,

    /// Median filter kernel (odd)
    pub median_kernel: usize,
    /// Savitzky-Golay window (odd)
    pub savgol_window: usize,
    /// Savitzky-Golay polynomial order
    pub savgol_order: usize,

    /// Propagation ends when force decays to this fraction of the peak rise
    pub propagation_end_threshold_fraction: f64,
    /// Pre-initiation triggers at this fraction of the peak rise
    pub pre_init_relative_threshold: f64,

    /// Position stddev below which a window counts as stationary (mm)
    pub motion_end_stability_stddev_mm: f64,
    /// Window length for the stationarity check (samples)
    pub motion_end_stability_points: usize,
    /// Give up looking for a stationary window after this many samples
    pub motion_end_max_search: usize,

    /// Per-sample position delta treated as no motion (mm)
    pub stationary_position_threshold_mm: f64,
    /// Consecutive stationary samples before the phase becomes Pause
    pub stationary_count_threshold: usize,
    /// Downward travel below this is a sandwich touch, not a lift (mm)
    pub sandwich_max_distance_mm: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_lift_mm: 6.0,
            lift_tolerance_mm: 0.5,
            median_kernel: 5,
            savgol_window: 9,
            savgol_order: 2,
            propagation_end_threshold_fraction: 0.10,
            pre_init_relative_threshold: 0.02,
            motion_end_stability_stddev_mm: 0.02,
            motion_end_stability_points: 3,
            motion_end_max_search: 500,
            stationary_position_threshold_mm: 0.002,
            stationary_count_threshold: 3,
            sandwich_max_distance_mm: 1.0,
        }
    }
}

impl PipelineConfig {
    /// Creates a new builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] for even filter windows, a
    /// polynomial order that does not fit its window, or non-positive
    /// thresholds.
    pub fn validate(&self) -> CoreResult<()> {
        if self.median_kernel % 2 == 0 || self.median_kernel == 0 {
            return Err(CoreError::configuration(format!(
                "median_kernel must be odd and positive, got {}",
                self.median_kernel
            )));
        }
        if self.savgol_window % 2 == 0 || self.savgol_window == 0 {
            return Err(CoreError::configuration(format!(
                "savgol_window must be odd and positive, got {}",
                self.savgol_window
            )));
        }
        if self.savgol_order + 1 >= self.savgol_window {
            return Err(CoreError::configuration(format!(
                "savgol_order {} does not fit window {}",
                self.savgol_order, self.savgol_window
            )));
        }
        if self.expected_lift_mm <= 0.0 || self.lift_tolerance_mm <= 0.0 {
            return Err(CoreError::configuration(
                "expected_lift_mm and lift_tolerance_mm must be positive",
            ));
        }
        if self.lift_tolerance_mm >= self.expected_lift_mm {
            return Err(CoreError::configuration(
                "lift_tolerance_mm must be smaller than expected_lift_mm",
            ));
        }
        if !(0.0..1.0).contains(&self.propagation_end_threshold_fraction)
            || !(0.0..1.0).contains(&self.pre_init_relative_threshold)
        {
            return Err(CoreError::configuration(
                "threshold fractions must lie in [0, 1)",
            ));
        }
        if self.motion_end_stability_points < 2 {
            return Err(CoreError::configuration(
                "motion_end_stability_points must be at least 2",
            ));
        }
        if self.motion_end_stability_stddev_mm <= 0.0
            || self.stationary_position_threshold_mm <= 0.0
            || self.sandwich_max_distance_mm <= 0.0
        {
            return Err(CoreError::configuration(
                "stability and stationarity thresholds must be positive",
            ));
        }
        if self.stationary_count_threshold == 0 {
            return Err(CoreError::configuration(
                "stationary_count_threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Sets the nominal per-layer travel (mm).
    #[must_use]
    pub fn expected_lift_mm(mut self, mm: f64) -> Self {
        self.config.expected_lift_mm = mm;
        self
    }

    /// Sets the travel acceptance half-width (mm).
    #[must_use]
    pub fn lift_tolerance_mm(mut self, mm: f64) -> Self {
        self.config.lift_tolerance_mm = mm;
        self
    }

    /// Sets the median filter kernel.
    #[must_use]
    pub fn median_kernel(mut self, kernel: usize) -> Self {
        self.config.median_kernel = kernel;
        self
    }

    /// Sets the Savitzky-Golay window and order.
    #[must_use]
    pub fn savgol(mut self, window: usize, order: usize) -> Self {
        self.config.savgol_window = window;
        self.config.savgol_order = order;
        self
    }

    /// Sets the propagation-end threshold fraction.
    #[must_use]
    pub fn propagation_end_threshold_fraction(mut self, fraction: f64) -> Self {
        self.config.propagation_end_threshold_fraction = fraction;
        self
    }

    /// Sets the pre-initiation threshold fraction.
    #[must_use]
    pub fn pre_init_relative_threshold(mut self, fraction: f64) -> Self {
        self.config.pre_init_relative_threshold = fraction;
        self
    }

    /// Sets the motion-end stationarity parameters.
    #[must_use]
    pub fn motion_end_stability(mut self, stddev_mm: f64, points: usize, max_search: usize) -> Self {
        self.config.motion_end_stability_stddev_mm = stddev_mm;
        self.config.motion_end_stability_points = points;
        self.config.motion_end_max_search = max_search;
        self
    }

    /// Sets the phase-annotator stationarity parameters.
    #[must_use]
    pub fn stationary(mut self, threshold_mm: f64, count: usize) -> Self {
        self.config.stationary_position_threshold_mm = threshold_mm;
        self.config.stationary_count_threshold = count;
        self
    }

    /// Sets the sandwich-touch travel ceiling (mm).
    #[must_use]
    pub fn sandwich_max_distance_mm(mut self, mm: f64) -> Self {
        self.config.sandwich_max_distance_mm = mm;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the assembled values fail
    /// [`PipelineConfig::validate`].
    pub fn build(self) -> CoreResult<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn even_kernels_rejected() {
        let config = PipelineConfig {
            median_kernel: 4,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            savgol_window: 8,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn order_must_fit_window() {
        assert!(PipelineConfig::builder().savgol(5, 4).build().is_err());
        assert!(PipelineConfig::builder().savgol(5, 3).build().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = PipelineConfig::builder()
            .expected_lift_mm(4.0)
            .lift_tolerance_mm(0.3)
            .median_kernel(7)
            .build()
            .unwrap();
        assert_eq!(config.expected_lift_mm, 4.0);
        assert_eq!(config.lift_tolerance_mm, 0.3);
        assert_eq!(config.median_kernel, 7);
        // untouched fields keep their defaults
        assert_eq!(config.savgol_window, 9);
    }

    #[test]
    fn tolerance_must_be_below_nominal() {
        assert!(PipelineConfig::builder()
            .expected_lift_mm(1.0)
            .lift_tolerance_mm(1.5)
            .build()
            .is_err());
    }
}
