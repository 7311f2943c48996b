//! Per-layer adhesion metrics from a segmented force record.
//!
//! Event detection runs on the smoothed force over the lifting interval
//! only; the full interval contributes nothing but the retraction minimum.
//! Soft failures (short segments, undetectable events) degrade the affected
//! metrics to NaN and clear `data_quality_ok`; structural violations in the
//! inputs are caller bugs and return an error.

use tracing::debug;
use vatpeel_core::{
    CoreError, CoreResult, LayerBoundaries, LayerMetadata, LayerMetrics, PipelineConfig,
    SampleRecord,
};

use crate::smoothing;
use crate::stats;

/// Calculator for per-layer adhesion metrics.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    config: PipelineConfig,
}

impl MetricsCalculator {
    /// Creates a calculator with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the configuration is
    /// invalid.
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a calculator with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Computes all per-layer metrics for one segmented layer.
    ///
    /// # Errors
    ///
    /// Returns a structural [`CoreError`] when the boundaries do not fit
    /// the record. Undetectable events never error; they produce NaN
    /// fields and `data_quality_ok = false`.
    pub fn analyze(
        &self,
        record: &SampleRecord,
        bounds: &LayerBoundaries,
        layer_number: i64,
        metadata: &LayerMetadata,
    ) -> CoreResult<LayerMetrics> {
        bounds.check_within(record.len())?;
        let (l0, l1) = bounds.lifting();
        let n = l1 - l0;
        if n == 0 {
            return Err(CoreError::EmptyInterval { start: l0, end: l1 });
        }

        let t0 = record.times_s()[l0];
        let t: Vec<f64> = record.times_s()[l0..l1].iter().map(|v| v - t0).collect();
        let x = &record.positions_mm()[l0..l1];
        let f = &record.forces_n()[l0..l1];
        let fs = smoothing::smooth(f, &self.config);

        let mut m = LayerMetrics::empty(layer_number);
        m.apply_metadata(metadata);

        let (f0, f1) = bounds.full();
        m.peak_retraction_force_n = record.forces_n()[f0..f1]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);

        let residual: Vec<f64> = f.iter().zip(&fs).map(|(raw, s)| raw - s).collect();
        m.force_noise_std_n = stats::sample_stddev(&residual);

        let peak_idx = argmax(&fs);
        m.peak_force_n = fs[peak_idx];
        m.peak_position_mm = x[peak_idx];
        m.peak_time_s = t[peak_idx];

        if peak_idx == 0 || peak_idx == n - 1 {
            // The smoothed maximum sits on the interval edge: no real peel
            // event. Keep the diagnostic integral against the provisional
            // baseline; every event-anchored field stays NaN.
            debug!(layer_number, peak_idx, "peak not strictly interior; skipping event detection");
            let b0 = stats::mean(&fs[..n.min(20)]);
            m.work_of_adhesion_mj = integrate_work(&fs, x, 0, n - 1, b0);
            m.data_quality_ok = false;
            return Ok(m);
        }

        let motion_end = self.find_motion_end(x, peak_idx);

        let lead = (peak_idx / 4).clamp(1, 20);
        let b0 = stats::mean(&fs[..lead]);
        let peak_value = fs[peak_idx];

        let prop_threshold = b0 + self.config.propagation_end_threshold_fraction * (peak_value - b0);
        let prop_end = find_propagation_end(&fs, peak_idx, motion_end, prop_threshold);
        let (prop_end_idx, prop_found) = match prop_end {
            Some(idx) => (idx, true),
            None => (motion_end, false),
        };

        let init_threshold = b0 + self.config.pre_init_relative_threshold * (peak_value - b0);
        let pre_init = find_pre_initiation(&fs, peak_idx, init_threshold);
        let (pre_init_idx, pre_found) = match pre_init {
            Some(idx) => (idx, true),
            None => (peak_idx.saturating_sub(30), false),
        };

        let base_lo = prop_end_idx.saturating_sub(2);
        let base_hi = (prop_end_idx + 3).min(n);
        let baseline = stats::mean(&fs[base_lo..base_hi]);
        m.baseline_force_n = baseline;

        m.pre_init_time_s = t[pre_init_idx];
        m.pre_init_position_mm = x[pre_init_idx];
        m.prop_end_time_s = t[prop_end_idx];
        m.prop_end_position_mm = x[prop_end_idx];

        m.pre_init_duration_s = t[peak_idx] - t[pre_init_idx];
        m.propagation_duration_s = t[prop_end_idx] - t[peak_idx];
        m.total_peel_duration_s = m.pre_init_duration_s + m.propagation_duration_s;

        m.distance_to_peak_mm = (x[peak_idx] - x[pre_init_idx]).abs();
        m.propagation_distance_mm = (x[prop_end_idx] - x[peak_idx]).abs();
        m.total_peel_distance_mm = m.distance_to_peak_mm + m.propagation_distance_mm;

        m.work_of_adhesion_mj = integrate_work(&fs, x, pre_init_idx, prop_end_idx, baseline);

        let (dissipation, total_energy, density) =
            energy_metrics(f, x, peak_idx, prop_end_idx, baseline);
        m.energy_dissipation_mj = dissipation;
        m.total_energy_mj = total_energy;
        m.energy_density_mj_per_mm = density;

        let (stiffness, r2) = fit_stiffness(&fs, x, pre_init_idx, peak_idx);
        m.effective_stiffness_n_per_mm = stiffness;
        m.stiffness_r2 = r2;

        if pre_init_idx >= 5 {
            let sigma = stats::sample_stddev(&f[..pre_init_idx]);
            m.signal_to_noise_ratio = (peak_value - baseline) / sigma;
        }

        let gradient = force_gradient(&fs, &t);
        m.max_loading_rate_n_per_s = gradient[pre_init_idx..=peak_idx]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        m.max_unloading_rate_n_per_s = gradient[peak_idx..=prop_end_idx]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .abs();

        m.data_quality_ok = prop_found && pre_found;
        Ok(m)
    }

    /// Finds where stage motion ends within the lifting interval.
    ///
    /// Scans forward from just past the peak for the first stationary
    /// position window; falls back to the last lifting sample when none
    /// appears within the configured search range.
    fn find_motion_end(&self, x: &[f64], peak_idx: usize) -> usize {
        let from = (peak_idx + 10).min(x.len().saturating_sub(1));
        stats::first_stationary_window(x, from, &self.config).unwrap_or(x.len() - 1)
    }
}

/// Index of the maximum value; first occurrence wins on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Reverse-threshold propagation end.
///
/// Searches backward from the motion end toward the peak for the first
/// sample whose smoothed force and surrounding five-sample average have
/// both decayed to the threshold; that is the latest point at which the
/// force sits at the peeled-state level. `None` when the force never
/// reaches the threshold in the search range.
fn find_propagation_end(
    fs: &[f64],
    peak_idx: usize,
    motion_end_idx: usize,
    threshold: f64,
) -> Option<usize> {
    let motion_end_idx = motion_end_idx.min(fs.len() - 1);
    if motion_end_idx <= peak_idx {
        return None;
    }
    (peak_idx + 1..=motion_end_idx).rev().find(|&i| {
        let lo = i.saturating_sub(2);
        let hi = (i + 3).min(fs.len());
        fs[i] <= threshold && stats::mean(&fs[lo..hi]) <= threshold
    })
}

/// First sustained rise of the smoothed force above the pre-initiation
/// threshold: two consecutive samples must exceed it.
fn find_pre_initiation(fs: &[f64], peak_idx: usize, threshold: f64) -> Option<usize> {
    (0..peak_idx).find(|&i| fs[i] > threshold && fs[i + 1] > threshold)
}

/// Baseline-corrected force integrated over absolute position change.
/// 1 N·mm = 1 mJ, so the sum is already in millijoules. Negative
/// contributions are kept; a net-negative layer is diagnostic, not an
/// error.
fn integrate_work(fs: &[f64], x: &[f64], from: usize, to: usize, baseline: f64) -> f64 {
    if to <= from {
        return 0.0;
    }
    (from + 1..=to)
        .map(|i| (fs[i] - baseline) * (x[i] - x[i - 1]).abs())
        .sum()
}

/// Energy breakdown of the propagation region (peak to prop-end):
/// baseline-corrected raw force integrated trapezoidally over absolute
/// position change. Returns `(dissipation_mJ, total_mJ, density_mJ_per_mm)`
/// where dissipation covers the negative-force portions, total the
/// absolute force, and density is the net region work per mm of travel.
fn energy_metrics(
    f: &[f64],
    x: &[f64],
    peak_idx: usize,
    prop_end_idx: usize,
    baseline: f64,
) -> (f64, f64, f64) {
    if prop_end_idx <= peak_idx {
        return (0.0, 0.0, 0.0);
    }
    let mut dissipation = 0.0;
    let mut total = 0.0;
    let mut net = 0.0;
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for i in peak_idx..=prop_end_idx {
        lo = lo.min(x[i]);
        hi = hi.max(x[i]);
    }
    for i in peak_idx + 1..=prop_end_idx {
        let dx = (x[i] - x[i - 1]).abs();
        let a = f[i - 1] - baseline;
        let b = f[i] - baseline;
        net += 0.5 * (a + b) * dx;
        total += 0.5 * (a.abs() + b.abs()) * dx;
        dissipation += 0.5 * (a.min(0.0).abs() + b.min(0.0).abs()) * dx;
    }
    let span = hi - lo;
    let density = if span > 0.0 { net / span } else { 0.0 };
    (dissipation, total, density)
}

/// Ordinary least-squares fit of smoothed force against position over the
/// first `min(30, interval to peak)` samples of the pre-initiation rise.
///
/// Returns `(|slope|, r_squared)` in N/mm, or NaN pairs when the range is
/// shorter than 5 samples or the position does not move.
fn fit_stiffness(fs: &[f64], x: &[f64], pre_init_idx: usize, peak_idx: usize) -> (f64, f64) {
    let end = (pre_init_idx + 30).min(peak_idx);
    if end - pre_init_idx < 5 {
        return (f64::NAN, f64::NAN);
    }
    let xs = &x[pre_init_idx..=end];
    let ys = &fs[pre_init_idx..=end];
    let mx = stats::mean(xs);
    let my = stats::mean(ys);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (xv, yv) in xs.iter().zip(ys) {
        sxx += (xv - mx) * (xv - mx);
        sxy += (xv - mx) * (yv - my);
        syy += (yv - my) * (yv - my);
    }
    if sxx <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let slope = sxy / sxx;
    let r2 = if syy <= 0.0 {
        f64::NAN
    } else {
        (sxy * sxy) / (sxx * syy)
    };
    (slope.abs(), r2)
}

/// Central-difference dF/dt, one-sided at the ends. Zero where timestamps
/// coincide.
fn force_gradient(fs: &[f64], t: &[f64]) -> Vec<f64> {
    let n = fs.len();
    let mut grad = vec![0.0; n];
    if n < 2 {
        return grad;
    }
    let slope = |df: f64, dt: f64| if dt > 0.0 { df / dt } else { 0.0 };
    grad[0] = slope(fs[1] - fs[0], t[1] - t[0]);
    grad[n - 1] = slope(fs[n - 1] - fs[n - 2], t[n - 1] - t[n - 2]);
    for i in 1..n - 1 {
        grad[i] = slope(fs[i + 1] - fs[i - 1], t[i + 1] - t[i - 1]);
    }
    grad
}
