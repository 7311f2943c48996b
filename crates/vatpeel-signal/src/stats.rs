//! Small shared numeric helpers.

use vatpeel_core::PipelineConfig;

/// Mean of a slice; 0.0 when empty.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator); 0.0 for fewer than 2 values.
pub(crate) fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Whether a position window counts as stationary.
///
/// Both the scatter and the total excursion must stay below the stability
/// threshold; the excursion term keeps slow constant-velocity travel from
/// masquerading as a stop.
pub(crate) fn is_stationary(window: &[f64], config: &PipelineConfig) -> bool {
    let thr = config.motion_end_stability_stddev_mm;
    if sample_stddev(window) >= thr {
        return false;
    }
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in window {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    hi - lo < thr
}

/// Scans forward from `from` for the first stationary position window.
///
/// Returns the window's starting index, or `None` when no stationary window
/// appears within `motion_end_max_search` samples (or the data ends first).
pub(crate) fn first_stationary_window(
    positions: &[f64],
    from: usize,
    config: &PipelineConfig,
) -> Option<usize> {
    let w = config.motion_end_stability_points;
    if positions.len() < w {
        return None;
    }
    let last_start = positions.len() - w;
    let stop = from.saturating_add(config.motion_end_max_search).min(last_start);
    (from..=stop).find(|&s| is_stationary(&positions[s..s + w], config))
}
