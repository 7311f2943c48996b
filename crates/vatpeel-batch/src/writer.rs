//! Metrics-table writer (and reader, for downstream tooling).
//!
//! One row per layer with a fixed 15-column layout. Non-finite values
//! serialize as empty cells, never as NaN literals; finite values use the
//! shortest representation that round-trips through `f64`.

use std::path::Path;

use vatpeel_core::LayerMetrics;

use crate::error::{BatchError, BatchResult};

/// Output columns, in order.
pub const METRICS_HEADER: [&str; 15] = [
    "Layer_Number",
    "Step_Speed_um_s",
    "Peak_Force_N",
    "Work_of_Adhesion_mJ",
    "Time_to_Peak_s",
    "Distance_to_Peak_mm",
    "Propagation_Time_s",
    "Propagation_Distance_mm",
    "Total_Peel_Time_s",
    "Total_Peel_Distance_mm",
    "Peak_Retraction_Force_N",
    "Effective_Stiffness_N_per_mm",
    "Stiffness_R2",
    "SNR",
    "Data_Quality_OK",
];

/// Writes a metrics table to `path`.
///
/// # Errors
///
/// Returns [`BatchError::Csv`] on file-level failures.
pub fn write_metrics_csv(path: &Path, metrics: &[LayerMetrics]) -> BatchResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| BatchError::csv(path, e))?;
    writer
        .write_record(METRICS_HEADER)
        .map_err(|e| BatchError::csv(path, e))?;

    for m in metrics {
        let row = [
            m.layer_number.to_string(),
            m.step_speed_um_per_s.map_or_else(String::new, cell),
            cell(m.peak_force_n),
            cell(m.work_of_adhesion_mj),
            cell(m.pre_init_duration_s),
            cell(m.distance_to_peak_mm),
            cell(m.propagation_duration_s),
            cell(m.propagation_distance_mm),
            cell(m.total_peel_duration_s),
            cell(m.total_peel_distance_mm),
            cell(m.peak_retraction_force_n),
            cell(m.effective_stiffness_n_per_mm),
            cell(m.stiffness_r2),
            cell(m.signal_to_noise_ratio),
            m.data_quality_ok.to_string(),
        ];
        writer
            .write_record(&row)
            .map_err(|e| BatchError::csv(path, e))?;
    }
    writer.flush().map_err(|e| {
        BatchError::csv(path, csv::Error::from(e))
    })?;
    Ok(())
}

/// Reads a metrics table written by [`write_metrics_csv`].
///
/// Empty cells deserialize to NaN (or `None` for the step speed); fields
/// not present in the table stay NaN.
///
/// # Errors
///
/// Returns [`BatchError::Csv`] on file-level failures and
/// [`BatchError::MissingColumn`] when the layer-number column is absent.
pub fn read_metrics_csv(path: &Path) -> BatchResult<Vec<LayerMetrics>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| BatchError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| BatchError::csv(path, e))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let layer_idx = column("Layer_Number")
        .ok_or_else(|| BatchError::missing_column("Layer_Number", path))?;

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| BatchError::csv(path, e))?;
        let number = |name: &str| -> f64 {
            column(name)
                .and_then(|idx| row.get(idx))
                .and_then(|c| c.parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        let layer_number = row
            .get(layer_idx)
            .and_then(|c| c.parse::<i64>().ok())
            .unwrap_or(0);
        let mut m = LayerMetrics::empty(layer_number);
        m.step_speed_um_per_s = column("Step_Speed_um_s")
            .and_then(|idx| row.get(idx))
            .and_then(|c| c.parse::<f64>().ok());
        m.peak_force_n = number("Peak_Force_N");
        m.work_of_adhesion_mj = number("Work_of_Adhesion_mJ");
        m.pre_init_duration_s = number("Time_to_Peak_s");
        m.distance_to_peak_mm = number("Distance_to_Peak_mm");
        m.propagation_duration_s = number("Propagation_Time_s");
        m.propagation_distance_mm = number("Propagation_Distance_mm");
        m.total_peel_duration_s = number("Total_Peel_Time_s");
        m.total_peel_distance_mm = number("Total_Peel_Distance_mm");
        m.peak_retraction_force_n = number("Peak_Retraction_Force_N");
        m.effective_stiffness_n_per_mm = number("Effective_Stiffness_N_per_mm");
        m.stiffness_r2 = number("Stiffness_R2");
        m.signal_to_noise_ratio = number("SNR");
        m.data_quality_ok = column("Data_Quality_OK")
            .and_then(|idx| row.get(idx))
            .map(|c| c == "true")
            .unwrap_or(false);
        out.push(m);
    }
    Ok(out)
}

/// Formats a metric cell: empty for non-finite values.
fn cell(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}
