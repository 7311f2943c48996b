//! Sample-record reader for the acquisition CSV format.
//!
//! Required columns, matched case-insensitively and in any order:
//! time (`Elapsed Time (s)`, `Time`, `Time (s)`), position
//! (`Position (mm)`, `Position`), force (`Force (N)`, `Force`).
//! An optional `Phase` column carries motion-phase annotations. Rows with
//! missing or non-numeric required cells are rejected and counted.

use std::path::Path;

use tracing::warn;
use vatpeel_core::{MotionPhase, SampleRecord};

use crate::error::{BatchError, BatchResult};

const TIME_NAMES: [&str; 3] = ["elapsed time (s)", "time", "time (s)"];
const POSITION_NAMES: [&str; 2] = ["position (mm)", "position"];
const FORCE_NAMES: [&str; 2] = ["force (n)", "force"];

/// Gaps larger than this many nominal periods are reported as suspicious.
const GAP_FACTOR: f64 = 5.0;

/// A parsed sample record plus ingest diagnostics.
#[derive(Debug)]
pub struct ReadReport {
    /// The accepted samples
    pub record: SampleRecord,
    /// Rows dropped for missing or non-numeric required cells
    pub rejected_rows: usize,
    /// Inter-sample gaps exceeding five nominal periods
    pub gap_count: usize,
}

/// Reads an acquisition CSV into a [`SampleRecord`].
///
/// # Errors
///
/// Returns [`BatchError::MissingColumn`] when a required column is absent,
/// [`BatchError::Csv`] for file-level failures, and a structural
/// [`vatpeel_core::CoreError`] when the accepted rows violate time
/// monotonicity.
pub fn read_sample_csv(path: &Path, nominal_rate_hz: f64) -> BatchResult<ReadReport> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BatchError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| BatchError::csv(path, e))?
        .clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h.trim().to_ascii_lowercase().as_str()))
    };
    let time_idx = column(&TIME_NAMES).ok_or_else(|| BatchError::missing_column("time", path))?;
    let position_idx =
        column(&POSITION_NAMES).ok_or_else(|| BatchError::missing_column("position", path))?;
    let force_idx =
        column(&FORCE_NAMES).ok_or_else(|| BatchError::missing_column("force", path))?;
    let phase_idx = column(&["phase"]);

    let mut times = Vec::new();
    let mut positions = Vec::new();
    let mut forces = Vec::new();
    let mut phases = Vec::new();
    let mut rejected = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| BatchError::csv(path, e))?;
        let cell = |idx: usize| {
            row.get(idx)
                .and_then(|c| c.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        match (cell(time_idx), cell(position_idx), cell(force_idx)) {
            (Some(t), Some(x), Some(f)) => {
                times.push(t);
                positions.push(x);
                forces.push(f);
                if let Some(idx) = phase_idx {
                    let phase = row
                        .get(idx)
                        .and_then(|c| c.parse::<MotionPhase>().ok())
                        .unwrap_or(MotionPhase::Unknown);
                    phases.push(phase);
                }
            }
            _ => rejected += 1,
        }
    }

    if rejected > 0 {
        warn!(path = %path.display(), rejected, "rejected rows with bad required cells");
    }

    let mut record = SampleRecord::new(times, positions, forces, nominal_rate_hz)?;
    if phase_idx.is_some() {
        record.set_phases(phases)?;
    }

    let gap_count = record.gap_count(GAP_FACTOR);
    if gap_count > 0 {
        warn!(
            path = %path.display(),
            gap_count, "record contains gaps larger than {GAP_FACTOR} nominal periods"
        );
    }

    Ok(ReadReport {
        record,
        rejected_rows: rejected,
        gap_count,
    })
}
