//! Core data types for vat-peel adhesion analysis.
//!
//! Position convention: a DECREASING stage position means the stage is
//! lifting away from the vat floor; increasing means retracting. Force is
//! tensile-positive and may go slightly negative during retraction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One load-cell sample: time, stage position, tensile force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds from record start (monotone nondecreasing)
    pub time_s: f64,
    /// Stage position in mm (decreasing = lifting)
    pub position_mm: f64,
    /// Tensile force in N
    pub force_n: f64,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub fn new(time_s: f64, position_mm: f64, force_n: f64) -> Self {
        Self {
            time_s,
            position_mm,
            force_n,
        }
    }
}

/// Stage motion phase label, recorded alongside samples when available.
///
/// Informational only: layer segmentation never consumes these labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionPhase {
    /// Stage moving away from the vat floor (position decreasing)
    Lift,
    /// Stage moving toward the vat floor (position increasing)
    Retract,
    /// Stage stationary
    Pause,
    /// Small (< 1 mm) deliberate downward touch; excluded from adhesion measurement
    Sandwich,
    /// Not yet classifiable
    Unknown,
}

impl MotionPhase {
    /// Returns the label used in tabular files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lift => "Lift",
            Self::Retract => "Retract",
            Self::Pause => "Pause",
            Self::Sandwich => "Sandwich",
            Self::Unknown => "Unknown",
        }
    }
}

impl FromStr for MotionPhase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Lift" => Ok(Self::Lift),
            "Retract" => Ok(Self::Retract),
            "Pause" => Ok(Self::Pause),
            "Sandwich" => Ok(Self::Sandwich),
            "Unknown" => Ok(Self::Unknown),
            other => Err(CoreError::configuration(format!(
                "Unknown motion phase label: '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for MotionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered record of samples from one acquisition session.
///
/// Stored column-wise so the pipeline can borrow contiguous `f64` slices.
/// Construction validates the time-monotonicity invariant; a violation is a
/// caller bug and fails loudly.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    times_s: Vec<f64>,
    positions_mm: Vec<f64>,
    forces_n: Vec<f64>,
    phases: Option<Vec<MotionPhase>>,
    nominal_rate_hz: f64,
}

impl SampleRecord {
    /// Builds a record from parallel columns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LengthMismatch`] when the columns differ in
    /// length and [`CoreError::NonMonotonicTime`] when time decreases.
    pub fn new(
        times_s: Vec<f64>,
        positions_mm: Vec<f64>,
        forces_n: Vec<f64>,
        nominal_rate_hz: f64,
    ) -> CoreResult<Self> {
        if times_s.len() != positions_mm.len() || times_s.len() != forces_n.len() {
            return Err(CoreError::LengthMismatch {
                times: times_s.len(),
                positions: positions_mm.len(),
                forces: forces_n.len(),
            });
        }
        for i in 1..times_s.len() {
            if times_s[i] < times_s[i - 1] {
                return Err(CoreError::NonMonotonicTime {
                    index: i,
                    previous: times_s[i - 1],
                    current: times_s[i],
                });
            }
        }
        Ok(Self {
            times_s,
            positions_mm,
            forces_n,
            phases: None,
            nominal_rate_hz,
        })
    }

    /// Builds a record from a sequence of [`Sample`]s.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NonMonotonicTime`] when time decreases.
    pub fn from_samples(samples: &[Sample], nominal_rate_hz: f64) -> CoreResult<Self> {
        let times = samples.iter().map(|s| s.time_s).collect();
        let positions = samples.iter().map(|s| s.position_mm).collect();
        let forces = samples.iter().map(|s| s.force_n).collect();
        Self::new(times, positions, forces, nominal_rate_hz)
    }

    /// Attaches per-sample phase annotations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LengthMismatch`] when the annotation count does
    /// not match the sample count.
    pub fn set_phases(&mut self, phases: Vec<MotionPhase>) -> CoreResult<()> {
        if phases.len() != self.len() {
            return Err(CoreError::LengthMismatch {
                times: self.len(),
                positions: self.len(),
                forces: phases.len(),
            });
        }
        self.phases = Some(phases);
        Ok(())
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    /// Whether the record is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    /// Time column (seconds).
    #[must_use]
    pub fn times_s(&self) -> &[f64] {
        &self.times_s
    }

    /// Position column (mm).
    #[must_use]
    pub fn positions_mm(&self) -> &[f64] {
        &self.positions_mm
    }

    /// Force column (N).
    #[must_use]
    pub fn forces_n(&self) -> &[f64] {
        &self.forces_n
    }

    /// Phase annotations, when present.
    #[must_use]
    pub fn phases(&self) -> Option<&[MotionPhase]> {
        self.phases.as_deref()
    }

    /// Nominal sampling rate hint (Hz).
    #[must_use]
    pub fn nominal_rate_hz(&self) -> f64 {
        self.nominal_rate_hz
    }

    /// Counts inter-sample gaps larger than `factor` nominal periods.
    ///
    /// A nonzero count means the record mixes disjoint acquisition stretches
    /// and downstream timing metrics for affected layers are suspect.
    #[must_use]
    pub fn gap_count(&self, factor: f64) -> usize {
        if self.nominal_rate_hz <= 0.0 {
            return 0;
        }
        let limit = factor / self.nominal_rate_hz;
        self.times_s
            .windows(2)
            .filter(|w| w[1] - w[0] > limit)
            .count()
    }
}

/// Half-open sample-index intervals of one layer over a parent record.
///
/// Invariant: `l0 < l1 <= r0 < r1` where lifting is `[l0, l1)` and
/// retraction is `[r0, r1)`. The intervals carry no references to the
/// parent record beyond indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBoundaries {
    lifting: (usize, usize),
    retraction: (usize, usize),
}

impl LayerBoundaries {
    /// Builds boundaries, validating the ordering invariant.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBoundaries`] when
    /// `l0 < l1 <= r0 < r1` does not hold.
    pub fn new(lifting: (usize, usize), retraction: (usize, usize)) -> CoreResult<Self> {
        let (l0, l1) = lifting;
        let (r0, r1) = retraction;
        if !(l0 < l1 && l1 <= r0 && r0 < r1) {
            return Err(CoreError::invalid_boundaries(format!(
                "expected l0 < l1 <= r0 < r1, got lifting [{l0}, {l1}), retraction [{r0}, {r1})"
            )));
        }
        Ok(Self {
            lifting,
            retraction,
        })
    }

    /// Trivial boundaries covering a whole buffer of `len` samples.
    ///
    /// Used by the live collector, where the buffer holds exactly one
    /// layer's worth of motion. The last sample stands in for the
    /// retraction interval.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyInterval`] when `len < 2`.
    pub fn whole(len: usize) -> CoreResult<Self> {
        if len < 2 {
            return Err(CoreError::EmptyInterval { start: 0, end: len });
        }
        Self::new((0, len - 1), (len - 1, len))
    }

    /// Lifting interval `[l0, l1)`.
    #[must_use]
    pub fn lifting(&self) -> (usize, usize) {
        self.lifting
    }

    /// Retraction interval `[r0, r1)`.
    #[must_use]
    pub fn retraction(&self) -> (usize, usize) {
        self.retraction
    }

    /// Full interval `[l0, r1)`.
    #[must_use]
    pub fn full(&self) -> (usize, usize) {
        (self.lifting.0, self.retraction.1)
    }

    /// Number of samples in the lifting interval.
    #[must_use]
    pub fn lifting_len(&self) -> usize {
        self.lifting.1 - self.lifting.0
    }

    /// Checks that the full interval fits within a record of `len` samples.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] when it does not.
    pub fn check_within(&self, len: usize) -> CoreResult<()> {
        if self.retraction.1 > len {
            return Err(CoreError::IndexOutOfRange {
                index: self.retraction.1,
                len,
            });
        }
        Ok(())
    }
}

/// Opaque experiment metadata passed through to the metrics record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Commanded lift speed (µm/s), when known
    pub step_speed_um_per_s: Option<f64>,
    /// Fluid condition label (e.g. "Water", "2p5PEO")
    pub fluid_tag: Option<String>,
    /// Gap condition label (e.g. "1mm")
    pub gap_tag: Option<String>,
}

/// Per-layer adhesion metrics, the final output record.
///
/// Fields that could not be computed hold NaN; `data_quality_ok` is false
/// whenever peak, pre-initiation, or propagation end were not all
/// identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerMetrics {
    /// Layer identifier, passed in opaquely
    pub layer_number: i64,

    /// Maximum of the smoothed lifting-phase force (N)
    pub peak_force_n: f64,
    /// Stage position at the peak (mm)
    pub peak_position_mm: f64,
    /// Time of the peak, relative to lifting start (s)
    pub peak_time_s: f64,

    /// Force level at propagation end, the peeled-state noise floor (N)
    pub baseline_force_n: f64,
    /// Minimum signed force over the full interval (N)
    pub peak_retraction_force_n: f64,

    /// Start of the adhesion event (s, relative to lifting start)
    pub pre_init_time_s: f64,
    /// Stage position at pre-initiation (mm)
    pub pre_init_position_mm: f64,
    /// End of crack propagation (s, relative to lifting start)
    pub prop_end_time_s: f64,
    /// Stage position at propagation end (mm)
    pub prop_end_position_mm: f64,

    /// Pre-initiation to peak (s)
    pub pre_init_duration_s: f64,
    /// Peak to propagation end (s)
    pub propagation_duration_s: f64,
    /// Sum of the two phase durations (s)
    pub total_peel_duration_s: f64,

    /// |peak position - pre-init position| (mm)
    pub distance_to_peak_mm: f64,
    /// |prop-end position - peak position| (mm)
    pub propagation_distance_mm: f64,
    /// Sum of the two phase distances (mm)
    pub total_peel_distance_mm: f64,

    /// Baseline-corrected force integrated over |dx|, pre-init to prop-end (mJ)
    pub work_of_adhesion_mj: f64,

    /// Initial-segment slope of smoothed force vs position (N/mm)
    pub effective_stiffness_n_per_mm: f64,
    /// Coefficient of determination of the stiffness fit
    pub stiffness_r2: f64,

    /// (peak - baseline) / sigma(force before pre-initiation)
    pub signal_to_noise_ratio: f64,

    /// Maximum dF/dt between pre-initiation and peak (N/s)
    pub max_loading_rate_n_per_s: f64,
    /// |minimum dF/dt| between peak and propagation end (N/s)
    pub max_unloading_rate_n_per_s: f64,
    /// Sigma of raw-minus-smoothed force over the lifting interval (N)
    pub force_noise_std_n: f64,

    /// Area of the negative baseline-corrected force over the
    /// propagation region (mJ)
    pub energy_dissipation_mj: f64,
    /// Area of the absolute baseline-corrected force over the
    /// propagation region (mJ)
    pub total_energy_mj: f64,
    /// Net propagation-region work per mm of travel (mJ/mm)
    pub energy_density_mj_per_mm: f64,

    /// Commanded lift speed (µm/s), when known
    pub step_speed_um_per_s: Option<f64>,
    /// Fluid condition label
    pub fluid_tag: Option<String>,
    /// Gap condition label
    pub gap_tag: Option<String>,

    /// True when peak, pre-init, and prop-end were all identified
    pub data_quality_ok: bool,
}

impl LayerMetrics {
    /// A record with every numeric field NaN and quality flagged false.
    #[must_use]
    pub fn empty(layer_number: i64) -> Self {
        Self {
            layer_number,
            peak_force_n: f64::NAN,
            peak_position_mm: f64::NAN,
            peak_time_s: f64::NAN,
            baseline_force_n: f64::NAN,
            peak_retraction_force_n: f64::NAN,
            pre_init_time_s: f64::NAN,
            pre_init_position_mm: f64::NAN,
            prop_end_time_s: f64::NAN,
            prop_end_position_mm: f64::NAN,
            pre_init_duration_s: f64::NAN,
            propagation_duration_s: f64::NAN,
            total_peel_duration_s: f64::NAN,
            distance_to_peak_mm: f64::NAN,
            propagation_distance_mm: f64::NAN,
            total_peel_distance_mm: f64::NAN,
            work_of_adhesion_mj: f64::NAN,
            effective_stiffness_n_per_mm: f64::NAN,
            stiffness_r2: f64::NAN,
            signal_to_noise_ratio: f64::NAN,
            max_loading_rate_n_per_s: f64::NAN,
            max_unloading_rate_n_per_s: f64::NAN,
            force_noise_std_n: f64::NAN,
            energy_dissipation_mj: f64::NAN,
            total_energy_mj: f64::NAN,
            energy_density_mj_per_mm: f64::NAN,
            step_speed_um_per_s: None,
            fluid_tag: None,
            gap_tag: None,
            data_quality_ok: false,
        }
    }

    /// Applies experiment metadata to this record.
    pub fn apply_metadata(&mut self, metadata: &LayerMetadata) {
        self.step_speed_um_per_s = metadata.step_speed_um_per_s;
        self.fluid_tag = metadata.fluid_tag.clone();
        self.gap_tag = metadata.gap_tag.clone();
    }
}
