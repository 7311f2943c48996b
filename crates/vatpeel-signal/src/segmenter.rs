//! Layer segmentation from continuous stage motion.
//!
//! Strategy: find every stage excursion whose travel matches the nominal
//! lift distance, then pair them sequentially (lift, retract, lift, ...).
//! Anything outside the distance tolerance, including deliberate sandwich
//! touches, never enters the motion list and so cannot perturb pairing.
//! Direction-based classification was tried and rejected: a small
//! pre-touch before the true lift makes sign-based pairing mis-assign the
//! touch.

use tracing::{debug, warn};
use vatpeel_core::{CoreResult, LayerBoundaries, PipelineConfig, SampleRecord};

use crate::stats;

/// Window for the position mean used by the candidate scan (samples).
const MEAN_WINDOW: usize = 20;
/// Initial samples skipped for settling.
const SCAN_START: usize = 10;
/// Minimum candidate motion length (samples).
const MIN_MOTION_SPAN: usize = 50;
/// Maximum candidate motion length (samples).
const MAX_MOTION_SPAN: usize = 1000;
/// Candidate end-index stride (samples).
const SCAN_STRIDE: usize = 10;
/// Dead samples skipped after a failed anchor.
const ANCHOR_ADVANCE: usize = 50;
/// Dead samples skipped after an accepted motion.
const POST_MOTION_SKIP: usize = 10;

/// One stage excursion of nominal magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    /// First sample of the excursion
    pub start_idx: usize,
    /// Sample where the stage has settled again
    pub end_idx: usize,
    /// Signed travel over the excursion (mm; negative = lift)
    pub distance_mm: f64,
}

/// Segmentation output: paired boundaries plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SegmentationResult {
    /// One entry per lift/retract pair, in record order
    pub boundaries: Vec<LayerBoundaries>,
    /// True when an odd trailing motion had no partner
    pub unpaired_tail: bool,
}

/// Finds lift/retract cycles of nominal travel in a sample record.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: PipelineConfig,
}

impl Segmenter {
    /// Creates a segmenter with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the config is invalid.
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a segmenter with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Segments a record into layer boundaries.
    ///
    /// Returns an empty result for records too short to hold one motion.
    #[must_use]
    pub fn segment(&self, record: &SampleRecord) -> SegmentationResult {
        let motions = self.find_motions(record.positions_mm());
        debug!(count = motions.len(), "nominal-distance motions found");

        let mut result = SegmentationResult::default();
        for pair in motions.chunks(2) {
            match pair {
                [lift, retract] => {
                    match LayerBoundaries::new(
                        (lift.start_idx, lift.end_idx + 1),
                        (retract.start_idx, retract.end_idx + 1),
                    ) {
                        Ok(bounds) => result.boundaries.push(bounds),
                        Err(err) => warn!(%err, "dropping malformed motion pair"),
                    }
                }
                _ => {
                    warn!(
                        start = pair[0].start_idx,
                        "unpaired tail motion; dropping it"
                    );
                    result.unpaired_tail = true;
                }
            }
        }
        result
    }

    /// Scans the position trace for excursions of nominal travel.
    fn find_motions(&self, x: &[f64]) -> Vec<MotionEvent> {
        let n = x.len();
        if n <= SCAN_START + MIN_MOTION_SPAN + MEAN_WINDOW {
            return Vec::new();
        }
        let s = forward_window_mean(x, MEAN_WINDOW);
        let j_limit = n - MEAN_WINDOW;

        let mut motions: Vec<MotionEvent> = Vec::new();
        let mut i = SCAN_START;
        while i + MIN_MOTION_SPAN <= j_limit {
            match self.scan_candidate(&s, i, j_limit) {
                Some(motion) => {
                    // keep pairs strictly ordered even if the start
                    // refinement overshoots into the previous motion
                    let floor = motions.last().map_or(0, |m: &MotionEvent| m.end_idx + 1);
                    let motion = MotionEvent {
                        start_idx: motion.start_idx.max(floor),
                        ..motion
                    };
                    i = motion.end_idx + POST_MOTION_SKIP;
                    motions.push(motion);
                }
                None => i += ANCHOR_ADVANCE,
            }
        }
        motions
    }

    /// Tries to accept one motion anchored at `i`.
    fn scan_candidate(&self, s: &[f64], i: usize, j_limit: usize) -> Option<MotionEvent> {
        let lo = self.config.expected_lift_mm - self.config.lift_tolerance_mm;
        let hi = self.config.expected_lift_mm + self.config.lift_tolerance_mm;
        let start_pos = s[i];

        let mut j = i + MIN_MOTION_SPAN;
        let j_max = (i + MAX_MOTION_SPAN).min(j_limit);
        while j <= j_max {
            if (lo..=hi).contains(&(s[j] - start_pos).abs()) {
                let end_idx = self.refine_end(s, j);
                let distance = s[end_idx] - start_pos;
                if (lo..=hi).contains(&distance.abs()) {
                    let start_idx = self.refine_start(s, i, end_idx);
                    return Some(MotionEvent {
                        start_idx,
                        end_idx,
                        distance_mm: distance,
                    });
                }
            }
            j += SCAN_STRIDE;
        }
        None
    }

    /// Refines a tentative motion end to the first stationary window at or
    /// after it. Falls back to the tentative index when the stage never
    /// settles within the search range.
    fn refine_end(&self, s: &[f64], j: usize) -> usize {
        stats::first_stationary_window(s, j, &self.config).unwrap_or(j)
    }

    /// Walks back from the settled end to the last sample still on the
    /// start plateau, anchoring the boundary to the data rather than to
    /// the scan phase.
    fn refine_start(&self, s: &[f64], anchor: usize, end_idx: usize) -> usize {
        let level = s[anchor];
        let band = self.config.motion_end_stability_stddev_mm;
        let mut k = end_idx;
        while k > anchor && (s[k] - level).abs() > band {
            k -= 1;
        }
        k
    }
}

/// Forward-window position mean with symmetric reflection past the end.
fn forward_window_mean(x: &[f64], window: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut acc = 0.0;
        for k in i..i + window {
            let idx = if k < n { k } else { 2 * n - 1 - k };
            acc += x[idx.min(n - 1)];
        }
        out.push(acc / window as f64);
    }
    out
}
