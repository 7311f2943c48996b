//! Optional per-sample motion-phase classification.
//!
//! Informational only: annotations are recorded alongside samples to aid
//! downstream diagnostics and are never consulted by the segmenter.

use vatpeel_core::{CoreResult, MotionPhase, PipelineConfig};

/// Classifies position deltas into motion phases, keeping a small amount
/// of state between calls.
#[derive(Debug, Clone)]
pub struct PhaseAnnotator {
    config: PipelineConfig,
    previous_position: Option<f64>,
    stationary_count: usize,
    motion_start_position: f64,
    direction: i8,
    last_phase: MotionPhase,
}

impl PhaseAnnotator {
    /// Creates an annotator with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the config is invalid.
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            previous_position: None,
            stationary_count: 0,
            motion_start_position: 0.0,
            direction: 0,
            last_phase: MotionPhase::Unknown,
        })
    }

    /// Creates an annotator with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default()).expect("default config is valid")
    }

    /// Classifies the next position sample.
    pub fn classify(&mut self, position_mm: f64) -> MotionPhase {
        let Some(previous) = self.previous_position.replace(position_mm) else {
            self.motion_start_position = position_mm;
            self.last_phase = MotionPhase::Unknown;
            return MotionPhase::Unknown;
        };

        let delta = position_mm - previous;
        if delta.abs() < self.config.stationary_position_threshold_mm {
            self.stationary_count += 1;
            if self.stationary_count >= self.config.stationary_count_threshold {
                self.last_phase = MotionPhase::Pause;
            }
            return self.last_phase;
        }
        self.stationary_count = 0;

        let direction = if delta < 0.0 { -1 } else { 1 };
        if direction != self.direction {
            self.motion_start_position = position_mm;
            self.direction = direction;
        }

        let phase = if direction < 0 {
            let total_travel = (position_mm - self.motion_start_position).abs();
            if total_travel < self.config.sandwich_max_distance_mm {
                MotionPhase::Sandwich
            } else {
                MotionPhase::Lift
            }
        } else {
            MotionPhase::Retract
        };
        self.last_phase = phase;
        phase
    }

    /// Annotates a whole position trace.
    pub fn annotate(&mut self, positions: &[f64]) -> Vec<MotionPhase> {
        positions.iter().map(|&p| self.classify(p)).collect()
    }

    /// Clears all retained state.
    pub fn reset(&mut self) {
        self.previous_position = None;
        self.stationary_count = 0;
        self.motion_start_position = 0.0;
        self.direction = 0;
        self.last_phase = MotionPhase::Unknown;
    }
}
