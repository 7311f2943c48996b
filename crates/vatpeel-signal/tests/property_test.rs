//! Property-based invariants over randomized synthetic records.

use proptest::prelude::*;
use vatpeel_core::{LayerBoundaries, LayerMetadata, PipelineConfig, SampleRecord};
use vatpeel_signal::{smooth, MetricsCalculator, Segmenter};

const RATE_HZ: f64 = 50.0;

/// Linear ramp plus bounded noise, the signal family the filter chain is
/// calibrated for.
fn noisy_ramp(slope: f64, noise: Vec<f64>) -> Vec<f64> {
    noise
        .iter()
        .enumerate()
        .map(|(i, e)| slope * i as f64 + e)
        .collect()
}

/// Builds one synthetic layer: 6 mm lift with a triangular force peak.
fn synthetic_layer(amp: f64, rise: usize, fall: usize, noise: &[f64]) -> SampleRecord {
    let n = noise.len();
    let lift_end = n - 40;
    let start = 60;
    let peak = start + rise;
    let end = peak + fall;
    let times: Vec<f64> = (0..n).map(|i| i as f64 / RATE_HZ).collect();
    let positions: Vec<f64> = (0..n)
        .map(|i| {
            if i < lift_end {
                10.0 - 6.0 * i as f64 / lift_end as f64
            } else {
                4.0
            }
        })
        .collect();
    let forces: Vec<f64> = (0..n)
        .map(|i| {
            let tri = if i <= start || i >= end {
                0.0
            } else if i <= peak {
                amp * (i - start) as f64 / rise as f64
            } else {
                amp * (end - i) as f64 / fall as f64
            };
            tri + noise[i]
        })
        .collect();
    SampleRecord::new(times, positions, forces, RATE_HZ).unwrap()
}

/// Builds a position trace of `layers` clean lift/retract cycles.
fn multi_layer_positions(layers: usize, lift_len: usize, pause_len: usize) -> Vec<f64> {
    let mut x = vec![10.0; pause_len];
    for _ in 0..layers {
        let last = *x.last().unwrap();
        for k in 1..=lift_len {
            x.push(last - 6.0 * k as f64 / lift_len as f64);
        }
        x.extend(std::iter::repeat(4.0).take(pause_len));
        for k in 1..=lift_len {
            x.push(4.0 + 6.0 * k as f64 / lift_len as f64);
        }
        x.extend(std::iter::repeat(10.0).take(pause_len));
    }
    x
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Double smoothing must not explode: the second pass moves samples by
    /// no more than 1.5x the first.
    #[test]
    fn smoothing_is_non_explosive(
        slope in -0.01f64..0.01,
        noise in prop::collection::vec(-0.05f64..0.05, 40..160),
    ) {
        let config = PipelineConfig::default();
        let signal = noisy_ramp(slope, noise);
        let once = smooth(&signal, &config);
        let twice = smooth(&once, &config);

        // edge samples are extrapolated, so the bound is over the interior
        let margin = config.savgol_window / 2;
        let interior = margin..signal.len() - margin;
        let delta_once = signal[interior.clone()]
            .iter()
            .zip(&once[interior.clone()])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        let delta_twice = signal[interior.clone()]
            .iter()
            .zip(&twice[interior])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        prop_assert!(
            delta_twice <= 1.5 * delta_once + 1e-9,
            "once {delta_once}, twice {delta_twice}"
        );
    }

    /// Detected events stay in temporal order and the composite metrics
    /// are exact sums of their parts.
    #[test]
    fn event_ordering_and_additivity(
        amp in 0.1f64..0.5,
        rise in 100usize..160,
        fall in 100usize..160,
        noise in prop::collection::vec(-0.003f64..0.003, 520..521),
    ) {
        let record = synthetic_layer(amp, rise, fall, &noise);
        let bounds = LayerBoundaries::whole(record.len()).unwrap();
        let m = MetricsCalculator::with_defaults()
            .analyze(&record, &bounds, 1, &LayerMetadata::default())
            .unwrap();

        if m.data_quality_ok {
            prop_assert!(m.pre_init_time_s <= m.peak_time_s);
            prop_assert!(m.peak_time_s <= m.prop_end_time_s);
            prop_assert!(m.peak_time_s > 0.0);
            prop_assert_eq!(
                m.total_peel_duration_s,
                m.pre_init_duration_s + m.propagation_duration_s
            );
            prop_assert_eq!(
                m.total_peel_distance_mm,
                m.distance_to_peak_mm + m.propagation_distance_mm
            );
            prop_assert!(m.work_of_adhesion_mj.is_finite());
        }
    }

    /// Every emitted boundary is ordered, disjoint from its neighbors, and
    /// covers a travel within tolerance of the nominal lift.
    #[test]
    fn segmentation_monotonicity(
        layers in 1usize..4,
        lift_len in 80usize..120,
        pause_len in 100usize..180,
    ) {
        let positions = multi_layer_positions(layers, lift_len, pause_len);
        let times: Vec<f64> = (0..positions.len()).map(|i| i as f64 / RATE_HZ).collect();
        let forces = vec![0.0; positions.len()];
        let record = SampleRecord::new(times, positions.clone(), forces, RATE_HZ).unwrap();

        let result = Segmenter::with_defaults().segment(&record);
        prop_assert_eq!(result.boundaries.len(), layers);
        prop_assert!(!result.unpaired_tail);

        let mut previous_end = 0usize;
        for bounds in &result.boundaries {
            let (l0, l1) = bounds.lifting();
            let (r0, r1) = bounds.retraction();
            prop_assert!(l0 < l1 && l1 <= r0 && r0 < r1);
            prop_assert!(l0 >= previous_end);
            previous_end = r1;

            let travel = (positions[l1 - 1] - positions[l0]).abs();
            prop_assert!((travel - 6.0).abs() <= 0.5, "lift travel {}", travel);
            let travel = (positions[r1 - 1] - positions[r0]).abs();
            prop_assert!((travel - 6.0).abs() <= 0.5, "retract travel {}", travel);
        }
    }
}
