//! End-to-end scenarios for the analysis pipeline on synthetic records.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vatpeel_core::{LayerBoundaries, LayerMetadata, PipelineConfig, SampleRecord};
use vatpeel_signal::{smooth, MetricsCalculator};

const RATE_HZ: f64 = 50.0;

/// The textbook layer: 6 mm lift over 480 samples, a triangular force
/// peak of 0.300 N rising from sample 100 to 250 and decaying to zero at
/// sample 400.
fn textbook_forces(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            if i < 100.0 {
                0.0
            } else if i < 250.0 {
                0.3 * (i - 100.0) / 150.0
            } else if i < 400.0 {
                0.3 * (400.0 - i) / 150.0
            } else {
                0.0
            }
        })
        .collect()
}

fn textbook_record(forces: Vec<f64>) -> SampleRecord {
    let n = forces.len();
    let times: Vec<f64> = (0..n).map(|i| i as f64 / RATE_HZ).collect();
    let positions: Vec<f64> = (0..n)
        .map(|i| {
            if i < 480 {
                10.0 - 6.0 * i as f64 / 480.0
            } else {
                4.0
            }
        })
        .collect();
    SampleRecord::new(times, positions, forces, RATE_HZ).unwrap()
}

fn analyze(record: &SampleRecord) -> vatpeel_core::LayerMetrics {
    let bounds = LayerBoundaries::whole(record.len()).unwrap();
    MetricsCalculator::with_defaults()
        .analyze(record, &bounds, 1, &LayerMetadata::default())
        .unwrap()
}

#[test]
fn textbook_triangular_peak() {
    let record = textbook_record(textbook_forces(500));
    let m = analyze(&record);

    assert!(m.data_quality_ok);
    assert_abs_diff_eq!(m.peak_force_n, 0.300, epsilon = 5e-3);
    assert_abs_diff_eq!(m.peak_time_s, 5.00, epsilon = 0.05);
    assert_abs_diff_eq!(m.baseline_force_n, 0.0, epsilon = 2e-3);
    assert_abs_diff_eq!(m.work_of_adhesion_mj, 0.5625, epsilon = 0.012);
    assert_abs_diff_eq!(m.distance_to_peak_mm, 1.85, epsilon = 0.1);
    assert!(m.total_peel_distance_mm > 3.5 && m.total_peel_distance_mm < 4.8);
    // the pre-peel region is noiseless, so the SNR denominator is zero
    assert!(m.signal_to_noise_ratio.is_infinite());
}

#[test]
fn noise_and_spikes_do_not_move_events() {
    let n = 500;
    let mut rng = StdRng::seed_from_u64(42);
    let noise: Vec<f64> = (0..n).map(|_| (rng.gen::<f64>() - 0.5) * 0.04).collect();

    let clean = textbook_forces(n);
    let noisy: Vec<f64> = clean.iter().zip(&noise).map(|(f, e)| f + e).collect();

    // ten isolated +1 N spikes in the pre-peel region
    let mut spiked = noisy.clone();
    for k in 0..10 {
        spiked[5 + k * 9] += 1.0;
    }

    let m_noisy = analyze(&textbook_record(noisy));
    let m_spiked = analyze(&textbook_record(spiked));

    assert!(m_spiked.data_quality_ok);
    // peak still found near sample 250
    assert_abs_diff_eq!(m_spiked.peak_time_s, 5.0, epsilon = 6.0 / RATE_HZ);
    // baseline stays at the quiet-tail level
    assert_abs_diff_eq!(m_spiked.baseline_force_n, 0.0, epsilon = 0.015);
    // median stage removes the spikes, so pre-initiation barely moves
    let shift_s = m_noisy.pre_init_time_s - m_spiked.pre_init_time_s;
    assert!(
        shift_s < 5.0 / RATE_HZ + 1e-9,
        "spikes pulled pre-init earlier by {shift_s} s"
    );
}

#[test]
fn no_adhesion_layer() {
    let record = textbook_record(vec![0.0; 500]);
    let m = analyze(&record);

    assert!(!m.data_quality_ok);
    assert_abs_diff_eq!(m.peak_force_n, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(m.work_of_adhesion_mj, 0.0, epsilon = 1e-9);
    assert!(m.signal_to_noise_ratio.is_nan());
}

#[test]
fn single_spike_barely_changes_peak() {
    let clean = textbook_forces(500);
    let mut spiked = clean.clone();
    spiked[200] = 3.0; // 10x the true peak, inside the lifting phase

    let m_clean = analyze(&textbook_record(clean));
    let m_spiked = analyze(&textbook_record(spiked));

    let rel = (m_spiked.peak_force_n - m_clean.peak_force_n).abs() / m_clean.peak_force_n;
    assert!(rel < 0.05, "spike changed peak by {:.1}%", rel * 100.0);
    assert_abs_diff_eq!(m_spiked.peak_time_s, m_clean.peak_time_s, epsilon = 0.05);
}

#[test]
fn shortest_acceptable_layer_is_passthrough() {
    // shorter than both filter windows: smoothing must hand the data back
    let config = PipelineConfig::default();
    let signal = vec![0.02, 0.05, 0.01, 0.04, 0.03, 0.02, 0.06, 0.01];
    assert_eq!(smooth(&signal, &config), signal);

    // and a minimal layer must produce a (degraded) record, not a panic
    let times: Vec<f64> = (0..10).map(|i| i as f64 / RATE_HZ).collect();
    let positions: Vec<f64> = (0..10).map(|i| 10.0 - 0.06 * i as f64).collect();
    let record = SampleRecord::new(times, positions, vec![0.01; 10], RATE_HZ).unwrap();
    let bounds = LayerBoundaries::whole(10).unwrap();
    let m = MetricsCalculator::with_defaults()
        .analyze(&record, &bounds, 1, &LayerMetadata::default())
        .unwrap();
    assert!(!m.data_quality_ok);
}

#[test]
fn metric_additivity_is_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    let forces: Vec<f64> = textbook_forces(500)
        .into_iter()
        .map(|f| f + 0.01 * (rng.gen::<f64>() - 0.5))
        .collect();
    let m = analyze(&textbook_record(forces));

    assert!(m.data_quality_ok);
    assert_eq!(
        m.total_peel_duration_s,
        m.pre_init_duration_s + m.propagation_duration_s
    );
    assert_eq!(
        m.total_peel_distance_mm,
        m.distance_to_peak_mm + m.propagation_distance_mm
    );
}
