//! End-to-end batch scenarios: sandwich protocols, unpaired motions, and
//! the file round trip.

use std::io::Write;

use approx::assert_abs_diff_eq;
use vatpeel_batch::{read_metrics_csv, write_metrics_csv, BatchProcessor};
use vatpeel_core::{LayerMetadata, SampleRecord};
use vatpeel_signal::Segmenter;

const RATE_HZ: f64 = 50.0;

/// Appends a linear move (or hold) toward `target` over `samples`.
fn push_move(positions: &mut Vec<f64>, target: f64, samples: usize) {
    let from = *positions.last().unwrap();
    for k in 1..=samples {
        positions.push(from + (target - from) * k as f64 / samples as f64);
    }
}

/// A triangular force bump over the lift portions of a position trace:
/// force rises and falls wherever the stage is moving down past 1 mm of
/// travel.
fn forces_for(positions: &[f64]) -> Vec<f64> {
    let mut forces = vec![0.0; positions.len()];
    let mut lift_start = None;
    for i in 1..positions.len() {
        let falling = positions[i] < positions[i - 1] - 1e-9;
        match (falling, lift_start) {
            (true, None) => lift_start = Some(i),
            (false, Some(s)) => {
                let span = i - s;
                if (positions[s - 1] - positions[i - 1]).abs() > 2.0 {
                    for (k, f) in forces[s..i].iter_mut().enumerate() {
                        let u = k as f64 / span as f64;
                        *f = if u < 0.3 {
                            0.3 * u / 0.3
                        } else {
                            (0.3 * (0.7 - (u - 0.3)) / 0.7).max(0.0)
                        };
                    }
                }
                lift_start = None;
            }
            _ => {}
        }
    }
    forces
}

fn record_from(positions: Vec<f64>) -> SampleRecord {
    let times: Vec<f64> = (0..positions.len()).map(|i| i as f64 / RATE_HZ).collect();
    let forces = forces_for(&positions);
    SampleRecord::new(times, positions, forces, RATE_HZ).unwrap()
}

/// Two 6 mm cycles separated by a 0.6 mm sandwich touch.
fn sandwich_positions() -> Vec<f64> {
    let mut x = vec![10.0];
    push_move(&mut x, 10.0, 120); // settle
    push_move(&mut x, 4.0, 150); // lift 1
    push_move(&mut x, 4.0, 120);
    push_move(&mut x, 10.0, 150); // retract 1
    push_move(&mut x, 10.0, 50);
    push_move(&mut x, 9.4, 20); // sandwich touch
    push_move(&mut x, 9.4, 10);
    push_move(&mut x, 10.0, 20);
    push_move(&mut x, 10.0, 80);
    push_move(&mut x, 4.0, 150); // lift 2
    push_move(&mut x, 4.0, 120);
    push_move(&mut x, 10.0, 150); // retract 2
    push_move(&mut x, 10.0, 120);
    x
}

#[test]
fn sandwich_protocol_yields_two_layers() {
    let record = record_from(sandwich_positions());
    let table = BatchProcessor::with_defaults()
        .process_record(&record, 1, &LayerMetadata::default())
        .unwrap();

    assert_eq!(table.len(), 2);
    for m in &table {
        assert!(m.data_quality_ok, "layer {} degraded", m.layer_number);
        assert_abs_diff_eq!(m.peak_force_n, 0.3, epsilon = 0.02);
    }

    // the touch is outside every emitted interval
    let result = Segmenter::with_defaults().segment(&record);
    let touch_range = 591..641; // 0.6 mm excursion inserted after retract 1
    for bounds in &result.boundaries {
        let (l0, l1) = bounds.lifting();
        let (r0, r1) = bounds.retraction();
        assert!(l1 <= touch_range.start || l0 >= touch_range.end);
        assert!(r1 <= touch_range.start || r0 >= touch_range.end);
    }
}

#[test]
fn missing_retract_yields_no_layers() {
    let mut x = vec![10.0];
    push_move(&mut x, 10.0, 120);
    push_move(&mut x, 4.0, 150); // lift with no retract
    push_move(&mut x, 4.0, 120);
    let record = record_from(x);

    let result = Segmenter::with_defaults().segment(&record);
    assert!(result.boundaries.is_empty());
    assert!(result.unpaired_tail);

    let table = BatchProcessor::with_defaults()
        .process_record(&record, 1, &LayerMetadata::default())
        .unwrap();
    assert!(table.is_empty());
}

#[test]
fn file_pipeline_round_trip() {
    // write an acquisition CSV, process it, write the metrics table,
    // read the table back
    let dir = tempfile::tempdir().unwrap();
    let condition_dir = dir.path().join("Water_1mm_SteppedCone_1000");
    std::fs::create_dir(&condition_dir).unwrap();
    let sample_path = condition_dir.join("autolog_L20-L21.csv");

    let record = {
        let mut x = vec![10.0];
        push_move(&mut x, 10.0, 120);
        for _ in 0..2 {
            push_move(&mut x, 4.0, 150);
            push_move(&mut x, 4.0, 120);
            push_move(&mut x, 10.0, 150);
            push_move(&mut x, 10.0, 120);
        }
        record_from(x)
    };
    {
        let mut file = std::fs::File::create(&sample_path).unwrap();
        writeln!(file, "Elapsed Time (s),Position (mm),Force (N)").unwrap();
        for i in 0..record.len() {
            writeln!(
                file,
                "{},{},{}",
                record.times_s()[i],
                record.positions_mm()[i],
                record.forces_n()[i]
            )
            .unwrap();
        }
    }

    let table = BatchProcessor::with_defaults()
        .process_file(&sample_path, RATE_HZ)
        .unwrap();
    assert_eq!(table.len(), 2);
    // layer numbers from the file name, condition tags from the folder
    assert_eq!(table[0].layer_number, 20);
    assert_eq!(table[1].layer_number, 21);
    assert_eq!(table[0].fluid_tag.as_deref(), Some("Water"));
    assert_eq!(table[0].gap_tag.as_deref(), Some("1mm"));
    assert_eq!(table[0].step_speed_um_per_s, Some(1000.0));

    let metrics_path = dir.path().join("metrics.csv");
    write_metrics_csv(&metrics_path, &table).unwrap();
    let back = read_metrics_csv(&metrics_path).unwrap();
    assert_eq!(back.len(), table.len());
    for (a, b) in table.iter().zip(&back) {
        assert_eq!(a.layer_number, b.layer_number);
        if a.peak_force_n.is_finite() {
            assert_eq!(a.peak_force_n, b.peak_force_n);
        }
        if a.work_of_adhesion_mj.is_finite() {
            assert_eq!(a.work_of_adhesion_mj, b.work_of_adhesion_mj);
        }
        assert_eq!(a.data_quality_ok, b.data_quality_ok);
    }
}
