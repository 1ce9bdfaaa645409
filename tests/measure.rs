//! End-to-end measurement tests.
//!
//! These run real timed measurements, so they assert structural properties
//! and loose bounds rather than exact timings. A `Failed` outcome is a
//! legitimate result on a heavily loaded machine and is tolerated where
//! noted.

use nanomark::{measure, prevent_elision, unpredictable_one, Calibration, Nanomark, Outcome};

/// Deterministic workload whose cost grows with the input.
fn spin(n: u64) -> u64 {
    let mut acc = n;
    for i in 0..(n * 100).max(1_000) {
        acc = acc.wrapping_mul(31).wrapping_add(i);
    }
    acc
}

fn quick() -> Nanomark {
    Nanomark::new()
        .seconds_per_eval(5e-4)
        .target_rel_mad(0.1)
        .max_evals(4)
        .precision_divisor(64)
}

#[test]
fn test_measure_unique_inputs_in_order() {
    let outcome = quick().measure(spin, &[3, 1, 1, 2]);

    match outcome {
        Outcome::Completed(results) => {
            let inputs: Vec<u64> = results.iter().map(|r| r.input).collect();
            assert_eq!(inputs, vec![1, 2, 3]);
            for r in &results {
                assert!(r.ticks.is_finite());
                assert!(r.ticks >= 0.0, "negative duration for input {}", r.input);
                assert!(r.variability >= 0.0);
            }
        }
        // Too noisy to measure here; the engine reported why.
        Outcome::Failed(_) => {}
    }
}

#[test]
fn test_noop_workload_measures_near_zero() {
    // Identity costs far less than one timer step, and its dispatch cost is
    // exactly what the control corpus measures, so after cancellation each
    // per-input estimate must land near zero. Anything well beyond a few
    // resolution steps of residual noise means cancellation is broken.
    let nm = quick();
    let outcome = nm.measure(|n| n, &[1, 1, 2, 3]);

    match outcome {
        Outcome::Completed(results) => {
            let resolution = Calibration::get(nm.params()).timer_resolution as f64;
            let bound = resolution * 8.0 + 64.0;

            let inputs: Vec<u64> = results.iter().map(|r| r.input).collect();
            assert_eq!(inputs, vec![1, 2, 3]);
            for r in &results {
                assert!(
                    r.ticks <= bound,
                    "input {}: {:.2} ticks exceeds near-zero bound {:.2}",
                    r.input,
                    r.ticks,
                    bound
                );
            }
        }
        // A no-op is the hardest case to resolve; rejection is acceptable.
        Outcome::Failed(_) => {}
    }
}

#[test]
fn test_measure_single_input() {
    let outcome = quick().measure(spin, &[4, 4, 4]);

    match outcome {
        Outcome::Completed(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].input, 4);
            assert!(results[0].ticks >= 0.0);
        }
        Outcome::Failed(_) => {}
    }
}

#[test]
fn test_count_matches_outcome() {
    let outcome = quick().measure(spin, &[1, 2]);
    match &outcome {
        Outcome::Completed(results) => assert_eq!(outcome.count(), results.len()),
        Outcome::Failed(_) => assert_eq!(outcome.count(), 0),
    }
}

#[test]
fn test_measure_free_function_runs() {
    // Default params make this slower; keep the workload heavy enough to be
    // measurable everywhere but cap the corpus via a large per-call cost.
    let outcome = measure(|n| spin(n + 50), &[10]);
    match outcome {
        Outcome::Completed(results) => assert_eq!(results.len(), 1),
        Outcome::Failed(_) => {}
    }
}

#[test]
fn test_unpredictable_one_defeats_folding() {
    // The value is always 1; the point is that the compiler cannot prove it.
    let one = unpredictable_one();
    assert_eq!(one, 1);
    prevent_elision(spin(one));
}

#[test]
#[should_panic(expected = "at least one input")]
fn test_empty_inputs_panics() {
    let _ = quick().measure(spin, &[]);
}
