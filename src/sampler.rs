//! Adaptive sampling: repeat a unit of work until its central estimate is
//! stable.
//!
//! Convergence is judged on the relative median absolute deviation, with an
//! absolute floor anchored to the calibrated timer resolution so the loop
//! never chases noise the hardware cannot resolve.

use crate::config::Params;
use crate::measurement::{self, Calibration};
use crate::statistics;
use crate::types::Ticks;

/// Stable central estimate and the variability it achieved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sampled {
    /// Central estimate of the workload duration, in ticks.
    pub estimate: Ticks,
    /// Achieved relative MAD (abs MAD / estimate).
    pub rel_mad: f64,
}

/// Estimates the expected duration of `workload` with a growing number of
/// samples until the relative MAD drops to `max_rel_mad`, the absolute MAD
/// drops below one hundredth of the timer resolution, or the round budget
/// runs out (best-effort, with a warning).
///
/// # Panics
///
/// Panics on a zero central estimate: all later arithmetic divides by it,
/// so a zero indicates a bug in the measurement engine rather than a noisy
/// environment.
pub(crate) fn sample_until_stable(
    max_rel_mad: f64,
    p: &Params,
    calibration: &Calibration,
    mut workload: impl FnMut(),
) -> Sampled {
    // One exploratory call sizes the first batch against the wall-clock
    // budget per evaluation round.
    let t0 = measurement::start();
    workload();
    let t1 = measurement::stop();
    let mut est = t1.wrapping_sub(t0);

    let ticks_per_eval = (calibration.ticks_per_second * p.seconds_per_eval) as Ticks;
    let mut samples_per_eval = if est == 0 {
        p.min_samples_per_eval
    } else {
        (ticks_per_eval / est) as usize
    };
    samples_per_eval = samples_per_eval.max(p.min_samples_per_eval);

    let mut samples: Vec<Ticks> = Vec::with_capacity(1 + samples_per_eval);
    samples.push(est);

    // A percentage is too strict for tiny durations, so also accept a small
    // absolute MAD (one hundredth of the timer resolution, rounded up).
    let max_abs_mad = (calibration.timer_resolution + 99) / 100;
    let mut rel_mad = 0.0;

    for _eval in 0..p.max_evals {
        samples.reserve(samples_per_eval);
        for _ in 0..samples_per_eval {
            let t0 = measurement::start();
            workload();
            let t1 = measurement::stop();
            samples.push(t1.wrapping_sub(t0));
        }

        // The mode is stable once there are enough repeat values; below
        // that, the median is safer.
        est = if samples.len() >= p.min_mode_samples {
            statistics::mode(&mut samples)
        } else {
            statistics::median(&mut samples)
        };
        assert!(est != 0, "zero central estimate from {} samples", samples.len());

        let abs_mad = statistics::median_abs_dev(&samples, est);
        rel_mad = abs_mad as f64 / est as f64;

        if rel_mad <= max_rel_mad || abs_mad <= max_abs_mad {
            if p.verbose {
                eprintln!(
                    "{:6} samples => {:5} (abs_mad={:4}, rel_mad={:4.2}%)",
                    samples.len(),
                    est,
                    abs_mad,
                    rel_mad * 100.0
                );
            }
            return Sampled { estimate: est, rel_mad };
        }

        samples_per_eval *= 2;
    }

    if p.verbose {
        eprintln!(
            "[WARNING] rel_mad={:4.2}% still exceeds {:4.2}% after {:6} samples",
            rel_mad * 100.0,
            max_rel_mad * 100.0,
            samples.len()
        );
    }
    Sampled { estimate: est, rel_mad }
}
