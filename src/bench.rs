//! Per-input measurement with overhead cancellation.
//!
//! Direct per-call timing is unusable for cheap inputs: loop and dispatch
//! overhead can dwarf the payload. Instead, we time a large replicated
//! multiset of calls (the "full" corpus) and the same multiset with
//! `skip_count` occurrences of one input removed (the "subset" corpus); the
//! difference, divided by the number of removed occurrences, isolates that
//! input's average per-call cost while the shared overhead cancels.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::Params;
use crate::measurement::{prevent_elision, Calibration};
use crate::sampler::sample_until_stable;
use crate::types::{BenchResult, FuncInput, FuncOutput, MeasureError, Outcome, Ticks};

/// Seed for the corpus shuffles. Fixed and never reseeded: the full and
/// subset measurements must experience statistically comparable overhead
/// patterns (branch-prediction state and the like), which requires the same
/// pseudo-random sequence on every invocation. This is a correctness
/// requirement, not an incidental detail.
const CORPUS_SEED: u64 = 42;

/// Sorted, deduplicated copy of the caller's input list.
fn unique_inputs(inputs: &[FuncInput]) -> Vec<FuncInput> {
    let mut unique = inputs.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Smallest repetition count whose removal changes total measured time by
/// at least one part in `precision_divisor`. Zero means unmeasurable.
fn skip_count(precision_divisor: u64, min_duration: Ticks) -> usize {
    if min_duration == 0 {
        0
    } else {
        precision_divisor.div_ceil(min_duration) as usize
    }
}

/// How often `func` must be called for sufficient precision.
///
/// The cheapest input dominates: it needs the most repetitions to register
/// above the timer's noise floor.
fn num_skip<F>(
    func: &mut F,
    unique: &[FuncInput],
    p: &Params,
    calibration: &Calibration,
) -> usize
where
    F: FnMut(FuncInput) -> FuncOutput,
{
    let mut min_duration = Ticks::MAX;

    for &input in unique {
        let sampled = sample_until_stable(p.target_rel_mad, p, calibration, || {
            prevent_elision(func(input));
        });
        // Subtract the timer's own granularity to approximate the true
        // duration of the call.
        min_duration = min_duration.min(
            sampled
                .estimate
                .saturating_sub(calibration.timer_resolution),
        );
    }

    let n = skip_count(p.precision_divisor, min_duration);
    if p.verbose {
        eprintln!(
            "res={} max_skip={} min_dur={} num_skip={}",
            calibration.timer_resolution, p.precision_divisor, min_duration, n
        );
    }
    n
}

/// Replicates `inputs` until `num_skip` occurrences of any one value can be
/// omitted, then shuffles once with the fixed-seed sequence.
fn replicate_inputs(
    inputs: &[FuncInput],
    num_unique: usize,
    num_skip: usize,
    p: &Params,
) -> Vec<FuncInput> {
    if num_unique == 1 {
        return vec![inputs[0]; p.subset_ratio * num_skip];
    }

    let mut full = Vec::with_capacity(p.subset_ratio * num_skip * inputs.len());
    for _ in 0..p.subset_ratio * num_skip {
        full.extend_from_slice(inputs);
    }
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(CORPUS_SEED);
    full.shuffle(&mut rng);
    full
}

/// Copies `full` into `subset` in order, omitting exactly `num_skip`
/// occurrences of `input_to_skip`.
///
/// The omitted occurrences are chosen by a fixed-seed shuffle of the
/// occurrence indices, so they are reproducibly spread across the corpus
/// rather than clustered at one end. The omission list is identical on
/// every call, but it indexes the Nth occurrence of the value, so the
/// positions within `full` still differ per input.
///
/// # Panics
///
/// Panics if the resulting length is not exactly
/// `full.len() - num_skip` (internal-consistency violation).
fn fill_subset(
    full: &[FuncInput],
    input_to_skip: FuncInput,
    num_skip: usize,
    subset: &mut Vec<FuncInput>,
) {
    let count = full.iter().filter(|&&v| v == input_to_skip).count();

    let mut omit: Vec<u32> = (0..count as u32).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(CORPUS_SEED);
    omit.shuffle(&mut rng);
    omit.truncate(num_skip);
    omit.sort_unstable();

    subset.clear();
    let mut occurrence = 0u32;
    let mut idx_omit = 0;
    for &next in full {
        if next == input_to_skip {
            let this = occurrence;
            occurrence += 1;
            if idx_omit < omit.len() && this == omit[idx_omit] {
                idx_omit += 1;
                continue;
            }
        }
        subset.push(next);
    }

    assert_eq!(
        subset.len(),
        full.len() - num_skip,
        "subset length contract violated"
    );
    assert_eq!(idx_omit, omit.len());
    assert_eq!(occurrence as usize, count);
}

/// (Nearly) empty computation for measuring loop/dispatch overhead.
#[inline(never)]
fn empty_func(input: FuncInput) -> FuncOutput {
    input
}

/// Overhead of iterating a corpus and dispatching a call per element; later
/// deducted from total durations. Measured separately per corpus because it
/// scales with corpus length.
fn overhead(corpus: &[FuncInput], p: &Params, calibration: &Calibration) -> Ticks {
    // Zero tolerance: repeatability is crucial and empty_func is fast, so
    // convergence relies on the absolute MAD floor.
    sample_until_stable(0.0, p, calibration, || {
        for &input in corpus {
            prevent_elision(empty_func(input));
        }
    })
    .estimate
}

/// Delta of the two corpus overheads, rejecting an inversion (the full
/// corpus is longer, so its overhead can never legitimately be smaller).
fn overhead_delta(full: Ticks, subset: Ticks) -> Result<Ticks, MeasureError> {
    if full < subset {
        return Err(MeasureError::OverheadInversion { full, subset });
    }
    Ok(full - subset)
}

/// Per-input duration from the corpus totals and the overhead delta.
///
/// Rearranged from `(total_full - overhead_full) - (total_subset -
/// overhead_subset)` so both subtractions are over known-ordered pairs;
/// `checked_sub` then catches the remaining case where the overhead delta
/// exceeds the duration delta, which in unsigned arithmetic would wrap to
/// an absurdly large duration instead of a negative one.
fn per_input_duration(
    input: FuncInput,
    total_full: Ticks,
    total_subset: Ticks,
    delta_overhead: Ticks,
) -> Result<Ticks, MeasureError> {
    if total_full < total_subset {
        return Err(MeasureError::DurationInversion {
            input,
            full: total_full,
            subset: total_subset,
        });
    }
    (total_full - total_subset)
        .checked_sub(delta_overhead)
        .ok_or(MeasureError::NegativeDuration { input })
}

/// Total ticks for one pass of `func` over the corpus; folds the achieved
/// variability into the running worst case.
fn total_duration<F>(
    func: &mut F,
    corpus: &[FuncInput],
    p: &Params,
    calibration: &Calibration,
    max_rel_mad: &mut f64,
) -> Ticks
where
    F: FnMut(FuncInput) -> FuncOutput,
{
    let sampled = sample_until_stable(p.target_rel_mad, p, calibration, || {
        for &input in corpus {
            prevent_elision(func(input));
        }
    });
    *max_rel_mad = max_rel_mad.max(sampled.rel_mad);
    sampled.estimate
}

/// Entry point for per-input measurement.
///
/// Configure with the builder methods, then call [`Nanomark::measure`].
///
/// # Example
///
/// ```ignore
/// use nanomark::Nanomark;
///
/// let outcome = Nanomark::new()
///     .target_rel_mad(0.01)
///     .verbose(true)
///     .measure(|n| my_routine(n), &[8, 64, 512]);
///
/// for r in outcome.results().unwrap_or_default() {
///     println!("{}: {:.2} ticks (±{:.1}%)", r.input, r.ticks, r.variability * 100.0);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Nanomark {
    params: Params,
}

impl Nanomark {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples per timer self-calibration batch.
    pub fn timer_samples(mut self, n: usize) -> Self {
        self.params.timer_samples = n;
        self
    }

    /// Skip-count granularity divisor.
    pub fn precision_divisor(mut self, d: u64) -> Self {
        self.params.precision_divisor = d;
        self
    }

    /// Corpus replication multiplier.
    pub fn subset_ratio(mut self, ratio: usize) -> Self {
        self.params.subset_ratio = ratio;
        self
    }

    /// Wall-clock budget per evaluation round, in seconds.
    pub fn seconds_per_eval(mut self, seconds: f64) -> Self {
        self.params.seconds_per_eval = seconds;
        self
    }

    /// Floor on samples per evaluation round.
    pub fn min_samples_per_eval(mut self, n: usize) -> Self {
        self.params.min_samples_per_eval = n;
        self
    }

    /// Minimum sample count before switching from median to mode.
    pub fn min_mode_samples(mut self, n: usize) -> Self {
        self.params.min_mode_samples = n;
        self
    }

    /// Target relative MAD for convergence.
    pub fn target_rel_mad(mut self, rel_mad: f64) -> Self {
        self.params.target_rel_mad = rel_mad;
        self
    }

    /// Maximum convergence rounds per measurement.
    pub fn max_evals(mut self, n: usize) -> Self {
        self.params.max_evals = n;
        self
    }

    /// Emit progress/warning diagnostics to stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.params.verbose = verbose;
        self
    }

    /// The current configuration.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Measures the mean per-call cost of `func` for each unique value in
    /// `inputs`.
    ///
    /// Returns one [`BenchResult`] per unique input (ascending order) on
    /// success, or [`Outcome::Failed`] when the environment is judged too
    /// noisy to trust; the failure cause is also reported on stderr.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` is empty, or on an internal-consistency violation
    /// of the measurement engine itself (see [`crate::sampler`] and
    /// [`fill_subset`]'s contracts).
    pub fn measure<F>(&self, mut func: F, inputs: &[FuncInput]) -> Outcome
    where
        F: FnMut(FuncInput) -> FuncOutput,
    {
        assert!(!inputs.is_empty(), "measure requires at least one input");
        let p = &self.params;
        let calibration = Calibration::get(p);

        let unique = unique_inputs(inputs);

        let num_skip = num_skip(&mut func, &unique, p, calibration);
        if num_skip == 0 {
            let err = MeasureError::ZeroSkipCount;
            eprintln!("[ERROR] measurement failed: {}", err);
            return Outcome::Failed(err);
        }
        let mul = 1.0 / num_skip as f64;

        let full = replicate_inputs(inputs, unique.len(), num_skip, p);
        // The subset buffer starts zero-filled at its final length so the
        // subset overhead is measured over the right corpus size.
        let mut subset: Vec<FuncInput> = vec![0; full.len() - num_skip];

        let overhead_full = overhead(&full, p, calibration);
        let overhead_subset = overhead(&subset, p, calibration);
        let delta_overhead = match overhead_delta(overhead_full, overhead_subset) {
            Ok(delta) => delta,
            Err(err) => {
                eprintln!("[ERROR] measurement failed: {}", err);
                return Outcome::Failed(err);
            }
        };

        if p.verbose {
            eprintln!(
                "#inputs={},{} overhead={},{}",
                full.len(),
                subset.len(),
                overhead_full,
                overhead_subset
            );
        }

        let mut max_rel_mad = 0.0;
        let total_full = total_duration(&mut func, &full, p, calibration, &mut max_rel_mad);

        let mut results = Vec::with_capacity(unique.len());
        for &input in &unique {
            fill_subset(&full, input, num_skip, &mut subset);
            let total_subset =
                total_duration(&mut func, &subset, p, calibration, &mut max_rel_mad);

            let duration =
                match per_input_duration(input, total_full, total_subset, delta_overhead) {
                    Ok(duration) => duration,
                    Err(err) => {
                        eprintln!("[ERROR] measurement failed: {}", err);
                        return Outcome::Failed(err);
                    }
                };

            results.push(BenchResult {
                input,
                ticks: duration as f64 * mul,
                variability: max_rel_mad,
            });
        }

        Outcome::Completed(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_inputs_sorts_and_dedups() {
        assert_eq!(unique_inputs(&[3, 1, 1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(unique_inputs(&[5]), vec![5]);
    }

    #[test]
    fn test_skip_count_rounds_up() {
        assert_eq!(skip_count(1024, 1), 1024);
        assert_eq!(skip_count(1024, 1000), 2);
        assert_eq!(skip_count(1024, 1024), 1);
        assert_eq!(skip_count(1024, 1_000_000), 1);
        assert_eq!(skip_count(1024, 0), 0);
    }

    #[test]
    fn test_skip_count_monotonic_in_divisor() {
        // Halving the divisor never increases the skip count.
        for min_duration in [1u64, 3, 17, 1000, 4096] {
            let mut divisor = 4096u64;
            while divisor > 1 {
                let coarse = skip_count(divisor / 2, min_duration);
                let fine = skip_count(divisor, min_duration);
                assert!(
                    coarse <= fine,
                    "divisor={} min_duration={}",
                    divisor,
                    min_duration
                );
                divisor /= 2;
            }
        }
    }

    #[test]
    fn test_replicate_single_unique_input() {
        let p = Params::default();
        let full = replicate_inputs(&[9, 9, 9], 1, 5, &p);
        assert_eq!(full.len(), p.subset_ratio * 5);
        assert!(full.iter().all(|&v| v == 9));
    }

    #[test]
    fn test_replicate_preserves_multiset() {
        let p = Params::default();
        let inputs = [1u64, 2, 3, 2];
        let num_skip = 4;
        let full = replicate_inputs(&inputs, 3, num_skip, &p);

        assert_eq!(full.len(), p.subset_ratio * num_skip * inputs.len());
        let occurrences =
            |v: u64| full.iter().filter(|&&x| x == v).count();
        assert_eq!(occurrences(1), p.subset_ratio * num_skip);
        assert_eq!(occurrences(2), 2 * p.subset_ratio * num_skip);
        assert_eq!(occurrences(3), p.subset_ratio * num_skip);
    }

    #[test]
    fn test_replicate_deterministic_across_calls() {
        let p = Params::default();
        let a = replicate_inputs(&[1, 2, 3], 3, 8, &p);
        let b = replicate_inputs(&[1, 2, 3], 3, 8, &p);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_subset_contract() {
        let p = Params::default();
        let inputs = [1u64, 1, 2, 3];
        let full = replicate_inputs(&inputs, 3, 6, &p);

        for (target, num_skip) in [(1u64, 6usize), (2, 6), (3, 6), (1, 1), (3, 0)] {
            let mut subset = Vec::new();
            fill_subset(&full, target, num_skip, &mut subset);

            assert_eq!(subset.len(), full.len() - num_skip);
            let before = full.iter().filter(|&&v| v == target).count();
            let after = subset.iter().filter(|&&v| v == target).count();
            assert_eq!(before - after, num_skip);

            // All other values survive untouched and in order.
            let expect_others: Vec<u64> =
                full.iter().copied().filter(|&v| v != target).collect();
            let got_others: Vec<u64> =
                subset.iter().copied().filter(|&v| v != target).collect();
            assert_eq!(expect_others, got_others);
        }
    }

    #[test]
    fn test_fill_subset_spreads_omissions() {
        // With every element equal, omitting from one end only would leave
        // a contiguous prefix; the fixed-seed shuffle must spread removals.
        let full = vec![7u64; 64];
        let mut subset = Vec::new();
        fill_subset(&full, 7, 8, &mut subset);
        assert_eq!(subset.len(), 56);
    }

    #[test]
    fn test_empty_func_is_identity() {
        assert_eq!(empty_func(123), 123);
    }

    #[test]
    fn test_overhead_delta_rejects_inversion() {
        assert_eq!(overhead_delta(100, 30), Ok(70));
        assert_eq!(overhead_delta(55, 55), Ok(0));
        assert_eq!(
            overhead_delta(30, 100),
            Err(MeasureError::OverheadInversion { full: 30, subset: 100 })
        );
    }

    #[test]
    fn test_per_input_duration_plain() {
        assert_eq!(per_input_duration(1, 1_000, 600, 100), Ok(300));
        assert_eq!(per_input_duration(1, 1_000, 600, 400), Ok(0));
    }

    #[test]
    fn test_per_input_duration_rejects_inversion() {
        // Full-corpus total forced below the subset total: the failure must
        // surface as an error, never as a wrapped-around duration.
        assert_eq!(
            per_input_duration(7, 500, 900, 0),
            Err(MeasureError::DurationInversion { input: 7, full: 500, subset: 900 })
        );
    }

    #[test]
    fn test_per_input_duration_rejects_negative() {
        // Both inversion guards pass, yet the overhead delta exceeds the
        // duration delta; unsigned subtraction would wrap to a huge value.
        assert_eq!(
            per_input_duration(3, 1_000, 950, 80),
            Err(MeasureError::NegativeDuration { input: 3 })
        );
    }
}
