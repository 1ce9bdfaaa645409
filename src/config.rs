//! Configuration for per-input measurement.

/// Tunables for the measurement engine.
///
/// All fields are read-only during a measurement; construct once and pass by
/// reference. Defaults are chosen for sub-microsecond workloads on a mostly
/// idle machine.
#[derive(Debug, Clone)]
pub struct Params {
    /// Samples per batch when calibrating the timer's own resolution
    /// (default: 256). The calibration runs `timer_samples` batches of
    /// `timer_samples` empty start/stop pairs.
    pub timer_samples: usize,

    /// Controls skip-count granularity: the skip count is the smallest
    /// repetition count whose removal changes total time by at least one
    /// part in this divisor (default: 1024, i.e. 0.1% precision).
    pub precision_divisor: u64,

    /// Corpus replication multiplier: the full corpus contains
    /// `subset_ratio * skip_count` passes over the input list (default: 2).
    pub subset_ratio: usize,

    /// Wall-clock budget per adaptive-sampling evaluation round, in seconds
    /// (default: 4 ms).
    pub seconds_per_eval: f64,

    /// Floor on samples per evaluation round (default: 7).
    pub min_samples_per_eval: usize,

    /// Minimum sample count before switching the central estimate from
    /// median to half-sample mode (default: 64). Mode estimation is
    /// unreliable on very small samples.
    pub min_mode_samples: usize,

    /// Target relative MAD for convergence (default: 0.002, i.e. 0.2%).
    pub target_rel_mad: f64,

    /// Maximum convergence rounds before returning a best-effort estimate
    /// (default: 9). Each round doubles the batch size.
    pub max_evals: usize,

    /// Emit human-readable progress/warning lines to stderr (default: false).
    pub verbose: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            timer_samples: 256,
            precision_divisor: 1024,
            subset_ratio: 2,
            seconds_per_eval: 4e-3,
            min_samples_per_eval: 7,
            min_mode_samples: 64,
            target_rel_mad: 0.002,
            max_evals: 9,
            verbose: false,
        }
    }
}
