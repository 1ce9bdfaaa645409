//! Core types shared across the measurement engine.

use serde::{Deserialize, Serialize};

/// Platform-specific timer value (CPU cycles on x86).
///
/// Unsigned so that differences are well-defined under wraparound. Absolute
/// values are meaningless; only differences matter.
pub type Ticks = u64;

/// Opaque scalar identifying one benchmark scenario (e.g. a problem size).
///
/// The engine compares inputs only by equality and ordering; their meaning
/// belongs to the caller.
pub type FuncInput = u64;

/// Opaque value produced by the benchmarked computation.
///
/// Consumed only to defeat dead-code elimination, never interpreted.
pub type FuncOutput = u64;

/// Per-input measurement result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    /// The unique input value this estimate belongs to.
    pub input: FuncInput,

    /// Estimated mean ticks per call (fractional).
    pub ticks: f64,

    /// Worst observed relative MAD across all measurements that contributed
    /// to this estimate.
    pub variability: f64,
}

/// Why a measurement attempt was rejected.
///
/// These are recoverable environment problems, not engine bugs: the caller
/// may retry or degrade gracefully. Internal-consistency violations panic
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureError {
    /// The cheapest input measured as zero ticks after subtracting timer
    /// resolution, so no meaningful skip count exists.
    ZeroSkipCount,

    /// Loop/dispatch overhead over the full corpus measured below the
    /// overhead over the shorter subset corpus.
    OverheadInversion {
        /// Overhead of one pass over the full corpus, in ticks.
        full: Ticks,
        /// Overhead of one pass over the subset corpus, in ticks.
        subset: Ticks,
    },

    /// Total duration over the full corpus measured below the total over
    /// the subset corpus.
    DurationInversion {
        /// Input whose subset measurement triggered the inversion.
        input: FuncInput,
        /// Total duration over the full corpus, in ticks.
        full: Ticks,
        /// Total duration over the subset corpus, in ticks.
        subset: Ticks,
    },

    /// The overhead delta exceeded the duration delta, which would yield a
    /// negative per-call cost.
    NegativeDuration {
        /// Input whose per-call cost came out negative.
        input: FuncInput,
    },
}

impl MeasureError {
    /// Human-readable description of the failure cause.
    pub fn description(&self) -> String {
        match self {
            MeasureError::ZeroSkipCount => {
                "cheapest input is unmeasurable: estimated duration is zero \
                 after subtracting timer resolution"
                    .to_string()
            }
            MeasureError::OverheadInversion { full, subset } => format!(
                "environment too noisy: full-corpus overhead {} < subset-corpus overhead {}",
                full, subset
            ),
            MeasureError::DurationInversion { input, full, subset } => format!(
                "environment too noisy: full-corpus total {} < subset-corpus total {} (input {})",
                full, subset, input
            ),
            MeasureError::NegativeDuration { input } => format!(
                "environment too noisy: overhead delta exceeds duration delta (input {})",
                input
            ),
        }
    }
}

impl std::fmt::Display for MeasureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

impl std::error::Error for MeasureError {}

/// Outcome of a measurement call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// One result per unique input, in ascending input order.
    Completed(Vec<BenchResult>),

    /// The environment was judged too noisy to trust; a diagnostic has
    /// already been emitted.
    Failed(MeasureError),
}

impl Outcome {
    /// Number of successfully measured unique inputs; 0 signals failure.
    pub fn count(&self) -> usize {
        match self {
            Outcome::Completed(results) => results.len(),
            Outcome::Failed(_) => 0,
        }
    }

    /// Borrow the results, if measurement succeeded.
    pub fn results(&self) -> Option<&[BenchResult]> {
        match self {
            Outcome::Completed(results) => Some(results),
            Outcome::Failed(_) => None,
        }
    }

    /// Consume the outcome, yielding the results if measurement succeeded.
    pub fn into_results(self) -> Option<Vec<BenchResult>> {
        match self {
            Outcome::Completed(results) => Some(results),
            Outcome::Failed(_) => None,
        }
    }
}
