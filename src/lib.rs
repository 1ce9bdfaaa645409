//! # nanomark
//!
//! Cycle-precise per-input micro-benchmarking on noisy, preemptible,
//! reordering-capable hardware.
//!
//! Given an opaque computation and a list of input values (say, problem
//! sizes), nanomark estimates the mean cost in timer ticks of one call per
//! distinct input, despite timer jitter, OS scheduling noise, instruction
//! reordering, and loop/dispatch overhead that can dwarf the measured work.
//!
//! How it gets there:
//! - fenced timestamp reads bracket each measured region (`rdtsc`/`rdtscp`
//!   on x86_64, `cntvct_el0` on aarch64, monotonic clock elsewhere);
//! - robust estimators (half-sample mode, median, MAD) reduce raw samples,
//!   tolerating the outliers that interrupts and preemption inject;
//! - an adaptive sampler grows the sample count until the relative MAD
//!   converges, with an absolute floor at the calibrated timer resolution;
//! - per-input cost is isolated by measuring a large shuffled corpus of
//!   calls and the same corpus with a known number of one input's
//!   occurrences removed, so shared overhead cancels in the difference.
//!
//! ## Quick start
//!
//! ```ignore
//! use nanomark::{measure, Outcome};
//!
//! let outcome = measure(|n| my_routine(n), &[8, 64, 512]);
//! match outcome {
//!     Outcome::Completed(results) => {
//!         for r in &results {
//!             println!("{}: {:.2} ticks/call (±{:.1}%)",
//!                      r.input, r.ticks, r.variability * 100.0);
//!         }
//!     }
//!     Outcome::Failed(err) => eprintln!("too noisy: {}", err),
//! }
//! ```
//!
//! The benchmarked closure must be repeatable with stable average cost; the
//! engine assumes negligible or constant side effects across calls and does
//! not enforce purity. Results are convergent and noise-robust, not
//! bit-reproducible across runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bench;
mod config;
mod sampler;
mod types;

pub mod measurement;
pub mod output;
pub mod statistics;

pub use bench::Nanomark;
pub use config::Params;
pub use measurement::{
    invariant_ticks_per_second, now, prevent_elision, unpredictable_one, Calibration,
};
pub use types::{BenchResult, FuncInput, FuncOutput, MeasureError, Outcome, Ticks};

/// Convenience function: measure with default configuration.
///
/// Equivalent to `Nanomark::new().measure(func, inputs)`; see
/// [`Nanomark::measure`] for the full contract.
pub fn measure<F>(func: F, inputs: &[FuncInput]) -> Outcome
where
    F: FnMut(FuncInput) -> FuncOutput,
{
    Nanomark::new().measure(func, inputs)
}
