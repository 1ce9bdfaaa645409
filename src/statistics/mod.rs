//! Robust statistics for noisy timing samples.
//!
//! Naive averaging is unacceptable for measurement data polluted by
//! interrupts, scheduler preemption, and cache effects. Everything here
//! tolerates a minority of extreme outliers: counting sort for low-cardinality
//! integral samples, the half-sample mode, the median, and the median
//! absolute deviation.

mod robust;

pub use robust::{counting_sort, median, median_abs_dev, mode, mode_of_sorted};
