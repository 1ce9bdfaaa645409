//! Measurement infrastructure: fenced timestamps and process-wide
//! calibration.
//!
//! Timestamp backends by target:
//! - **x86_64**: `rdtsc`/`rdtscp` with lfence-based ordering (~0.3-1ns)
//! - **aarch64**: `isb; mrs cntvct_el0` (resolution varies by SoC, ~1-42ns)
//! - **other**: monotonic `std::time::Instant` nanoseconds
//!
//! Calibration (tick rate and timer resolution) happens once per process
//! and is shared immutably afterwards; see [`Calibration`].

mod calibration;
mod timer;

pub use calibration::{invariant_ticks_per_second, now, timer_resolution, Calibration};
pub use timer::{prevent_elision, start, stop, unpredictable_one};
