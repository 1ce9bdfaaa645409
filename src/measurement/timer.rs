//! Platform-specific fenced timestamp reads.
//!
//! `start()` and `stop()` bracket a measured region immediately and use
//! different fences on purpose. `start()` is a full fence on both sides of
//! the counter read, so nothing outside the region leaks in. `stop()` is a
//! half-fence-with-release read followed by a full fence: everything inside
//! the region completes before the timestamp is taken, and later
//! instructions cannot be counted into the region. The start+stop pairing
//! has lower variance and overhead than start+start or stop+stop, because
//! the fence in `start()` already stabilizes ordering for the paired
//! `stop()` without adding fence cost inside the timed region.
//!
//! Backends:
//! - x86_64: `lfence; rdtsc; lfence` / `rdtscp; lfence`
//! - aarch64: `isb; mrs cntvct_el0`
//! - otherwise: monotonic `std::time::Instant` nanoseconds

use std::hint::black_box as std_black_box;
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use std::sync::atomic::{compiler_fence, Ordering};

use crate::types::{FuncOutput, Ticks};

/// Timestamp in ticks; place immediately before the region to measure.
#[inline]
pub fn start() -> Ticks {
    #[cfg(target_arch = "x86_64")]
    {
        start_x86_64()
    }

    #[cfg(target_arch = "aarch64")]
    {
        read_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        read_fallback()
    }
}

/// Timestamp in ticks; place immediately after the region to measure.
#[inline]
pub fn stop() -> Ticks {
    #[cfg(target_arch = "x86_64")]
    {
        stop_x86_64()
    }

    #[cfg(target_arch = "aarch64")]
    {
        // The isb before the counter read already orders the region; the
        // same sequence serves both roles on this architecture.
        read_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        read_fallback()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn start_x86_64() -> Ticks {
    compiler_fence(Ordering::SeqCst);

    let t: u64;
    unsafe {
        // rdtsc is not serializing; the surrounding lfences keep earlier
        // instructions from completing after it and later ones from
        // completing before it.
        std::arch::asm!(
            "lfence",
            "rdtsc",
            "shl rdx, 32",
            "or rax, rdx",
            "lfence",
            out("rax") t,
            out("rdx") _,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    t
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn stop_x86_64() -> Ticks {
    compiler_fence(Ordering::SeqCst);

    let t: u64;
    unsafe {
        // rdtscp waits for all prior instructions (half-fence with release
        // semantics); the trailing lfence keeps subsequent instructions out
        // of the region. rcx receives TSC_AUX and is discarded.
        std::arch::asm!(
            "rdtscp",
            "shl rdx, 32",
            "or rax, rdx",
            "lfence",
            out("rax") t,
            out("rcx") _,
            out("rdx") _,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    t
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn read_aarch64() -> Ticks {
    compiler_fence(Ordering::SeqCst);

    let t: u64;
    unsafe {
        // isb retires all prior instructions before the virtual counter read.
        std::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) t,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    t
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn read_fallback() -> Ticks {
    use std::sync::OnceLock;
    use std::time::Instant;

    // Anchor to a process-lifetime epoch; only differences matter.
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as Ticks
}

/// Makes the optimizer treat `output` as externally observed so a
/// computation whose result is otherwise unused cannot be deleted by
/// dead-code elimination.
///
/// Cost is (near-)identical regardless of the input that produced `output`,
/// which matters because this appears inside every measured and control
/// call.
#[inline]
pub fn prevent_elision<T>(output: T) {
    std_black_box(output);
}

/// Returns 1, but the compiler cannot prove it.
///
/// Derived from a live timestamp read, so constant propagation cannot fold
/// benchmarked code specialized on this value.
#[inline]
pub fn unpredictable_one() -> FuncOutput {
    (start() != Ticks::MAX) as FuncOutput
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_ordered() {
        let t0 = start();
        let t1 = stop();
        // Monotonic modulo wraparound; a wrap within two adjacent reads is
        // not realistic on any supported backend.
        assert!(t1 >= t0, "t0={} t1={}", t0, t1);
    }

    #[test]
    fn test_ticks_advance() {
        let t0 = start();
        let mut sum = 0u64;
        for i in 0..100_000u64 {
            sum = sum.wrapping_add(i);
        }
        prevent_elision(sum);
        let t1 = stop();
        assert!(t1.wrapping_sub(t0) > 0);
    }

    #[test]
    fn test_unpredictable_one_is_one() {
        assert_eq!(unpredictable_one(), 1);
    }
}
