//! Tick-to-seconds conversion and timer-resolution calibration.
//!
//! Both quantities are computed once and cached for the remainder of the
//! process; every sampler and orchestrator call reads the same immutable
//! values.

use std::sync::OnceLock;

use crate::config::Params;
use crate::statistics;
use crate::types::Ticks;

use super::timer;

/// Number of ticks the timestamp source advances per second.
///
/// - x86_64: nominal TSC frequency parsed from the CPUID brand string
///   (assumes an invariant TSC, true on all recent Intel/AMD parts). An
///   unparseable brand string falls back to an empirically measured ratio
///   against the OS monotonic clock.
/// - aarch64: `cntfrq_el0` reports the counter frequency directly.
/// - otherwise: the fallback clock is already nanosecond-denominated, so
///   this is 1e9 by definition.
pub fn invariant_ticks_per_second() -> f64 {
    static TICKS_PER_SECOND: OnceLock<f64> = OnceLock::new();
    *TICKS_PER_SECOND.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            nominal_clock_rate().unwrap_or_else(measured_ticks_per_second)
        }

        #[cfg(target_arch = "aarch64")]
        {
            counter_frequency_aarch64()
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            1e9
        }
    })
}

/// Monotonic time in seconds, from a single fenced counter read.
///
/// The conversion multiplier is computed once and cached, so this stays
/// constant-time.
pub fn now() -> f64 {
    static MUL: OnceLock<f64> = OnceLock::new();
    let mul = *MUL.get_or_init(|| 1.0 / invariant_ticks_per_second());
    timer::start() as f64 * mul
}

#[cfg(target_arch = "x86_64")]
fn brand_string() -> Option<String> {
    use std::arch::x86_64::__cpuid;

    // Brand string support is indicated by the highest extended leaf.
    let highest = unsafe { __cpuid(0x8000_0000) };
    if highest.eax < 0x8000_0004 {
        return None;
    }

    let mut bytes = Vec::with_capacity(48);
    for leaf in 0x8000_0002u32..=0x8000_0004 {
        let regs = unsafe { __cpuid(leaf) };
        for reg in [regs.eax, regs.ebx, regs.ecx, regs.edx] {
            bytes.extend_from_slice(&reg.to_le_bytes());
        }
    }
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Frequency quoted inside the CPUID brand string, e.g.
/// `"... CPU @ 3.70GHz"`. Does not account for throttling or turbo.
///
/// Vendor formatting is not guaranteed; anything unparseable yields `None`
/// rather than a guessed frequency.
#[cfg(target_arch = "x86_64")]
fn nominal_clock_rate() -> Option<f64> {
    let brand = brand_string()?;
    parse_clock_rate(&brand)
}

#[cfg(target_arch = "x86_64")]
fn parse_clock_rate(brand: &str) -> Option<f64> {
    for (suffix, multiplier) in [("MHz", 1e6), ("GHz", 1e9), ("THz", 1e12)] {
        if let Some(pos) = brand.find(suffix) {
            let head = &brand[..pos];
            let digits = match head.rfind(' ') {
                Some(space) => &head[space + 1..],
                None => head,
            };
            if let Ok(value) = digits.parse::<f64>() {
                if value > 0.0 {
                    return Some(value * multiplier);
                }
            }
        }
    }
    None
}

/// Measures ticks per second against the OS monotonic clock.
///
/// Median of repeated short sleep intervals; robust against a few
/// descheduled iterations.
#[cfg(target_arch = "x86_64")]
fn measured_ticks_per_second() -> f64 {
    use std::time::{Duration, Instant};

    const INTERVALS: usize = 50;

    let mut ratios = Vec::with_capacity(INTERVALS);
    for _ in 0..INTERVALS {
        let t0 = timer::start();
        let wall = Instant::now();
        std::thread::sleep(Duration::from_millis(1));
        let t1 = timer::stop();
        let elapsed = wall.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            ratios.push(t1.wrapping_sub(t0) as f64 / elapsed);
        }
    }

    if ratios.is_empty() {
        return 1e9;
    }
    ratios.sort_by(|a, b| a.total_cmp(b));
    ratios[ratios.len() / 2]
}

#[cfg(target_arch = "aarch64")]
fn counter_frequency_aarch64() -> f64 {
    let freq: u64;
    unsafe {
        std::arch::asm!(
            "mrs {}, cntfrq_el0",
            out(reg) freq,
            options(nostack, nomem),
        );
    }
    freq as f64
}

/// Timer granularity in ticks: the mode of per-batch modes of empty
/// start/stop pairs.
///
/// The double application of the robust mode estimator filters both
/// per-sample noise and whole batches ruined by preemption. The nested loop
/// keeps each batch small enough to stay within L1.
pub fn timer_resolution(timer_samples: usize) -> Ticks {
    let mut repetitions = Vec::with_capacity(timer_samples);
    for _ in 0..timer_samples {
        let mut samples = Vec::with_capacity(timer_samples);
        for _ in 0..timer_samples {
            let t0 = timer::start();
            let t1 = timer::stop();
            samples.push(t1.wrapping_sub(t0));
        }
        repetitions.push(statistics::mode(&mut samples));
    }
    statistics::mode(&mut repetitions)
}

/// One-time-computed, thereafter-immutable calibration constants.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    /// Intrinsic timer granularity in ticks. Anchors the absolute noise
    /// floor for adaptive sampling: relative-variability thresholds are
    /// meaningless when the true duration approaches this value.
    pub timer_resolution: Ticks,

    /// Tick-to-seconds conversion rate.
    pub ticks_per_second: f64,
}

impl Calibration {
    /// Calibrates from scratch. Prefer [`Calibration::get`], which computes
    /// once per process.
    pub fn compute(timer_samples: usize) -> Self {
        Self {
            timer_resolution: timer_resolution(timer_samples),
            ticks_per_second: invariant_ticks_per_second(),
        }
    }

    /// Process-wide calibration, computed on first use with the caller's
    /// `timer_samples` and shared read-only thereafter.
    pub fn get(params: &Params) -> &'static Calibration {
        static CALIBRATION: OnceLock<Calibration> = OnceLock::new();
        CALIBRATION.get_or_init(|| Calibration::compute(params.timer_samples))
    }

    /// Timer granularity converted to nanoseconds.
    pub fn resolution_ns(&self) -> f64 {
        self.timer_resolution as f64 / self.ticks_per_second * 1e9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_second_positive() {
        let tps = invariant_ticks_per_second();
        // Anything from a 1 MHz counter to a 10 GHz TSC is plausible.
        assert!(tps >= 1e6 && tps <= 1e10, "ticks_per_second = {}", tps);
    }

    #[test]
    fn test_now_advances() {
        let a = now();
        let mut sum = 0u64;
        for i in 0..10_000u64 {
            sum = sum.wrapping_add(i);
        }
        timer::prevent_elision(sum);
        let b = now();
        assert!(b >= a);
    }

    #[test]
    fn test_timer_resolution_sane() {
        let res = timer_resolution(64);
        // Zero is possible on coarse fallback clocks; anything above a
        // million ticks for an empty region is not.
        assert!(res < 1_000_000, "timer_resolution = {}", res);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_parse_clock_rate() {
        assert_eq!(
            parse_clock_rate("Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz"),
            Some(3.70e9)
        );
        assert_eq!(
            parse_clock_rate("AMD Engineering Sample 800MHz"),
            Some(8e8)
        );
        assert_eq!(parse_clock_rate("Some CPU Without A Rating"), None);
        assert_eq!(parse_clock_rate(""), None);
    }

    #[test]
    fn test_calibration_cached() {
        let params = Params::default();
        let a = Calibration::get(&params) as *const Calibration;
        let b = Calibration::get(&params) as *const Calibration;
        assert_eq!(a, b);
    }
}
