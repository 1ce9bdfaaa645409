//! Terminal output formatting with colors.

use colored::Colorize;

use crate::measurement::Calibration;
use crate::types::BenchResult;

/// Variability above this fraction is highlighted as suspect.
const NOISY_REL_MAD: f64 = 0.05;

/// Format measurement results as a human-readable table.
///
/// The calibration supplies the tick rate for the ns/call column.
pub fn format_results(results: &[BenchResult], calibration: &Calibration) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(52);

    output.push_str("nanomark\n");
    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "{:>12} {:>14} {:>12} {:>10}\n",
        "input", "ticks/call", "ns/call", "rel MAD"
    ));

    let ns_per_tick = 1e9 / calibration.ticks_per_second;
    for r in results {
        let variability = format!("{:.2}%", r.variability * 100.0);
        let variability = if r.variability > NOISY_REL_MAD {
            variability.yellow().to_string()
        } else {
            variability.green().to_string()
        };
        output.push_str(&format!(
            "{:>12} {:>14.2} {:>12.2} {:>10}\n",
            r.input,
            r.ticks,
            r.ticks * ns_per_tick,
            variability
        ));
    }

    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "timer resolution: {} ticks (~{:.1} ns)\n",
        calibration.timer_resolution,
        calibration.resolution_ns()
    ));
    output
}
