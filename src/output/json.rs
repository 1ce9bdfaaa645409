//! JSON serialization for measurement results.

use crate::types::BenchResult;

/// Serialize results to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// `BenchResult`).
pub fn to_json(results: &[BenchResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string(results)
}

/// Serialize results to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// `BenchResult`).
pub fn to_json_pretty(results: &[BenchResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}
