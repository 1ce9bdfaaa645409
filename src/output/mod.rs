//! Result rendering for operators.
//!
//! Nothing here affects measurement; these helpers only format
//! already-computed results.

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty};
pub use terminal::format_results;
