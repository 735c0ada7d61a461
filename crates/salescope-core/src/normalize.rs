//! Normalization of raw execution outcomes into display text.
//!
//! The generated code is non-deterministic and may legitimately produce no
//! visible output, such as a model forgetting to print. That case gets a
//! distinct, actionable message instead of an empty response, without being
//! treated as a hard failure.

use crate::core_types::ExecutionResult;

/// Fixed message for a successful run that printed nothing.
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully but produced no output. \
The generated code might not include print statements.";

/// Map a raw execution result to the text shown to the caller.
///
/// Pure and total: no side effects, defined for every input.
pub fn normalize(result: &ExecutionResult) -> String {
    if result.exit_code != 0 {
        format!("Error (exit code {}): {}", result.exit_code, result.output)
    } else if result.output.trim().is_empty() {
        NO_OUTPUT_MESSAGE.to_string()
    } else {
        result.output.clone()
    }
}
