//! Core type definitions for the query pipeline
//!
//! These types form the contract between the HTTP surface and the pipeline:
//! the caller's request, the raw outcome a sandbox reports, and the single
//! canonical response shape returned regardless of which stage determined
//! the result. All entities are request-scoped; nothing here persists or is
//! shared between in-flight requests.

use serde::{Deserialize, Serialize};

/// Caller request. An empty prompt is not rejected; it is forwarded to the
/// generator as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
}

/// Raw outcome reported by the sandbox for one program run, before
/// normalization. A non-zero exit code is a normal value here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i64,
    pub output: String,
}

/// The canonical response shape returned to the caller.
///
/// `exit_code` is absent when the pipeline failed before the program ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
    pub code: String,
    #[serde(rename = "exitCode", skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
}

/// The fixed, trusted data file uploaded into each sandbox.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub bytes: Vec<u8>,
}
