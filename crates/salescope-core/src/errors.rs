//! Error types for failure handling across the query pipeline
//!
//! Every stage of the generate-execute pipeline can fail independently, and
//! the variants here mirror those stages so the orchestrator can surface a
//! descriptive message for each. A generated program exiting non-zero is not
//! represented here: that is a normal execution outcome carried by
//! [`crate::core_types::ExecutionResult`], not an infrastructure failure.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Code generation failed: {0}")]
    Generation(String),
    #[error("Sandbox provisioning failed: {0}")]
    Provision(String),
    #[error("Dataset upload failed: {0}")]
    Seed(String),
    #[error("Sandbox execution failed: {0}")]
    Execution(String),
    #[error("Dataset error: {0}")]
    Dataset(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Dataset(err.to_string())
    }
}
